//! Parsing of the type annotations found in the first header row.
//!
//! A type spec has the shape `type[feature,feature]=default`, where both the
//! bracketed feature list and the default are optional.

use std::{fmt, str::FromStr};

use itertools::Itertools;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeSpecError {
    #[error("unknown feature '{0}' (expected repeated, DateTime, HourTime, nokey or norepeated)")]
    UnknownFeature(String),
    #[error("malformed type spec '{0}'")]
    Malformed(String),
}

/// Fixed set of per-column features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    /// Field is repeated even when only one column feeds it.
    pub repeated: bool,
    /// Cell holds `YYYY-MM-DD HH:MM:SS`, stored as epoch seconds.
    pub date_time: bool,
    /// Cell holds a time of day, stored as seconds since midnight.
    pub hour_time: bool,
    /// Keep repeated group instances whose first field is blank; drop them
    /// only when they end up entirely default.
    pub no_key: bool,
    /// Node never absorbs a repetition increment.
    pub no_repeated: bool,
}

impl Features {
    const TOKENS: [&'static str; 5] = ["repeated", "DateTime", "HourTime", "nokey", "norepeated"];

    fn set(&mut self, token: &str) -> Result<(), TypeSpecError> {
        match token {
            "repeated" => self.repeated = true,
            "DateTime" => self.date_time = true,
            "HourTime" => self.hour_time = true,
            "nokey" => self.no_key = true,
            "norepeated" => self.no_repeated = true,
            other => return Err(TypeSpecError::UnknownFeature(other.to_string())),
        }
        Ok(())
    }

    fn enabled(&self) -> impl Iterator<Item = &'static str> + '_ {
        let flags = [
            self.repeated,
            self.date_time,
            self.hour_time,
            self.no_key,
            self.no_repeated,
        ];
        Self::TOKENS
            .into_iter()
            .zip(flags)
            .filter_map(|(token, on)| on.then_some(token))
    }

    pub fn is_empty(&self) -> bool {
        self.enabled().next().is_none()
    }
}

/// A parsed `type[features]=default` annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSpec {
    pub type_name: String,
    pub default: Option<String>,
    pub features: Features,
}

impl TypeSpec {
    pub fn parse(raw: &str) -> Result<Self, TypeSpecError> {
        let parts = raw
            .split(|c| matches!(c, '[' | ']' | '='))
            .map(str::trim)
            .collect::<Vec<_>>();
        let (type_name, feature_list, default) = match parts.as_slice() {
            [name] => (*name, "", None),
            [name, default] => (*name, "", Some(*default)),
            [name, features, ""] => (*name, *features, None),
            [name, features, "", default] => (*name, *features, Some(*default)),
            _ => return Err(TypeSpecError::Malformed(raw.to_string())),
        };

        let mut features = Features::default();
        for token in feature_list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            features.set(token)?;
        }

        Ok(TypeSpec {
            type_name: type_name.to_string(),
            default: default.filter(|d| !d.is_empty()).map(str::to_string),
            features,
        })
    }
}

impl FromStr for TypeSpec {
    type Err = TypeSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeSpec::parse(s)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if !self.features.is_empty() {
            write!(f, "[{}]", self.features.enabled().join(","))?;
        }
        if let Some(default) = &self.default {
            write!(f, "={default}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_bare_type() {
        let spec = TypeSpec::parse("int32").unwrap();
        assert_eq!(spec.type_name, "int32");
        assert_eq!(spec.default, None);
        assert!(spec.features.is_empty());
    }

    #[test]
    fn parses_default_without_features() {
        let spec = TypeSpec::parse("uint32=10").unwrap();
        assert_eq!(spec.type_name, "uint32");
        assert_eq!(spec.default.as_deref(), Some("10"));
    }

    #[test]
    fn parses_features_and_default() {
        let spec = TypeSpec::parse("int64[repeated, DateTime]=0").unwrap();
        assert_eq!(spec.type_name, "int64");
        assert_eq!(spec.default.as_deref(), Some("0"));
        assert!(spec.features.repeated);
        assert!(spec.features.date_time);
        assert!(!spec.features.hour_time);
    }

    #[test]
    fn parses_group_flags() {
        let spec = TypeSpec::parse("Reward[nokey,norepeated]").unwrap();
        assert_eq!(spec.type_name, "Reward");
        assert!(spec.features.no_key);
        assert!(spec.features.no_repeated);
    }

    #[test]
    fn empty_spec_has_empty_type_name() {
        let spec = TypeSpec::parse("").unwrap();
        assert_eq!(spec, TypeSpec::default());
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let err = TypeSpec::parse("int32[packed]").unwrap_err();
        assert_eq!(err, TypeSpecError::UnknownFeature("packed".to_string()));
    }

    #[test]
    fn extra_separators_are_rejected() {
        assert!(matches!(
            TypeSpec::parse("int32=1=2=3=4"),
            Err(TypeSpecError::Malformed(_))
        ));
    }

    #[test]
    fn display_renders_canonical_form() {
        let spec = TypeSpec::parse("int32[ HourTime ,repeated ]=5").unwrap();
        assert_eq!(spec.to_string(), "int32[repeated,HourTime]=5");
    }

    fn features_strategy() -> impl Strategy<Value = Features> {
        any::<[bool; 5]>().prop_map(|[repeated, date_time, hour_time, no_key, no_repeated]| {
            Features {
                repeated,
                date_time,
                hour_time,
                no_key,
                no_repeated,
            }
        })
    }

    proptest! {
        #[test]
        fn display_then_parse_round_trips(
            type_name in "[A-Za-z][A-Za-z0-9_]{0,12}",
            default in proptest::option::of("[A-Za-z0-9_.-]{1,8}"),
            features in features_strategy(),
        ) {
            let spec = TypeSpec { type_name, default, features };
            let reparsed = TypeSpec::parse(&spec.to_string()).unwrap();
            prop_assert_eq!(reparsed, spec);
        }
    }
}
