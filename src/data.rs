//! Cell coercion: turns raw cell text into protobuf field values.

use chrono::{Local, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use prost::bytes::Bytes;
use prost_reflect::{Kind, Value};
use serde::{Deserialize, Serialize};

use crate::tree::Features;

/// Zone in which `DateTime` wall-clock cells are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBase {
    #[default]
    Local,
    Utc,
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime, String> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| format!("expected a date time like 2020-01-02 03:04:05, got '{value}'"))
}

pub fn parse_naive_time(value: &str) -> Result<NaiveTime, String> {
    const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| format!("expected a time of day like 01:30:00, got '{value}'"))
}

/// Seconds since the Unix epoch for a wall-clock date time.
pub fn epoch_seconds(value: &str, timezone: TimeBase) -> Result<i64, String> {
    let naive = parse_naive_datetime(value)?;
    match timezone {
        TimeBase::Utc => Ok(naive.and_utc().timestamp()),
        TimeBase::Local => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp())
            .ok_or_else(|| format!("'{value}' does not exist in the local time zone")),
    }
}

/// Seconds elapsed since midnight.
pub fn seconds_of_day(value: &str) -> Result<i64, String> {
    parse_naive_time(value).map(|time| i64::from(time.num_seconds_from_midnight()))
}

/// Integer parse that tolerates spreadsheet formatting such as `3.0`:
/// falls back to parsing a float and truncating it.
pub fn parse_integer(value: &str) -> Result<i128, String> {
    let trimmed = value.trim();
    if let Ok(parsed) = trimmed.parse::<i128>() {
        return Ok(parsed);
    }
    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed.trunc() as i128),
        _ => Err(format!("expected an integer, got '{value}'")),
    }
}

pub fn parse_float(value: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("expected a number, got '{value}'"))
}

/// Text cells keep their content, except that a number carrying a trailing
/// `.0` artifact is rewritten to its integer form.
pub fn normalize_text(value: &str) -> String {
    if value.ends_with(".0") {
        if let Ok(parsed) = value.trim().parse::<f64>() {
            if parsed.is_finite() && parsed.abs() < i64::MAX as f64 {
                return (parsed.trunc() as i64).to_string();
            }
        }
    }
    value.to_string()
}

/// Coerces one non-blank cell to a value of `kind`.
pub fn coerce_cell(
    value: &str,
    kind: &Kind,
    features: Features,
    timezone: TimeBase,
) -> Result<Value, String> {
    match kind {
        Kind::Double => parse_float(value).map(Value::F64),
        Kind::Float => parse_float(value).map(|v| Value::F32(v as f32)),
        Kind::String => Ok(Value::String(normalize_text(value))),
        Kind::Bytes => Ok(Value::Bytes(Bytes::from(normalize_text(value).into_bytes()))),
        Kind::Message(message) => Err(format!(
            "field of message type {} cannot take a cell value",
            message.full_name()
        )),
        Kind::Enum(enumeration) => {
            if let Some(named) = enumeration.get_value_by_name(value.trim()) {
                return Ok(Value::EnumNumber(named.number()));
            }
            let number = integer_cell(value, features, timezone)?;
            let number = i32::try_from(number)
                .map_err(|_| format!("{number} is out of range for enum {}", enumeration.name()))?;
            enumeration
                .get_value(number)
                .map(|_| Value::EnumNumber(number))
                .ok_or_else(|| format!("{number} is not a value of enum {}", enumeration.name()))
        }
        Kind::Bool => integer_cell(value, features, timezone).map(|n| Value::Bool(n != 0)),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            ranged(integer_cell(value, features, timezone)?, "int32").map(Value::I32)
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            ranged(integer_cell(value, features, timezone)?, "int64").map(Value::I64)
        }
        Kind::Uint32 | Kind::Fixed32 => {
            ranged(integer_cell(value, features, timezone)?, "uint32").map(Value::U32)
        }
        Kind::Uint64 | Kind::Fixed64 => {
            ranged(integer_cell(value, features, timezone)?, "uint64").map(Value::U64)
        }
    }
}

fn integer_cell(value: &str, features: Features, timezone: TimeBase) -> Result<i128, String> {
    if !(features.date_time || features.hour_time) {
        return parse_integer(value);
    }
    if parse_integer(value).is_ok_and(|n| n == 0) {
        return Ok(0);
    }
    let trimmed = value.trim();
    if features.date_time {
        epoch_seconds(trimmed, timezone).map(i128::from)
    } else {
        seconds_of_day(trimmed).map(i128::from)
    }
}

fn ranged<T: TryFrom<i128>>(value: i128, type_name: &str) -> Result<T, String> {
    T::try_from(value).map_err(|_| format!("{value} is out of range for {type_name}"))
}
