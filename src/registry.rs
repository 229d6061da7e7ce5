//! Registry of common message types defined outside the sheet.

use std::path::PathBuf;

use log::info;
use prost_reflect::{DescriptorPool, MessageDescriptor};

use crate::{compiler::SchemaCompiler, error::ConvertResult};

/// A common type hit: the message and the proto file that defines it.
#[derive(Debug, Clone)]
pub struct CommonType {
    pub file: String,
    pub descriptor: MessageDescriptor,
}

#[derive(Debug, Clone, Default)]
pub struct CommonTypes {
    pool: Option<DescriptorPool>,
    files: Vec<String>,
}

impl CommonTypes {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiles the configured common proto files. An empty file list yields
    /// an empty registry without invoking the compiler.
    pub fn load(
        compiler: &dyn SchemaCompiler,
        include_paths: &[PathBuf],
        files: &[String],
    ) -> ConvertResult<Self> {
        if files.is_empty() {
            return Ok(Self::empty());
        }
        let pool = compiler.compile(include_paths, files)?;
        info!("Loaded {} common proto file(s)", files.len());
        Ok(Self::from_pool(pool, files.to_vec()))
    }

    pub fn from_pool(pool: DescriptorPool, files: Vec<String>) -> Self {
        CommonTypes {
            pool: Some(pool),
            files,
        }
    }

    /// Looks up a top-level message by short name, searching the common files
    /// in configuration order.
    pub fn lookup(&self, type_name: &str) -> Option<CommonType> {
        if type_name.is_empty() {
            return None;
        }
        let pool = self.pool.as_ref()?;
        self.files.iter().find_map(|file_name| {
            let file = pool.get_file_by_name(file_name)?;
            file.messages()
                .find(|message| message.name() == type_name)
                .map(|descriptor| CommonType {
                    file: file_name.clone(),
                    descriptor,
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ProtoxCompiler;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lookup_finds_top_level_messages_only() {
        let dir = tempdir().expect("temp dir");
        fs::write(
            dir.path().join("conf_struct.proto"),
            "syntax = \"proto2\";\npackage common;\nmessage ItemInfo {\n    optional int32 id = 1;\n    message Inner {\n        optional int32 v = 1;\n    }\n}\n",
        )
        .expect("write proto");

        let registry = CommonTypes::load(
            &ProtoxCompiler,
            &[dir.path().to_path_buf()],
            &["conf_struct.proto".to_string()],
        )
        .expect("load");

        let hit = registry.lookup("ItemInfo").expect("common type");
        assert_eq!(hit.file, "conf_struct.proto");
        assert_eq!(hit.descriptor.full_name(), "common.ItemInfo");
        assert!(registry.lookup("Inner").is_none());
        assert!(registry.lookup("").is_none());
        assert!(CommonTypes::empty().lookup("ItemInfo").is_none());
    }
}
