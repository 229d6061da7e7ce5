//! Export configuration, loaded from an optional YAML file.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    compiler::{ProtocCompiler, ProtoxCompiler, SchemaCompiler},
    data::TimeBase,
    proto_gen::qualified_name,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Generated `.proto` files.
    pub proto_dir: PathBuf,
    /// Compiled descriptor sets (`.desc`).
    pub binding_dir: PathBuf,
    /// Serialized row containers (`.data`).
    pub data_dir: PathBuf,
    /// Human-readable text dumps (`.txt`).
    pub text_dir: PathBuf,
    pub file_prefix: String,
    pub package: String,
    /// Directories searched for common proto files.
    pub include_paths: Vec<PathBuf>,
    /// Proto files whose top-level messages may be used as column types.
    pub common_files: Vec<String>,
    /// External `protoc`; the in-process compiler is used when unset.
    pub protoc: Option<PathBuf>,
    pub timezone: TimeBase,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            proto_dir: PathBuf::from("proto"),
            binding_dir: PathBuf::from("binding"),
            data_dir: PathBuf::from("deploy_data"),
            text_dir: PathBuf::from("readable_data"),
            file_prefix: "dataconfig_".to_string(),
            package: "dataconfig".to_string(),
            include_paths: Vec::new(),
            common_files: Vec::new(),
            protoc: None,
            timezone: TimeBase::default(),
        }
    }
}

/// Output locations for one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Proto file name relative to `proto_dir`, as handed to the compiler.
    pub proto_file: String,
    pub proto: PathBuf,
    pub binding: PathBuf,
    pub data: PathBuf,
    pub text: PathBuf,
}

impl ExportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Loads the configuration and applies an `--out-dir` override.
    pub fn resolve(path: Option<&Path>, out_dir: Option<&Path>) -> Result<Self> {
        let config = Self::load_or_default(path)?;
        Ok(match out_dir {
            Some(root) => config.rooted_at(root),
            None => config,
        })
    }

    /// Re-roots the relative output directories under `root`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        for dir in [
            &mut self.proto_dir,
            &mut self.binding_dir,
            &mut self.data_dir,
            &mut self.text_dir,
        ] {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
        self
    }

    pub fn compiler(&self) -> Box<dyn SchemaCompiler> {
        match &self.protoc {
            Some(protoc) => Box::new(ProtocCompiler::new(protoc)),
            None => Box::new(ProtoxCompiler),
        }
    }

    /// Include paths for compiling a generated file: the proto directory
    /// first, then the common include paths.
    pub fn generated_include_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.proto_dir.clone())
            .chain(self.include_paths.iter().cloned())
            .collect()
    }

    pub fn artifact_paths(&self, sheet: &str) -> ArtifactPaths {
        let stem = format!("{}{}", self.file_prefix, sheet.to_lowercase());
        let proto_file = format!("{stem}.proto");
        ArtifactPaths {
            proto: self.proto_dir.join(&proto_file),
            binding: self.binding_dir.join(format!("{stem}.desc")),
            data: self.data_dir.join(format!("{stem}.data")),
            text: self.text_dir.join(format!("{stem}.txt")),
            proto_file,
        }
    }

    pub fn message_name(&self, type_name: &str) -> String {
        qualified_name(&self.package, type_name)
    }
}
