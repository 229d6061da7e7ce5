//! Schema compilers: turn proto source files into a descriptor pool.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use log::debug;
use prost_reflect::DescriptorPool;
use tempfile::NamedTempFile;

use crate::error::{ConvertError, ConvertResult};

pub trait SchemaCompiler {
    /// Compiles `files` (named relative to one of `include_paths`) together
    /// with everything they import.
    fn compile(&self, include_paths: &[PathBuf], files: &[String]) -> ConvertResult<DescriptorPool>;
}

/// In-process compiler backed by `protox`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoxCompiler;

impl SchemaCompiler for ProtoxCompiler {
    fn compile(&self, include_paths: &[PathBuf], files: &[String]) -> ConvertResult<DescriptorPool> {
        let failed = |err: protox::Error| ConvertError::Compile {
            file: files.join(", "),
            message: err.to_string(),
        };
        let mut compiler = protox::Compiler::new(include_paths).map_err(failed)?;
        compiler.include_imports(true);
        for file in files {
            compiler.open_file(file).map_err(failed)?;
        }
        Ok(compiler.descriptor_pool())
    }
}

/// Runs an external `protoc` binary and decodes its descriptor set output.
#[derive(Debug, Clone)]
pub struct ProtocCompiler {
    protoc: PathBuf,
}

impl ProtocCompiler {
    pub fn new(protoc: impl Into<PathBuf>) -> Self {
        Self {
            protoc: protoc.into(),
        }
    }

    /// Descriptor set output for one `protoc` run, removed on drop.
    fn scratch_file() -> ConvertResult<NamedTempFile> {
        let file = tempfile::Builder::new()
            .prefix("sheet-pb-")
            .suffix(".desc")
            .tempfile()?;
        Ok(file)
    }
}

impl SchemaCompiler for ProtocCompiler {
    fn compile(&self, include_paths: &[PathBuf], files: &[String]) -> ConvertResult<DescriptorPool> {
        let scratch = Self::scratch_file()?;
        let output = scratch.path();
        let mut command = Command::new(&self.protoc);
        for include in include_paths {
            command.arg(format!("-I{}", include.display()));
        }
        command
            .arg("--include_imports")
            .arg(format!("--descriptor_set_out={}", output.display()))
            .args(files);
        debug!("Running {command:?}");

        let result = command.output().map_err(|err| ConvertError::Compile {
            file: files.join(", "),
            message: format!("failed to run {}: {err}", self.protoc.display()),
        })?;
        if !result.status.success() {
            return Err(ConvertError::Compile {
                file: files.join(", "),
                message: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        decode_descriptor_set(output)
    }
}

/// Loads an encoded `FileDescriptorSet` from disk.
pub fn decode_descriptor_set(path: &Path) -> ConvertResult<DescriptorPool> {
    let bytes = fs::read(path)?;
    DescriptorPool::decode(bytes.as_slice()).map_err(|err| ConvertError::Compile {
        file: path.display().to_string(),
        message: err.to_string(),
    })
}
