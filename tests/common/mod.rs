#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use prost_reflect::{DynamicMessage, Value};
use sheet_pb::{
    compiler::ProtoxCompiler,
    config::ExportConfig,
    data::TimeBase,
    export::{self, CompiledSchema},
    registry::CommonTypes,
    sheet::SheetTable,
    tree::BoundSchema,
};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Writes `rows` as a comma-separated sheet.
    pub fn write_sheet(&self, name: &str, rows: &[&[&str]]) -> PathBuf {
        self.write(name, &csv_text(rows))
    }

    /// Default configuration with every output directory inside the workspace
    /// and `DateTime` cells read as UTC.
    pub fn config(&self) -> ExportConfig {
        ExportConfig {
            timezone: TimeBase::Utc,
            ..ExportConfig::default()
        }
        .rooted_at(self.path())
    }

    /// Configuration that also registers `common/conf_struct.proto`.
    pub fn config_with_common(&self, proto: &str) -> ExportConfig {
        self.write("common/conf_struct.proto", proto);
        ExportConfig {
            include_paths: vec![self.path().join("common")],
            common_files: vec!["conf_struct.proto".to_string()],
            ..self.config()
        }
    }
}

pub fn csv_text(rows: &[&[&str]]) -> String {
    rows.iter()
        .map(|row| row.join(","))
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

pub fn sheet(name: &str, rows: &[&[&str]]) -> SheetTable {
    SheetTable::new(
        name,
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    )
}

pub fn registry(config: &ExportConfig) -> CommonTypes {
    CommonTypes::load(&ProtoxCompiler, &config.include_paths, &config.common_files)
        .expect("load common types")
}

/// Builds, compiles and binds `table` inside the workspace.
pub fn bind_sheet(config: &ExportConfig, table: &SheetTable) -> (BoundSchema, CompiledSchema) {
    let registry = registry(config);
    let paths = config.artifact_paths(table.name());
    let schema = export::build_schema(table, None, &registry).expect("build schema");
    let compiled =
        export::compile_schema(&schema, config, &paths, &ProtoxCompiler).expect("compile schema");
    let bound = schema
        .bind(&compiled.record)
        .expect("bind schema")
        .with_timezone(config.timezone);
    (bound, compiled)
}

/// Transcribes every data row of `table` into standalone records.
pub fn records(config: &ExportConfig, table: &SheetTable) -> Vec<DynamicMessage> {
    let (bound, _) = bind_sheet(config, table);
    table
        .data_rows()
        .map(|(row_number, cells)| {
            let mut record = bound.new_record();
            bound
                .transcribe_row(&mut record, cells, row_number)
                .expect("transcribe row");
            record
        })
        .collect()
}

pub fn field(message: &DynamicMessage, name: &str) -> Value {
    message
        .get_field_by_name(name)
        .unwrap_or_else(|| panic!("no field {name}"))
        .into_owned()
}

pub fn list(message: &DynamicMessage, name: &str) -> Vec<Value> {
    field(message, name)
        .as_list()
        .unwrap_or_else(|| panic!("{name} is not a list"))
        .to_vec()
}
