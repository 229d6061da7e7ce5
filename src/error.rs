//! Error kinds raised while converting a sheet.
//!
//! Every variant is fatal for the sheet being converted. Column positions are
//! reported as spreadsheet letters and rows as 1-based spreadsheet rows so the
//! offending cell can be located directly in the workbook.

use thiserror::Error;

/// Convenience result type for schema and transcription operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The header rows describe an invalid schema (bad type spec, missing type
    /// name, type spec deeper than the path, unknown feature flag).
    #[error("configuration error in column {column} ('{path}'): {message}")]
    Configuration {
        column: String,
        path: String,
        message: String,
    },

    /// The tree and a compiled or common descriptor disagree.
    #[error("schema mismatch at '{path}': {message}")]
    SchemaMismatch { path: String, message: String },

    /// A cell could not be coerced to its field's kind.
    #[error("invalid cell at row {row} column {column}: {message} (raw='{raw}')")]
    DataCoercion {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// The sheet does not have the fixed header layout.
    #[error("sheet '{sheet}' is malformed: {message}")]
    Structural { sheet: String, message: String },

    /// The schema compiler rejected a proto file.
    #[error("failed to compile {file}: {message}")]
    Compile { file: String, message: String },

    /// The spreadsheet reader failed.
    #[error("spreadsheet error: {message}")]
    Sheet { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub(crate) fn configuration(column: usize, path: &str, message: impl Into<String>) -> Self {
        ConvertError::Configuration {
            column: column_letter(column),
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(path: &str, message: impl Into<String>) -> Self {
        ConvertError::SchemaMismatch {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Converts a 0-based column index into its spreadsheet letter (`0` → `A`,
/// `26` → `AA`).
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letter_matches_spreadsheet_naming() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(51), "AZ");
        assert_eq!(column_letter(52), "BA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn configuration_error_names_column_and_path() {
        let err = ConvertError::configuration(2, "reward.id", "missing type name");
        let text = err.to_string();
        assert!(text.contains("column C"));
        assert!(text.contains("reward.id"));
        assert!(text.contains("missing type name"));
    }
}
