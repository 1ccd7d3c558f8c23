//! Export wire contract.
//!
//! The client exports a table by POSTing a JSON body such as
//! `{"storageUnit":"users","format":"csv","delimiter":"|"}` and receives the file as
//! an attachment named by the `Content-Disposition` header.

use std::collections::BTreeMap;

use dbmatrix_mock_data::Row;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::AutomationError;

/// Delimiter used for csv exports that do not name one.
pub const DEFAULT_CSV_DELIMITER: &str = ",";

/// Delimiters spreadsheet applications would misinterpret, with the reason why.
const INVALID_DELIMITERS: &[(char, &str)] = &[
    ('=', "formula indicator"),
    ('+', "formula indicator"),
    ('-', "formula indicator"),
    ('@', "formula indicator"),
    ('\t', "tab character"),
    ('\r', "carriage return"),
    ('\'', "single quote (used for escaping)"),
    ('"', "double quote (CSV escape character)"),
];

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Excel,
    Ndjson,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
            Self::Ndjson => "ndjson",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Ndjson => "application/x-ndjson; charset=utf-8",
        }
    }
}

/// Body of the export request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub storage_unit: String,
    pub format: ExportFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_rows: Option<Vec<Row>>,
}

impl ExportRequest {
    #[must_use]
    pub fn new(storage_unit: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            storage_unit: storage_unit.into(),
            format,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    #[must_use]
    pub fn selected_rows(mut self, rows: Vec<Row>) -> Self {
        self.selected_rows = Some(rows);
        self
    }

    /// Name of the file the export is served as.
    #[must_use]
    pub fn filename(&self) -> String {
        export_filename(self.schema.as_deref(), &self.storage_unit, self.format)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ExportResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// File name announced by the `Content-Disposition` header.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.header("content-disposition")
            .and_then(parse_content_disposition)
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// An intercepted export: what was sent and what came back.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportExchange {
    pub request_body: serde_json::Value,
    pub response: ExportResponse,
}

/// Checks a csv delimiter: exactly one byte, and not one spreadsheets treat specially.
///
/// # Errors
///
/// * [`AutomationError::InvalidDelimiter`] if the delimiter is not allowed
pub fn validate_delimiter(delimiter: &str) -> Result<u8, AutomationError> {
    let &[byte] = delimiter.as_bytes() else {
        return Err(AutomationError::InvalidDelimiter {
            delimiter: delimiter.to_string(),
            reason: "delimiter must be a single character",
        });
    };

    if let Some((_, reason)) = INVALID_DELIMITERS.iter().find(|(x, _)| *x == char::from(byte)) {
        return Err(AutomationError::InvalidDelimiter {
            delimiter: delimiter.to_string(),
            reason: *reason,
        });
    }

    Ok(byte)
}

/// `<schema>_<table>.<ext>`, or `<table>.<ext>` without a schema.
#[must_use]
pub fn export_filename(schema: Option<&str>, table: &str, format: ExportFormat) -> String {
    match schema.filter(|x| !x.is_empty()) {
        Some(schema) => format!("{schema}_{table}.{}", format.extension()),
        None => format!("{table}.{}", format.extension()),
    }
}

/// Extracts the file name of an `attachment; filename="..."` header value.
#[must_use]
pub fn parse_content_disposition(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("filename")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// Extension of `filename`, without the dot.
#[must_use]
pub fn file_extension(filename: &str) -> Option<&str> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|x| !x.is_empty())
}

/// Prefixes values spreadsheets would evaluate as formulas.
#[must_use]
pub fn escape_formula(value: &str) -> String {
    if value.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        format!("'{value}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn request_body_uses_wire_names() {
        let request = ExportRequest::new("users", ExportFormat::Csv)
            .schema("public")
            .delimiter("|");

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "schema": "public",
                "storageUnit": "users",
                "format": "csv",
                "delimiter": "|",
            })
        );
    }

    #[test_log::test]
    fn optional_fields_are_omitted() {
        let request = ExportRequest::new("users", ExportFormat::Ndjson);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({ "storageUnit": "users", "format": "ndjson" })
        );
    }

    #[test_log::test]
    fn extensions() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Excel.extension(), "xlsx");
        assert_eq!(ExportFormat::Ndjson.extension(), "ndjson");
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
    }

    #[test_log::test]
    fn delimiters_are_validated() {
        assert_eq!(validate_delimiter("|").unwrap(), b'|');
        assert_eq!(validate_delimiter(";").unwrap(), b';');
        assert!(validate_delimiter("").is_err());
        assert!(validate_delimiter("||").is_err());
        assert!(validate_delimiter("§").is_err());
        for invalid in ["=", "+", "-", "@", "\t", "\r", "'", "\""] {
            assert!(
                matches!(
                    validate_delimiter(invalid),
                    Err(AutomationError::InvalidDelimiter { .. })
                ),
                "{invalid:?} should be rejected"
            );
        }
    }

    #[test_log::test]
    fn filenames() {
        assert_eq!(
            export_filename(Some("public"), "users", ExportFormat::Csv),
            "public_users.csv"
        );
        assert_eq!(
            export_filename(None, "users", ExportFormat::Excel),
            "users.xlsx"
        );
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="public_users.ndjson""#),
            Some("public_users.ndjson".to_string())
        );
        assert_eq!(parse_content_disposition("inline"), None);
        assert_eq!(file_extension("public_users.ndjson"), Some("ndjson"));
        assert_eq!(file_extension("README"), None);
    }

    #[test_log::test]
    fn formulas_are_escaped() {
        assert_eq!(escape_formula("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(escape_formula("-5"), "'-5");
        assert_eq!(escape_formula("plain"), "plain");
    }
}
