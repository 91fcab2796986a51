use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::pagination::{DataView, NO_DATA_MESSAGE};

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExportSinkError {
    message: String,
}

impl ExportSinkError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait Exporter: Send + Sync {
    /// Hands the document to the download target and reports where it landed.
    fn deliver(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, ExportSinkError>;
}

#[must_use]
pub fn unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[must_use]
pub fn export_file_name(table: &str, timestamp_millis: u128) -> String {
    format!("{table}_{timestamp_millis}.csv")
}

#[must_use]
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[must_use]
pub fn csv_line<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|field| quote_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Serializes what the data tab currently shows, header row first.
#[must_use]
pub fn data_view_csv(view: &DataView) -> String {
    let mut content = String::new();
    match view {
        DataView::Blank => {}
        DataView::Empty => {
            content.push_str(&csv_line(&[NO_DATA_MESSAGE]));
            content.push('\n');
        }
        DataView::Table(model) => {
            content.push_str(&csv_line(&model.columns));
            content.push('\n');
            for row in &model.rows {
                content.push_str(&csv_line(row));
                content.push('\n');
            }
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{csv_line, data_view_csv, export_file_name, quote_field};
    use crate::model::Row;
    use crate::pagination::DataView;
    use crate::results::render;

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(quote_field("He said \"hi\""), "\"He said \"\"hi\"\"\"");
    }

    #[test]
    fn every_field_is_quoted() {
        assert_eq!(csv_line(&["1", "plain", ""]), "\"1\",\"plain\",\"\"");
    }

    #[test]
    fn table_view_serializes_header_and_rows() {
        let rows: Vec<Row> = serde_json::from_value(json!([
            { "id": 1, "note": "a,b" },
            { "id": 2, "note": null }
        ]))
        .expect("rows");
        let csv = data_view_csv(&DataView::Table(render(&rows)));

        assert_eq!(
            csv,
            "\"id\",\"note\"\n\"1\",\"a,b\"\n\"2\",\"NULL\"\n"
        );
    }

    #[test]
    fn placeholder_and_blank_views() {
        assert_eq!(data_view_csv(&DataView::Empty), "\"No data\"\n");
        assert_eq!(data_view_csv(&DataView::Blank), "");
    }

    #[test]
    fn file_name_uses_table_and_timestamp() {
        assert_eq!(export_file_name("users", 1_700_000_000_000), "users_1700000000000.csv");
    }
}
