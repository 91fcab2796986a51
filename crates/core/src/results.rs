use serde_json::Value;

use crate::model::Row;

pub const NULL_LITERAL: &str = "NULL";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabularModel {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularModel {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn display_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| escape_markup(column))
            .collect()
    }

    #[must_use]
    pub fn display_cell(&self, row: usize, column: usize) -> Option<String> {
        self.rows
            .get(row)
            .and_then(|values| values.get(column))
            .map(|value| escape_markup(value))
    }

    #[must_use]
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|values| values.iter().map(|value| escape_markup(value)).collect())
            .collect()
    }
}

#[must_use]
pub fn render(rows: &[Row]) -> TabularModel {
    let Some(first) = rows.first() else {
        return TabularModel::default();
    };

    let columns = first.keys().cloned().collect::<Vec<_>>();
    let rendered = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| cell_text(row.get(column)))
                .collect()
        })
        .collect();

    TabularModel {
        columns,
        rows: rendered,
    }
}

#[must_use]
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NULL_LITERAL.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[must_use]
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
