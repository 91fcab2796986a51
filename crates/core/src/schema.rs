use crate::backend::{BackendError, ConsoleBackend};
use crate::model::{IndexDescriptor, TableColumn, TableInfo};
use crate::results::escape_markup;

pub const NO_SCHEMA_MESSAGE: &str = "No schema information available";
pub const NO_INDEXES_MESSAGE: &str = "No indexes";
pub const DDL_UNAVAILABLE: &str = "Not available";

pub const COLUMN_HEADERS: [&str; 5] = ["Name", "Type", "Not Null", "Default", "Primary Key"];
pub const INDEX_HEADERS: [&str; 2] = ["Name", "SQL"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSection {
    Grid {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Placeholder(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaView {
    pub columns: SchemaSection,
    pub indexes: SchemaSection,
    pub create_table_sql: String,
}

impl SchemaView {
    #[must_use]
    pub fn from_info(info: &TableInfo) -> Self {
        let columns = if info.columns.is_empty() {
            SchemaSection::Placeholder(NO_SCHEMA_MESSAGE)
        } else {
            grid(&COLUMN_HEADERS, info.columns.iter().map(column_row))
        };

        let indexes = if info.indexes.is_empty() {
            SchemaSection::Placeholder(NO_INDEXES_MESSAGE)
        } else {
            grid(&INDEX_HEADERS, info.indexes.iter().map(index_row))
        };

        let create_table_sql = info
            .create_table_sql
            .as_deref()
            .filter(|sql| !sql.is_empty())
            .map_or_else(|| DDL_UNAVAILABLE.to_string(), escape_markup);

        Self {
            columns,
            indexes,
            create_table_sql,
        }
    }
}

fn grid(headers: &[&str], rows: impl Iterator<Item = Vec<String>>) -> SchemaSection {
    SchemaSection::Grid {
        headers: headers.iter().map(|header| (*header).to_string()).collect(),
        rows: rows.collect(),
    }
}

fn column_row(column: &TableColumn) -> Vec<String> {
    vec![
        escape_markup(&column.name),
        escape_markup(&column.column_type),
        yes_no(column.not_null),
        escape_markup(column.default_value.as_deref().unwrap_or_default()),
        yes_no(column.is_primary_key),
    ]
}

fn index_row(index: &IndexDescriptor) -> Vec<String> {
    vec![
        escape_markup(&index.name),
        escape_markup(&index.definition_sql),
    ]
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

pub async fn load_table_info<B: ConsoleBackend + ?Sized>(
    backend: &B,
    db_id: &str,
    table: &str,
) -> Result<TableInfo, BackendError> {
    let info = backend.table_info(db_id, table).await?;
    tracing::debug!(
        db_id,
        table,
        columns = info.columns.len(),
        indexes = info.indexes.len(),
        "loaded table schema"
    );
    Ok(info)
}
