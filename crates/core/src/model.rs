use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
}

impl Database {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatabaseInfo {
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub column_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    pub definition_sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableInfo {
    pub columns: Vec<TableColumn>,
    pub indexes: Vec<IndexDescriptor>,
    pub create_table_sql: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationInfo {
    pub page: u32,
    pub total_pages: u32,
    pub total_rows: u64,
}

impl PaginationInfo {
    #[must_use]
    pub fn new(page: u32, total_pages: u32, total_rows: u64) -> Self {
        Self {
            page: page.max(1),
            total_pages: total_pages.max(1),
            total_rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TablePage {
    pub rows: Vec<Row>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Success {
        rows: Vec<Row>,
        row_count: u64,
        execution_time_ms: Option<u64>,
    },
    Failure {
        message: String,
    },
}

impl QueryResult {
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}
