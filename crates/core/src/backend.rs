use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Database, DatabaseInfo, QueryResult, TableInfo, TablePage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[async_trait]
pub trait ConsoleBackend: Send + Sync {
    async fn ping(&self) -> Result<(), BackendError>;

    async fn list_databases(&self) -> Result<Vec<Database>, BackendError>;

    async fn database_info(&self, db_id: &str) -> Result<DatabaseInfo, BackendError>;

    async fn list_tables(&self, db_id: &str) -> Result<Vec<String>, BackendError>;

    async fn table_info(&self, db_id: &str, table: &str) -> Result<TableInfo, BackendError>;

    async fn table_page(
        &self,
        db_id: &str,
        table: &str,
        page: u32,
        limit: u32,
    ) -> Result<TablePage, BackendError>;

    /// Transport failures come back as `Err`; errors reported by the database
    /// itself arrive as `QueryResult::Failure`.
    async fn run_query(&self, db_id: &str, query: &str) -> Result<QueryResult, BackendError>;
}
