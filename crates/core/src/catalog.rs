use crate::backend::{BackendError, ConsoleBackend};
use crate::model::Database;

pub const NO_TABLES_MESSAGE: &str = "No tables found";
pub const TABLES_FAILED_MESSAGE: &str = "Failed to load tables";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TableListing {
    #[default]
    NotLoaded,
    Empty,
    Tables(Vec<String>),
    Failed,
}

impl TableListing {
    #[must_use]
    pub fn tables(&self) -> &[String] {
        match self {
            Self::Tables(tables) => tables,
            Self::NotLoaded | Self::Empty | Self::Failed => &[],
        }
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Empty => Some(NO_TABLES_MESSAGE),
            Self::Failed => Some(TABLES_FAILED_MESSAGE),
            Self::NotLoaded | Self::Tables(_) => None,
        }
    }
}

pub async fn load_databases<B: ConsoleBackend + ?Sized>(
    backend: &B,
) -> Result<Vec<Database>, BackendError> {
    let databases = backend.list_databases().await?;
    tracing::debug!(count = databases.len(), "loaded database catalog");
    Ok(databases)
}

pub async fn load_tables<B: ConsoleBackend + ?Sized>(backend: &B, db_id: &str) -> TableListing {
    match backend.list_tables(db_id).await {
        Ok(tables) if tables.is_empty() => TableListing::Empty,
        Ok(tables) => TableListing::Tables(tables),
        Err(error) => {
            tracing::warn!(db_id, %error, "failed to load tables");
            TableListing::Failed
        }
    }
}
