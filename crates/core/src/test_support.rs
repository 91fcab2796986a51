use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::backend::{BackendError, ConsoleBackend};
use crate::model::{
    Database, DatabaseInfo, PaginationInfo, QueryResult, Row, TableInfo, TablePage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageCall {
    pub db_id: String,
    pub table: String,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    pub databases: Mutex<Vec<Database>>,
    pub tables: Mutex<HashMap<String, Vec<String>>>,
    pub table_infos: Mutex<HashMap<String, TableInfo>>,
    pub table_rows: Mutex<HashMap<String, Vec<Row>>>,
    pub query_results: Mutex<HashMap<String, QueryResult>>,
    pub fail_ping: AtomicBool,
    pub fail_databases: AtomicBool,
    pub fail_database_info: AtomicBool,
    pub fail_tables: AtomicBool,
    pub fail_table_info: AtomicBool,
    pub fail_pages: AtomicBool,
    pub fail_queries: AtomicBool,
    pub ping_calls: AtomicUsize,
    pub info_calls: Mutex<Vec<String>>,
    pub table_info_calls: Mutex<Vec<(String, String)>>,
    pub page_calls: Mutex<Vec<PageCall>>,
    pub query_calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_catalog() -> Self {
        let backend = Self::default();
        *backend.databases.lock().expect("lock") = vec![
            Database::new("main", "Main", "/data/main.db"),
            Database::new("logs", "Logs", "/data/logs.db"),
        ];
        backend.tables.lock().expect("lock").extend([
            (
                "main".to_string(),
                vec!["users".to_string(), "orders".to_string()],
            ),
            ("logs".to_string(), Vec::new()),
        ]);
        backend
    }

    pub fn with_rows(self, table: &str, count: usize) -> Self {
        self.set_rows(table, count);
        self
    }

    pub fn set_rows(&self, table: &str, count: usize) {
        let rows = (1..=count)
            .map(|index| {
                serde_json::from_value::<Row>(json!({ "id": index, "name": format!("row-{index}") }))
                    .expect("fixture row should decode")
            })
            .collect();
        self.table_rows
            .lock()
            .expect("lock")
            .insert(table.to_string(), rows);
    }

    pub fn page_calls(&self) -> Vec<PageCall> {
        self.page_calls.lock().expect("lock").clone()
    }

    pub fn query_calls(&self) -> Vec<String> {
        self.query_calls.lock().expect("lock").clone()
    }
}

fn failure(flag: &AtomicBool, message: &str) -> Result<(), BackendError> {
    if flag.load(Ordering::SeqCst) {
        return Err(BackendError::new(message));
    }
    Ok(())
}

#[async_trait]
impl ConsoleBackend for FakeBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        failure(&self.fail_ping, "connection refused")
    }

    async fn list_databases(&self) -> Result<Vec<Database>, BackendError> {
        failure(&self.fail_databases, "connection refused")?;
        Ok(self.databases.lock().expect("lock").clone())
    }

    async fn database_info(&self, db_id: &str) -> Result<DatabaseInfo, BackendError> {
        self.info_calls.lock().expect("lock").push(db_id.to_string());
        failure(&self.fail_database_info, "info unavailable")?;
        Ok(DatabaseInfo::default())
    }

    async fn list_tables(&self, db_id: &str) -> Result<Vec<String>, BackendError> {
        failure(&self.fail_tables, "tables unavailable")?;
        Ok(self
            .tables
            .lock()
            .expect("lock")
            .get(db_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn table_info(&self, db_id: &str, table: &str) -> Result<TableInfo, BackendError> {
        self.table_info_calls
            .lock()
            .expect("lock")
            .push((db_id.to_string(), table.to_string()));
        failure(&self.fail_table_info, "schema unavailable")?;
        Ok(self
            .table_infos
            .lock()
            .expect("lock")
            .get(table)
            .cloned()
            .unwrap_or_default())
    }

    async fn table_page(
        &self,
        db_id: &str,
        table: &str,
        page: u32,
        limit: u32,
    ) -> Result<TablePage, BackendError> {
        self.page_calls.lock().expect("lock").push(PageCall {
            db_id: db_id.to_string(),
            table: table.to_string(),
            page,
            limit,
        });
        failure(&self.fail_pages, "page unavailable")?;

        let rows = self
            .table_rows
            .lock()
            .expect("lock")
            .get(table)
            .cloned()
            .unwrap_or_default();
        let limit_rows = limit.max(1) as usize;
        let total_pages = rows.len().div_ceil(limit_rows).max(1);
        let page = (page as usize).clamp(1, total_pages);
        let slice = rows
            .into_iter()
            .skip((page - 1) * limit_rows)
            .take(limit_rows)
            .collect::<Vec<_>>();
        let total_rows = self
            .table_rows
            .lock()
            .expect("lock")
            .get(table)
            .map_or(0, Vec::len);

        Ok(TablePage {
            rows: slice,
            pagination: PaginationInfo::new(
                u32::try_from(page).expect("page fits"),
                u32::try_from(total_pages).expect("pages fit"),
                total_rows as u64,
            ),
        })
    }

    async fn run_query(&self, _db_id: &str, query: &str) -> Result<QueryResult, BackendError> {
        self.query_calls.lock().expect("lock").push(query.to_string());
        failure(&self.fail_queries, "network unreachable")?;
        Ok(self
            .query_results
            .lock()
            .expect("lock")
            .get(query)
            .cloned()
            .unwrap_or(QueryResult::Success {
                rows: Vec::new(),
                row_count: 0,
                execution_time_ms: None,
            }))
    }
}
