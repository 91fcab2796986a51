use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tablescope_core::backend::{BackendError, ConsoleBackend};
use tablescope_core::model::{
    Database, DatabaseInfo, IndexDescriptor, PaginationInfo, QueryResult, Row, TableColumn,
    TableInfo, TablePage,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpBackendError {
    #[error("invalid API base URL `{url}`: {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct HttpConsoleBackend {
    client: Client,
    base_url: Url,
}

impl HttpConsoleBackend {
    pub fn new(base_url: &str) -> Result<Self, HttpBackendError> {
        let parsed = Url::parse(base_url).map_err(|error| HttpBackendError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: error.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(HttpBackendError::InvalidBaseUrl {
                url: base_url.to_string(),
                message: "URL cannot be used as a base".to_string(),
            });
        }

        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, BackendError> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(to_backend_error)?;
        let response = ensure_success(response)?;
        response.json::<T>().await.map_err(to_backend_error)
    }
}

#[async_trait]
impl ConsoleBackend for HttpConsoleBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.endpoint(&["databases"]))
            .send()
            .await
            .map_err(to_backend_error)?;
        ensure_success(response).map(|_| ())
    }

    async fn list_databases(&self) -> Result<Vec<Database>, BackendError> {
        let body: DatabasesBody = self.get_json(self.endpoint(&["databases"])).await?;
        Ok(body.databases)
    }

    async fn database_info(&self, db_id: &str) -> Result<DatabaseInfo, BackendError> {
        let raw: Value = self
            .get_json(self.endpoint(&["databases", db_id, "info"]))
            .await?;
        Ok(DatabaseInfo { raw })
    }

    async fn list_tables(&self, db_id: &str) -> Result<Vec<String>, BackendError> {
        let body: TablesBody = self
            .get_json(self.endpoint(&["databases", db_id, "tables"]))
            .await?;
        Ok(body.tables)
    }

    async fn table_info(&self, db_id: &str, table: &str) -> Result<TableInfo, BackendError> {
        let body: SchemaBody = self
            .get_json(self.endpoint(&["databases", db_id, "schema", table]))
            .await?;
        Ok(body.into_table_info())
    }

    async fn table_page(
        &self,
        db_id: &str,
        table: &str,
        page: u32,
        limit: u32,
    ) -> Result<TablePage, BackendError> {
        let mut url = self.endpoint(&["databases", db_id, "table", table]);
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());

        let body: PageBody = self.get_json(url).await?;
        Ok(body.into_table_page(page))
    }

    async fn run_query(&self, db_id: &str, query: &str) -> Result<QueryResult, BackendError> {
        let url = self.endpoint(&["databases", db_id, "query"]);
        tracing::debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(to_backend_error)?;

        // Query errors arrive as JSON bodies on non-2xx statuses too.
        let body: QueryBody = response.json().await.map_err(to_backend_error)?;
        Ok(body.into_query_result())
    }
}

fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BackendError::new(format!(
            "{} returned HTTP {status}",
            response.url().path()
        )))
    }
}

fn to_backend_error(error: reqwest::Error) -> BackendError {
    BackendError::new(error.to_string())
}

#[derive(Debug, Deserialize)]
struct DatabasesBody {
    #[serde(default)]
    databases: Vec<Database>,
}

#[derive(Debug, Deserialize)]
struct TablesBody {
    #[serde(default)]
    tables: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ColumnBody {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    column_type: String,
    #[serde(default)]
    notnull: Value,
    #[serde(default)]
    dflt_value: Value,
    #[serde(default)]
    pk: Value,
}

#[derive(Debug, Deserialize)]
struct IndexBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sql: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SchemaBody {
    #[serde(default)]
    columns: Vec<ColumnBody>,
    #[serde(default)]
    indexes: Vec<IndexBody>,
    #[serde(default, rename = "createTable")]
    create_table: Option<String>,
}

impl SchemaBody {
    fn into_table_info(self) -> TableInfo {
        TableInfo {
            columns: self
                .columns
                .into_iter()
                .map(|column| TableColumn {
                    name: column.name,
                    column_type: column.column_type,
                    not_null: flag(&column.notnull),
                    default_value: scalar_text(column.dflt_value),
                    is_primary_key: flag(&column.pk),
                })
                .collect(),
            indexes: self
                .indexes
                .into_iter()
                .map(|index| IndexDescriptor {
                    name: index.name,
                    definition_sql: index.sql.unwrap_or_default(),
                })
                .collect(),
            create_table_sql: self.create_table.filter(|sql| !sql.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaginationBody {
    #[serde(default)]
    page: u32,
    #[serde(default, rename = "totalPages")]
    total_pages: u32,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    data: Vec<Row>,
    #[serde(default)]
    pagination: Option<PaginationBody>,
}

impl PageBody {
    fn into_table_page(self, requested_page: u32) -> TablePage {
        let pagination = self.pagination.map_or_else(
            || PaginationInfo::new(requested_page, 1, self.data.len() as u64),
            |body| PaginationInfo::new(body.page, body.total_pages, body.total),
        );
        TablePage {
            rows: self.data,
            pagination,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    data: Option<Vec<Row>>,
    #[serde(default, rename = "rowCount")]
    row_count: Option<u64>,
    #[serde(default, rename = "executionTime")]
    execution_time: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

impl QueryBody {
    fn into_query_result(self) -> QueryResult {
        if let Some(message) = self.error.filter(|message| !message.is_empty()) {
            return QueryResult::Failure { message };
        }

        QueryResult::Success {
            rows: self.data.unwrap_or_default(),
            row_count: self.row_count.unwrap_or(0),
            execution_time_ms: self
                .execution_time
                .filter(|millis| millis.is_finite() && *millis > 0.0)
                .map(|millis| millis.round() as u64),
        }
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(text.as_str(), "1" | "true"),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}
