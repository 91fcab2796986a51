use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::backend::ConsoleBackend;
use crate::catalog::{load_databases, load_tables, TableListing};
use crate::connectivity::ConnectionIndicator;
use crate::export::{data_view_csv, export_file_name, unix_timestamp_millis, ExportSinkError, Exporter};
use crate::model::{Database, PaginationInfo};
use crate::pagination::{
    load_page, page_label, target_page, DataView, PageControls, PageNavigation, PageRequest,
    DEFAULT_PAGE_SIZE,
};
use crate::query_runner::{validate, QueryHistory, QueryPanel, QueryRunner, QueryValidationError};
use crate::schema::{load_table_info, SchemaView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Info,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub databases: Vec<Database>,
    pub current_db_id: Option<String>,
    pub current_table: Option<String>,
    pub current_tab: Tab,
    pub current_page: u32,
    pub page_size: u32,
    pub query_history: QueryHistory,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl SessionState {
    #[must_use]
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            databases: Vec::new(),
            current_db_id: None,
            current_table: None,
            current_tab: Tab::Info,
            current_page: 1,
            page_size: page_size.max(1),
            query_history: QueryHistory::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadDatabases,
    SelectDatabase(String),
    RefreshTables,
    SelectTable(String),
    SwitchTab(Tab),
    SetPageSize(u32),
    Navigate(PageNavigation),
    RunQuery(String),
    RecallHistory(usize),
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    Query(QueryValidationError),
    NoTableSelected,
    InvalidPageSize,
}

impl Alert {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Query(error) => error.to_string(),
            Self::NoTableSelected => "Please select a table first".to_string(),
            Self::InvalidPageSize => "Page size must be greater than 0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataPanel {
    pub view: DataView,
    pub pagination: Option<PaginationInfo>,
}

impl DataPanel {
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.pagination.as_ref().map(page_label)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("export failed: {0}")]
    Export(#[from] ExportSinkError),
}

pub struct SessionController<B: ConsoleBackend + ?Sized> {
    backend: Arc<B>,
    runner: QueryRunner<B>,
    exporter: Box<dyn Exporter>,
    indicator: ConnectionIndicator,
    state: SessionState,
    tables: TableListing,
    table_content_visible: bool,
    schema: Option<SchemaView>,
    data: DataPanel,
    query: QueryPanel,
    query_draft: String,
    alert: Option<Alert>,
    notice: Option<String>,
}

impl<B: ConsoleBackend + ?Sized> SessionController<B> {
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        exporter: Box<dyn Exporter>,
        indicator: ConnectionIndicator,
        page_size: u32,
    ) -> Self {
        Self {
            runner: QueryRunner::new(Arc::clone(&backend)),
            backend,
            exporter,
            indicator,
            state: SessionState::with_page_size(page_size),
            tables: TableListing::NotLoaded,
            table_content_visible: false,
            schema: None,
            data: DataPanel::default(),
            query: QueryPanel::default(),
            query_draft: String::new(),
            alert: None,
            notice: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn tables(&self) -> &TableListing {
        &self.tables
    }

    #[must_use]
    pub fn schema(&self) -> Option<&SchemaView> {
        self.schema.as_ref()
    }

    #[must_use]
    pub fn data(&self) -> &DataPanel {
        &self.data
    }

    #[must_use]
    pub fn query_panel(&self) -> &QueryPanel {
        &self.query
    }

    #[must_use]
    pub fn query_draft(&self) -> &str {
        &self.query_draft
    }

    pub fn set_query_draft(&mut self, text: impl Into<String>) {
        self.query_draft = text.into();
    }

    #[must_use]
    pub fn alert(&self) -> Option<Alert> {
        self.alert
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn indicator(&self) -> &ConnectionIndicator {
        &self.indicator
    }

    #[must_use]
    pub fn table_content_visible(&self) -> bool {
        self.table_content_visible
    }

    #[must_use]
    pub fn current_database(&self) -> Option<&Database> {
        let db_id = self.state.current_db_id.as_deref()?;
        self.state.databases.iter().find(|db| db.id == db_id)
    }

    #[must_use]
    pub fn page_controls(&self) -> PageControls {
        let total_pages = self
            .data
            .pagination
            .map_or(self.state.current_page, |pagination| pagination.total_pages);
        PageControls::derive(self.state.current_page, total_pages)
    }

    pub async fn dispatch(&mut self, command: Command) -> Result<(), SessionError> {
        tracing::debug!(?command, "dispatching session command");
        match command {
            Command::LoadDatabases => self.load_databases().await,
            Command::SelectDatabase(db_id) => self.select_database(&db_id).await,
            Command::RefreshTables => self.refresh_tables().await,
            Command::SelectTable(table) => self.select_table(table).await,
            Command::SwitchTab(tab) => self.switch_tab(tab).await,
            Command::SetPageSize(page_size) => self.set_page_size(page_size).await,
            Command::Navigate(navigation) => self.navigate(navigation).await,
            Command::RunQuery(query) => self.run_query(&query).await,
            Command::RecallHistory(index) => self.recall_history(index),
            Command::Export => return self.export(),
        }
        Ok(())
    }

    async fn load_databases(&mut self) {
        match load_databases(self.backend.as_ref()).await {
            Ok(databases) => {
                self.state.databases = databases;
                if self.state.current_db_id.is_none() {
                    if let Some(first) = self.state.databases.first().map(|db| db.id.clone()) {
                        self.select_database(&first).await;
                    }
                }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to load databases");
                self.indicator.set(false);
            }
        }
    }

    async fn select_database(&mut self, db_id: &str) {
        if !self.state.databases.iter().any(|db| db.id == db_id) {
            tracing::warn!(db_id, "ignoring selection of unknown database");
            return;
        }

        self.state.current_db_id = Some(db_id.to_string());
        self.state.current_table = None;
        self.state.current_page = 1;
        self.schema = None;
        self.data = DataPanel::default();

        if let Err(error) = self.backend.database_info(db_id).await {
            tracing::warn!(db_id, %error, "failed to load database info");
        }
        self.tables = load_tables(self.backend.as_ref(), db_id).await;
        self.table_content_visible = false;
    }

    async fn refresh_tables(&mut self) {
        if let Some(db_id) = self.state.current_db_id.clone() {
            self.tables = load_tables(self.backend.as_ref(), &db_id).await;
        }
    }

    async fn select_table(&mut self, table: String) {
        if self.state.current_db_id.is_none() {
            tracing::warn!(table = %table, "table selected without a database");
            return;
        }

        self.state.current_table = Some(table);
        self.state.current_page = 1;
        self.data.pagination = None;
        self.table_content_visible = true;
        self.load_active_tab().await;
    }

    async fn switch_tab(&mut self, tab: Tab) {
        self.state.current_tab = tab;
        self.load_active_tab().await;
    }

    async fn set_page_size(&mut self, page_size: u32) {
        if page_size == 0 {
            self.alert = Some(Alert::InvalidPageSize);
            return;
        }

        self.state.page_size = page_size;
        self.state.current_page = 1;
        self.load_data().await;
    }

    async fn navigate(&mut self, navigation: PageNavigation) {
        if !self.page_controls().allows(navigation) {
            return;
        }

        let total_pages = self
            .data
            .pagination
            .map_or(self.state.current_page, |pagination| pagination.total_pages);
        self.state.current_page = target_page(navigation, self.state.current_page, total_pages);
        self.load_data().await;
    }

    async fn load_active_tab(&mut self) {
        match self.state.current_tab {
            Tab::Info => self.load_info().await,
            Tab::Data => self.load_data().await,
        }
    }

    async fn load_info(&mut self) {
        let (Some(db_id), Some(table)) = (
            self.state.current_db_id.clone(),
            self.state.current_table.clone(),
        ) else {
            return;
        };

        match load_table_info(self.backend.as_ref(), &db_id, &table).await {
            Ok(info) => self.schema = Some(SchemaView::from_info(&info)),
            Err(error) => tracing::warn!(db_id = %db_id, table = %table, %error, "failed to load table info"),
        }
    }

    async fn load_data(&mut self) {
        let (Some(db_id), Some(table)) = (
            self.state.current_db_id.clone(),
            self.state.current_table.clone(),
        ) else {
            return;
        };

        let request = PageRequest::new(self.state.current_page, self.state.page_size);
        match load_page(self.backend.as_ref(), &db_id, &table, request).await {
            Ok(page) => {
                self.state.current_page = page.pagination.page;
                self.data = DataPanel {
                    view: DataView::from_page(&page),
                    pagination: Some(page.pagination),
                };
            }
            Err(error) => tracing::warn!(db_id = %db_id, table = %table, %error, "failed to load table data"),
        }
    }

    async fn run_query(&mut self, query: &str) {
        let db_id = match validate(self.state.current_db_id.as_deref(), query) {
            Ok(()) => self.state.current_db_id.clone().unwrap_or_default(),
            Err(error) => {
                self.alert = Some(Alert::Query(error));
                return;
            }
        };

        self.state.query_history.record(query);
        let outcome = self.runner.execute(&db_id, query).await;
        self.query.apply(&outcome);
    }

    fn recall_history(&mut self, index: usize) {
        if let Some(query) = self.state.query_history.get(index) {
            self.query_draft = query.to_string();
        }
    }

    fn export(&mut self) -> Result<(), SessionError> {
        let Some(table) = self
            .state
            .current_db_id
            .as_ref()
            .and(self.state.current_table.as_deref())
        else {
            self.alert = Some(Alert::NoTableSelected);
            return Ok(());
        };

        let csv = data_view_csv(&self.data.view);
        let file_name = export_file_name(table, unix_timestamp_millis());
        let path: PathBuf = self.exporter.deliver(&file_name, csv.as_bytes())?;
        tracing::info!(path = %path.display(), "exported visible rows");
        self.notice = Some(format!("Exported to {}", path.display()));
        Ok(())
    }
}
