use crate::backend::{BackendError, ConsoleBackend};
use crate::model::{PaginationInfo, TablePage};
use crate::results::{render, TabularModel};

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const NO_DATA_MESSAGE: &str = "No data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNavigation {
    First,
    Previous,
    Next,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageControls {
    pub first: bool,
    pub previous: bool,
    pub next: bool,
    pub last: bool,
}

impl PageControls {
    #[must_use]
    pub fn derive(current_page: u32, total_pages: u32) -> Self {
        let has_previous = current_page > 1;
        let has_next = current_page < total_pages;
        Self {
            first: has_previous,
            previous: has_previous,
            next: has_next,
            last: has_next,
        }
    }

    #[must_use]
    pub fn allows(&self, navigation: PageNavigation) -> bool {
        match navigation {
            PageNavigation::First => self.first,
            PageNavigation::Previous => self.previous,
            PageNavigation::Next => self.next,
            PageNavigation::Last => self.last,
        }
    }
}

/// Resolves a navigation against the page count known at dispatch time.
#[must_use]
pub fn target_page(navigation: PageNavigation, current_page: u32, total_pages: u32) -> u32 {
    match navigation {
        PageNavigation::First => 1,
        PageNavigation::Previous => current_page.saturating_sub(1).max(1),
        PageNavigation::Next => current_page.saturating_add(1),
        PageNavigation::Last => total_pages.max(1),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DataView {
    #[default]
    Blank,
    Empty,
    Table(TabularModel),
}

impl DataView {
    #[must_use]
    pub fn from_page(page: &TablePage) -> Self {
        if page.rows.is_empty() {
            Self::Empty
        } else {
            Self::Table(render(&page.rows))
        }
    }
}

#[must_use]
pub fn page_label(pagination: &PaginationInfo) -> String {
    format!(
        "Page {} of {} ({} rows)",
        pagination.page, pagination.total_pages, pagination.total_rows
    )
}

pub async fn load_page<B: ConsoleBackend + ?Sized>(
    backend: &B,
    db_id: &str,
    table: &str,
    request: PageRequest,
) -> Result<TablePage, BackendError> {
    tracing::debug!(
        db_id,
        table,
        page = request.page,
        page_size = request.page_size,
        "requesting table page"
    );
    backend
        .table_page(db_id, table, request.page, request.page_size)
        .await
}
