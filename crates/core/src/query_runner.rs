use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::backend::ConsoleBackend;
use crate::model::QueryResult;
use crate::results::{render, TabularModel};

pub const HISTORY_CAPACITY: usize = 10;
const HISTORY_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryValidationError {
    #[error("Please select a database first")]
    NoDatabaseSelected,
    #[error("Please enter a query")]
    EmptyQuery,
}

pub fn validate(selected_db: Option<&str>, query: &str) -> Result<(), QueryValidationError> {
    if selected_db.is_none() {
        return Err(QueryValidationError::NoDatabaseSelected);
    }
    if query.trim().is_empty() {
        return Err(QueryValidationError::EmptyQuery);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryHistory {
    capacity: usize,
    entries: VecDeque<String>,
}

impl Default for QueryHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl QueryHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "query history capacity must be greater than 0");
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Returns `true` when the query was not already present.
    pub fn record(&mut self, query: &str) -> bool {
        if self.entries.iter().any(|entry| entry == query) {
            return false;
        }
        self.entries.push_front(query.to_string());
        self.entries.truncate(self.capacity);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[must_use]
pub fn history_preview(query: &str) -> String {
    let mut chars = query.chars();
    let head = chars.by_ref().take(HISTORY_PREVIEW_CHARS).collect::<String>();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub result: QueryResult,
    pub elapsed: Duration,
}

impl QueryOutcome {
    #[must_use]
    pub fn display_time_ms(&self) -> u64 {
        match &self.result {
            QueryResult::Success {
                execution_time_ms: Some(reported),
                ..
            } => *reported,
            QueryResult::Success { .. } | QueryResult::Failure { .. } => {
                u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
            }
        }
    }
}

#[derive(Debug)]
pub struct QueryRunner<B: ConsoleBackend + ?Sized> {
    backend: Arc<B>,
}

impl<B: ConsoleBackend + ?Sized> QueryRunner<B> {
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn execute(&self, db_id: &str, query: &str) -> QueryOutcome {
        let started_at = Instant::now();
        let result = match self.backend.run_query(db_id, query).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(db_id, %error, "query request failed");
                QueryResult::failure(error.to_string())
            }
        };
        let elapsed = started_at.elapsed();

        if let QueryResult::Failure { message } = &result {
            tracing::debug!(db_id, %message, "query returned an error");
        }

        QueryOutcome { result, elapsed }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryPanel {
    pub error: Option<String>,
    pub timing: Option<String>,
    pub results: Option<TabularModel>,
}

impl QueryPanel {
    pub fn apply(&mut self, outcome: &QueryOutcome) {
        match &outcome.result {
            QueryResult::Failure { message } => {
                self.error = Some(message.clone());
                self.results = None;
            }
            QueryResult::Success {
                rows, row_count, ..
            } => {
                self.error = None;
                self.timing = Some(format!(
                    "Executed in {}ms ({} rows)",
                    outcome.display_time_ms(),
                    row_count
                ));
                self.results = Some(render(rows)).filter(|model| !model.is_empty());
            }
        }
    }
}
