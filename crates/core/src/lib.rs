pub mod backend;
pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod export;
pub mod model;
pub mod pagination;
pub mod query_runner;
pub mod results;
pub mod schema;
pub mod session;

#[cfg(test)]
mod test_support;
