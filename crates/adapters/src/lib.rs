pub mod export;
pub mod http;
