//! Command-line and HTTP adapters over the cssmap index.

pub mod convert;
pub mod http_api;
pub mod output;
pub mod report;
pub mod validate;
