use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

/// Any failure of one refresh cycle. Both variants are retried by the scheduler.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("response is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("{0} not found in returned json")]
    MissingField(&'static str),

    #[error("response does not match the mappings schema: {0}")]
    Schema(#[source] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("module {module_id} has no version ids")]
    ModuleWithoutIds { module_id: String },

    #[error("no mapped versions on the {channel} channel")]
    NoChannelVersions { channel: &'static str },

    #[error("version {version} on the {channel} channel is not an integer")]
    NonNumericVersion {
        channel: &'static str,
        version: String,
    },
}
