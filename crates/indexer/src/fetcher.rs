use crate::FetchError;
use async_trait::async_trait;
use cssmap_protocol::{Dataset, REQUIRED_FIELDS};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.deckthemes.com/mappings.json";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of mappings documents for the refresh loop.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Dataset, FetchError>;

    /// Human readable origin used in log lines.
    fn describe(&self) -> String;
}

/// Fetches the mappings document over HTTP(S).
pub struct HttpFetcher {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    fn classify(&self, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            #[allow(clippy::cast_possible_truncation)]
            let timeout_ms = self.timeout.as_millis() as u64;
            return FetchError::Timeout {
                url: self.url.clone(),
                timeout_ms,
            };
        }
        FetchError::Transport {
            url: self.url.clone(),
            source,
        }
    }
}

#[async_trait]
impl DatasetFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<Dataset, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        parse_dataset(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads the mappings document from a local file.
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetFetcher for FileFetcher {
    async fn fetch(&self) -> Result<Dataset, FetchError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        parse_dataset(&raw)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parse a raw mappings document, checking the required top-level fields
/// before the typed decode so a missing field is reported by name.
pub fn parse_dataset(raw: &[u8]) -> Result<Dataset, FetchError> {
    let value: serde_json::Value = serde_json::from_slice(raw).map_err(FetchError::Parse)?;

    for field in REQUIRED_FIELDS {
        if value.get(field).is_none() {
            return Err(FetchError::MissingField(field));
        }
    }

    serde_json::from_value(value).map_err(FetchError::Schema)
}
