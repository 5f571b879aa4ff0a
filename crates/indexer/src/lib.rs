//! # cssmap indexer
//!
//! Fetches the cross-version CSS mappings document and turns it into an
//! immutable, atomically replaced lookup snapshot.
//!
//! ## Pipeline
//!
//! ```text
//! Source (HTTP / file)
//!     │
//!     ├──> DatasetFetcher (required fields checked)
//!     │      └─> Dataset
//!     │
//!     ├──> build()
//!     │      └─> Snapshot (webpack key index, css class index, latest versions)
//!     │
//!     └──> SnapshotStore::commit
//!            └─> readers see the old or the new snapshot, never a mix
//! ```
//!
//! `RefreshScheduler` drives the pipeline on an interval and retries failures
//! with a short backoff, keeping the last good snapshot in place.
//!
//! ## Example
//!
//! ```no_run
//! use cssmap_indexer::{HttpFetcher, RefreshConfig, RefreshScheduler, SnapshotStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = HttpFetcher::new(
//!         cssmap_indexer::DEFAULT_BASE_URL,
//!         cssmap_indexer::DEFAULT_FETCH_TIMEOUT,
//!     )?;
//!     let store = SnapshotStore::new();
//!     let _scheduler = RefreshScheduler::start(Arc::new(fetcher), store.clone(), RefreshConfig::default());
//!
//!     let snapshot = store.wait_initialized().await?;
//!     println!("Loaded {} css translations", snapshot.class_count());
//!     Ok(())
//! }
//! ```

mod builder;
mod error;
mod fetcher;
mod scheduler;
mod snapshot;
mod stats;

pub use builder::{alias_key, build};
pub use error::{BuildError, FetchError, IndexerError, Result};
pub use fetcher::{
    parse_dataset, DatasetFetcher, FileFetcher, HttpFetcher, DEFAULT_BASE_URL,
    DEFAULT_FETCH_TIMEOUT,
};
pub use scheduler::{
    refresh_once, RefreshConfig, RefreshHealth, RefreshScheduler, RefreshState, RefreshUpdate,
};
pub use snapshot::{
    ClassRef, ConsistencyWarning, CssClassIndex, Snapshot, SnapshotStore, WebpackKeyIndex,
};
pub use stats::BuildStats;
