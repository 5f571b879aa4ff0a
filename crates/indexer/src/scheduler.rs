use crate::fetcher::DatasetFetcher;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::{build, IndexerError, Result};
use log::{debug, error, info};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time;

#[derive(Debug, Clone, Copy)]
pub struct RefreshConfig {
    /// Wait after a successful commit before the next refresh.
    pub interval: Duration,
    /// Wait after a failed cycle before retrying.
    pub retry_backoff: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60 * 24),
            retry_backoff: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    /// Waiting out the refresh interval after a commit.
    Idle,
    /// Fetching, building, or backing off after a failure.
    Refreshing,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshHealth {
    pub state: RefreshState,
    pub last_success: Option<SystemTime>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub successful_refreshes: u64,
    pub last_duration_ms: Option<u64>,
}

impl RefreshHealth {
    fn initial() -> Self {
        Self {
            state: RefreshState::Refreshing,
            last_success: None,
            last_error: None,
            consecutive_failures: 0,
            total_failures: 0,
            successful_refreshes: 0,
            last_duration_ms: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshUpdate {
    pub completed_at: SystemTime,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
    pub class_count: Option<usize>,
}

enum SchedulerCommand {
    Trigger,
}

/// Handle to the background refresh loop.
///
/// The first cycle starts immediately. A failed cycle is retried after
/// `retry_backoff` forever; the previously committed snapshot stays in place
/// until a cycle succeeds. Dropping the last clone of the handle stops the loop.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<RefreshSchedulerInner>,
}

struct RefreshSchedulerInner {
    command_tx: mpsc::Sender<SchedulerCommand>,
    update_tx: broadcast::Sender<RefreshUpdate>,
    health_tx: watch::Sender<RefreshHealth>,
}

impl RefreshScheduler {
    /// Spawn the refresh loop on the current tokio runtime.
    pub fn start(
        fetcher: Arc<dyn DatasetFetcher>,
        store: SnapshotStore,
        config: RefreshConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (health_tx, _) = watch::channel(RefreshHealth::initial());
        let (update_tx, _) = broadcast::channel(32);

        spawn_refresh_loop(
            fetcher,
            store,
            config,
            command_rx,
            update_tx.clone(),
            health_tx.clone(),
        );

        Self {
            inner: Arc::new(RefreshSchedulerInner {
                command_tx,
                update_tx,
                health_tx,
            }),
        }
    }

    /// Cut the current wait short and refresh now.
    pub async fn trigger(&self) -> Result<()> {
        self.inner
            .command_tx
            .send(SchedulerCommand::Trigger)
            .await
            .map_err(|e| IndexerError::Other(format!("failed to send trigger: {e}")))?;
        Ok(())
    }

    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<RefreshUpdate> {
        self.inner.update_tx.subscribe()
    }

    #[must_use]
    pub fn health_snapshot(&self) -> RefreshHealth {
        self.inner.health_tx.borrow().clone()
    }

    #[must_use]
    pub fn health_stream(&self) -> watch::Receiver<RefreshHealth> {
        self.inner.health_tx.subscribe()
    }
}

/// One fetch + build + commit cycle. Nothing is committed on failure.
pub async fn refresh_once(
    fetcher: &dyn DatasetFetcher,
    store: &SnapshotStore,
) -> Result<Arc<Snapshot>> {
    info!("Fetching new version of mapping from {}", fetcher.describe());
    let dataset = fetcher.fetch().await?;
    let snapshot = build(dataset)?;
    let committed = store.commit(snapshot);
    info!("Fetched {} css translations", committed.class_count());
    Ok(committed)
}

fn spawn_refresh_loop(
    fetcher: Arc<dyn DatasetFetcher>,
    store: SnapshotStore,
    config: RefreshConfig,
    mut command_rx: mpsc::Receiver<SchedulerCommand>,
    update_tx: broadcast::Sender<RefreshUpdate>,
    health_tx: watch::Sender<RefreshHealth>,
) {
    tokio::spawn(async move {
        let mut health = RefreshHealth::initial();

        loop {
            health.state = RefreshState::Refreshing;
            health_tx.send_replace(health.clone());

            let started = Instant::now();
            let result = refresh_once(fetcher.as_ref(), &store).await;
            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = started.elapsed().as_millis() as u64;
            health.last_duration_ms = Some(duration_ms);

            let (wait, update) = match result {
                Ok(snapshot) => {
                    health.state = RefreshState::Idle;
                    health.last_success = Some(SystemTime::now());
                    health.last_error = None;
                    health.consecutive_failures = 0;
                    health.successful_refreshes += 1;
                    let update = RefreshUpdate {
                        completed_at: SystemTime::now(),
                        duration_ms,
                        success: true,
                        error: None,
                        class_count: Some(snapshot.class_count()),
                    };
                    (config.interval, update)
                }
                Err(err) => {
                    error!(
                        "Failed to fetch mappings: {err} (attempt {}, retrying in {:?})",
                        health.consecutive_failures + 1,
                        config.retry_backoff
                    );
                    health.last_error = Some(err.to_string());
                    health.consecutive_failures += 1;
                    health.total_failures += 1;
                    let update = RefreshUpdate {
                        completed_at: SystemTime::now(),
                        duration_ms,
                        success: false,
                        error: Some(err.to_string()),
                        class_count: None,
                    };
                    (config.retry_backoff, update)
                }
            };
            health_tx.send_replace(health.clone());
            let _ = update_tx.send(update);

            tokio::select! {
                () = time::sleep(wait) => {}
                cmd = command_rx.recv() => match cmd {
                    Some(SchedulerCommand::Trigger) => debug!("Mapping refresh triggered"),
                    None => break,
                },
            }
        }

        debug!("Mapping refresh loop stopped");
    });
}
