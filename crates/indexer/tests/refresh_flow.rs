use async_trait::async_trait;
use cssmap_indexer::{
    DatasetFetcher, FetchError, RefreshConfig, RefreshScheduler, RefreshState, RefreshUpdate,
    SnapshotStore,
};
use cssmap_protocol::Dataset;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

enum Step {
    Serve(&'static str),
    /// A well-formed document the builder rejects: no beta channel.
    ServeStableOnly(&'static str),
    Fail,
}

struct ScriptedFetcher {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetFetcher for ScriptedFetcher {
    async fn fetch(&self) -> Result<Dataset, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Serve(generated)) => Ok(dataset(generated)),
            Some(Step::ServeStableOnly(generated)) => Ok(stable_only_dataset(generated)),
            Some(Step::Fail) | None => Err(FetchError::MissingField("module_mappings")),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn dataset(generated: &str) -> Dataset {
    serde_json::from_value(serde_json::json!({
        "versions": {"100": "stable", "101": "beta"},
        "generated": generated,
        "module_mappings": {
            "m1": {"name": null, "ids": {"100": "99"}, "classname_mappings": {"root": {"100": "foo_abc"}}}
        }
    }))
    .unwrap()
}

fn stable_only_dataset(generated: &str) -> Dataset {
    serde_json::from_value(serde_json::json!({
        "versions": {"100": "stable"},
        "generated": generated,
        "module_mappings": {
            "m1": {"name": null, "ids": {"100": "99"}, "classname_mappings": {"root": {"100": "foo_abc"}}}
        }
    }))
    .unwrap()
}

fn config() -> RefreshConfig {
    RefreshConfig {
        interval: Duration::from_secs(24 * 60 * 60),
        retry_backoff: Duration::from_secs(5),
    }
}

async fn next_update(updates: &mut Receiver<RefreshUpdate>) -> RefreshUpdate {
    updates.recv().await.expect("refresh update")
}

#[tokio::test(start_paused = true)]
async fn failures_keep_last_good_snapshot() {
    let fetcher = ScriptedFetcher::new(vec![
        Step::Serve("first"),
        Step::Fail,
        Step::Fail,
        Step::Fail,
        Step::Serve("second"),
    ]);
    let store = SnapshotStore::new();
    let scheduler = RefreshScheduler::start(fetcher.clone(), store.clone(), config());
    let mut updates = scheduler.subscribe_updates();

    let update = next_update(&mut updates).await;
    assert!(update.success);
    assert_eq!(update.class_count, Some(2));
    let good = store.get().expect("snapshot after first refresh");
    let good_copy = (*good).clone();
    assert_eq!(scheduler.health_snapshot().state, RefreshState::Idle);

    scheduler.trigger().await.unwrap();
    for attempt in 1..=3u32 {
        let update = next_update(&mut updates).await;
        assert!(!update.success);
        assert!(update.error.unwrap().contains("module_mappings"));

        let current = store.get().unwrap();
        assert!(Arc::ptr_eq(&current, &good));
        assert_eq!(*current, good_copy);

        let health = scheduler.health_snapshot();
        assert_eq!(health.consecutive_failures, attempt);
        assert_eq!(health.state, RefreshState::Refreshing);
    }

    let update = next_update(&mut updates).await;
    assert!(update.success);
    assert_eq!(store.get().unwrap().generated(), "second");

    let health = scheduler.health_snapshot();
    assert_eq!(health.consecutive_failures, 0);
    assert_eq!(health.total_failures, 3);
    assert_eq!(health.successful_refreshes, 2);
    assert!(health.last_error.is_none());
    assert_eq!(fetcher.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn failing_first_cycle_retries_on_backoff() {
    let fetcher = ScriptedFetcher::new(vec![Step::Fail, Step::Fail, Step::Serve("late")]);
    let store = SnapshotStore::new();
    let scheduler = RefreshScheduler::start(fetcher.clone(), store.clone(), config());
    let mut updates = scheduler.subscribe_updates();

    assert!(!next_update(&mut updates).await.success);
    assert!(store.get().is_none());

    // The retry lands well before one backoff-and-a-half has passed.
    let started = tokio::time::Instant::now();
    assert!(!next_update(&mut updates).await.success);
    assert!(started.elapsed() <= Duration::from_secs(6));

    assert!(next_update(&mut updates).await.success);
    assert_eq!(store.get().unwrap().generated(), "late");
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn success_waits_full_interval() {
    let fetcher = ScriptedFetcher::new(vec![Step::Serve("one"), Step::Serve("two")]);
    let store = SnapshotStore::new();
    let scheduler = RefreshScheduler::start(fetcher.clone(), store.clone(), config());
    let mut updates = scheduler.subscribe_updates();

    assert!(next_update(&mut updates).await.success);

    let early = tokio::time::timeout(Duration::from_secs(23 * 60 * 60), updates.recv()).await;
    assert!(early.is_err(), "refresh ran before the interval elapsed");
    assert_eq!(fetcher.calls(), 1);

    assert!(next_update(&mut updates).await.success);
    assert_eq!(store.get().unwrap().generated(), "two");
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_loop() {
    let fetcher = ScriptedFetcher::new(vec![Step::Serve("only")]);
    let store = SnapshotStore::new();
    let scheduler = RefreshScheduler::start(fetcher.clone(), store.clone(), config());
    let mut updates = scheduler.subscribe_updates();

    assert!(next_update(&mut updates).await.success);
    drop(scheduler);

    assert!(matches!(updates.recv().await, Err(RecvError::Closed)));
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(store.get().unwrap().generated(), "only");
}

#[tokio::test(start_paused = true)]
async fn build_failure_retries_on_backoff_and_keeps_snapshot() {
    let fetcher = ScriptedFetcher::new(vec![
        Step::Serve("g0"),
        Step::ServeStableOnly("g1"),
        Step::Serve("g2"),
    ]);
    let store = SnapshotStore::new();
    let scheduler = RefreshScheduler::start(fetcher.clone(), store.clone(), config());
    let mut updates = scheduler.subscribe_updates();

    assert!(next_update(&mut updates).await.success);
    let good = store.get().unwrap();

    scheduler.trigger().await.unwrap();
    let update = next_update(&mut updates).await;
    assert!(!update.success);
    assert!(update.error.unwrap().contains("beta"));
    assert!(Arc::ptr_eq(&store.get().unwrap(), &good));
    assert_eq!(store.get().unwrap().generated(), "g0");
    assert_eq!(scheduler.health_snapshot().consecutive_failures, 1);

    let failed_at = tokio::time::Instant::now();
    let update = next_update(&mut updates).await;
    assert!(update.success);
    let waited = failed_at.elapsed();
    assert!(waited >= Duration::from_secs(5), "retried after {waited:?}");
    assert!(waited <= Duration::from_secs(6), "retried after {waited:?}");
    assert_eq!(store.get().unwrap().generated(), "g2");
    assert_eq!(fetcher.calls(), 3);
}
