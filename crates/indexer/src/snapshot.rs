use crate::{BuildStats, IndexerError, Result};
use cssmap_protocol::{ClassNameMapping, Dataset, Module, ReleaseChannel};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Points at one webpack key inside one module of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClassRef {
    pub module_id: String,
    pub webpack_key: String,
}

impl ClassRef {
    pub fn new(module_id: impl Into<String>, webpack_key: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            webpack_key: webpack_key.into(),
        }
    }
}

/// Webpack key -> every (module, key) pair registering it, in dataset order.
pub type WebpackKeyIndex = IndexMap<String, Vec<ClassRef>>;

/// Literal class string (or `_<id>_<key>` alias) -> owning pair.
pub type CssClassIndex = IndexMap<String, ClassRef>;

/// A class string registered by two different pairs; `replacement` won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyWarning {
    pub css_class: String,
    pub previous: ClassRef,
    pub replacement: ClassRef,
}

/// Immutable result of one successful fetch + build cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub(crate) dataset: Dataset,
    pub(crate) webpack_keys: WebpackKeyIndex,
    pub(crate) css_classes: CssClassIndex,
    pub(crate) latest_stable: String,
    pub(crate) latest_beta: String,
    pub(crate) warnings: Vec<ConsistencyWarning>,
    pub(crate) stats: BuildStats,
}

impl Snapshot {
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[must_use]
    pub fn module(&self, module_id: &str) -> Option<&Module> {
        self.dataset.module_mappings.get(module_id)
    }

    /// Class mapping of a registered pair.
    #[must_use]
    pub fn mapping(&self, class_ref: &ClassRef) -> Option<(&Module, &ClassNameMapping)> {
        let module = self.module(&class_ref.module_id)?;
        let mapping = module.classname_mappings.get(&class_ref.webpack_key)?;
        Some((module, mapping))
    }

    #[must_use]
    pub fn generated(&self) -> &str {
        &self.dataset.generated
    }

    #[must_use]
    pub fn versions(&self) -> &IndexMap<String, ReleaseChannel> {
        &self.dataset.versions
    }

    #[must_use]
    pub fn channel_of(&self, steam_version: &str) -> Option<&ReleaseChannel> {
        self.dataset.versions.get(steam_version)
    }

    #[must_use]
    pub fn latest_stable_version(&self) -> &str {
        &self.latest_stable
    }

    #[must_use]
    pub fn latest_beta_version(&self) -> &str {
        &self.latest_beta
    }

    #[must_use]
    pub fn css_classes(&self) -> &CssClassIndex {
        &self.css_classes
    }

    #[must_use]
    pub fn webpack_keys(&self) -> &WebpackKeyIndex {
        &self.webpack_keys
    }

    /// Entries in the class index, aliases included.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.css_classes.len()
    }

    #[must_use]
    pub fn warnings(&self) -> &[ConsistencyWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

/// Holds the active snapshot. Single writer, any number of readers.
///
/// Readers clone an `Arc` out of a `watch` channel, so a commit never blocks
/// them and they only ever observe a complete snapshot.
#[derive(Clone)]
pub struct SnapshotStore {
    tx: Arc<watch::Sender<Option<Arc<Snapshot>>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot, or `None` before the first successful build.
    #[must_use]
    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Replace the active snapshot wholesale.
    pub fn commit(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.tx.subscribe()
    }

    /// Wait until a snapshot has been committed.
    pub async fn wait_initialized(&self) -> Result<Arc<Snapshot>> {
        let mut rx = self.tx.subscribe();
        let guard = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|e| IndexerError::Other(format!("snapshot channel closed: {e}")))?;
        guard
            .clone()
            .ok_or_else(|| IndexerError::Other("snapshot missing after commit".to_string()))
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
