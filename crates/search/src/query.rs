use crate::suggest::{suggest, SUGGESTION_LIMIT};
use crate::{Result, SearchError};
use cssmap_indexer::{ClassRef, Snapshot, SnapshotStore};
use cssmap_protocol::{ClassNameMapping, Module};
use serde::Serialize;
use std::sync::Arc;

/// One (module, webpack key) pair with its per-version class names.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Entry<'a> {
    pub module_id: &'a str,
    pub module: &'a Module,
    pub webpack_key: &'a str,
    pub classes: &'a ClassNameMapping,
}

impl Entry<'_> {
    /// `<module name>_<webpack key>`, or `_<first id>_<webpack key>` for unnamed modules.
    #[must_use]
    pub fn canonical_name(&self) -> Option<String> {
        let name = self.module.stable_name()?;
        Some(format!("{name}_{}", self.webpack_key))
    }
}

/// Answers lookups against whatever snapshot the store currently holds.
#[derive(Clone)]
pub struct QueryEngine {
    store: SnapshotStore,
}

impl QueryEngine {
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    /// Pin the current snapshot for a batch of queries.
    pub fn view(&self) -> Result<MappingView> {
        self.store
            .get()
            .map(MappingView::new)
            .ok_or(SearchError::NotInitialized)
    }
}

/// Read view over one snapshot. A later commit does not affect an open view.
#[derive(Debug, Clone)]
pub struct MappingView {
    snapshot: Arc<Snapshot>,
}

impl MappingView {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn find_module(&self, module_id: &str) -> Option<&Module> {
        self.snapshot.module(module_id)
    }

    #[must_use]
    pub fn find_css_class(&self, css_class: &str) -> Option<Entry<'_>> {
        let class_ref = self.snapshot.css_classes().get(css_class)?;
        self.resolve(class_ref)
    }

    /// Every module registering `webpack_key`, in registration order.
    #[must_use]
    pub fn find_webpack_key(&self, webpack_key: &str) -> Option<Vec<Entry<'_>>> {
        let refs = self.snapshot.webpack_keys().get(webpack_key)?;
        Some(refs.iter().filter_map(|r| self.resolve(r)).collect())
    }

    #[must_use]
    pub fn canonical_name(&self, css_class: &str) -> Option<String> {
        self.find_css_class(css_class)?.canonical_name()
    }

    #[must_use]
    pub fn suggest_css_classes(&self, needle: &str) -> Vec<&str> {
        suggest(self.snapshot.css_classes().keys(), needle, SUGGESTION_LIMIT)
    }

    #[must_use]
    pub fn suggest_webpack_keys(&self, needle: &str) -> Vec<&str> {
        suggest(self.snapshot.webpack_keys().keys(), needle, SUGGESTION_LIMIT)
    }

    fn resolve<'a>(&'a self, class_ref: &'a ClassRef) -> Option<Entry<'a>> {
        let (module, classes) = self.snapshot.mapping(class_ref)?;
        Some(Entry {
            module_id: &class_ref.module_id,
            module,
            webpack_key: &class_ref.webpack_key,
            classes,
        })
    }
}
