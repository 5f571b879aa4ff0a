use cssmap_indexer::{RefreshHealth, Snapshot};
use cssmap_protocol::{ClassNameMapping, Module};
use cssmap_search::Entry;
use indexmap::IndexMap;
use serde::Serialize;

/// Maximum (module, entry) pairs shown for one webpack key.
pub const MAX_WEBPACK_ENTRIES: usize = 3;

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub generated: String,
    pub latest_stable_version: String,
    pub latest_beta_version: String,
    pub class_count: usize,
    pub consistency_warnings: usize,
    pub versions: IndexMap<String, String>,
}

impl StatusOutput {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            generated: snapshot.generated().to_string(),
            latest_stable_version: snapshot.latest_stable_version().to_string(),
            latest_beta_version: snapshot.latest_beta_version().to_string(),
            class_count: snapshot.class_count(),
            consistency_warnings: snapshot.warnings().len(),
            versions: snapshot
                .versions()
                .iter()
                .map(|(version, channel)| (version.clone(), channel.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModuleOutput {
    pub module_id: String,
    pub name: Option<String>,
    pub ids: Vec<String>,
    pub steam_versions: Vec<String>,
    pub webpack_keys: Vec<String>,
    pub ignored_webpack_keys: Vec<String>,
}

impl ModuleOutput {
    pub fn new(module_id: &str, module: &Module) -> Self {
        Self {
            module_id: module_id.to_string(),
            name: module.name.clone(),
            ids: module.distinct_ids().into_iter().map(str::to_string).collect(),
            steam_versions: module
                .steam_versions()
                .into_iter()
                .map(str::to_string)
                .collect(),
            webpack_keys: module.classname_mappings.keys().cloned().collect(),
            ignored_webpack_keys: module.ignore_webpack_keys.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntryOutput {
    pub module: ModuleOutput,
    pub webpack_key: String,
    pub canonical_name: Option<String>,
    pub classes: ClassNameMapping,
}

impl EntryOutput {
    pub fn new(entry: &Entry<'_>) -> Self {
        Self {
            module: ModuleOutput::new(entry.module_id, entry.module),
            webpack_key: entry.webpack_key.to_string(),
            canonical_name: entry.canonical_name(),
            classes: entry.classes.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebpackOutput {
    pub total: usize,
    pub truncated: bool,
    pub entries: Vec<EntryOutput>,
}

impl WebpackOutput {
    pub fn new(entries: &[Entry<'_>]) -> Self {
        Self {
            total: entries.len(),
            truncated: entries.len() > MAX_WEBPACK_ENTRIES,
            entries: entries
                .iter()
                .take(MAX_WEBPACK_ENTRIES)
                .map(EntryOutput::new)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthOutput {
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<RefreshHealth>,
}
