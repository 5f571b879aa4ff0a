use serde::{Deserialize, Serialize};

/// Statistics about one index build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Number of modules processed
    pub modules: usize,

    /// Number of (module, webpack key) pairs registered
    pub webpack_entries: usize,

    /// Duplicate registrations that replaced an existing entry
    pub duplicates: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl BuildStats {
    pub fn add_module(&mut self) {
        self.modules += 1;
    }

    pub fn add_entry(&mut self) {
        self.webpack_entries += 1;
    }

    pub fn add_duplicate(&mut self) {
        self.duplicates += 1;
    }
}
