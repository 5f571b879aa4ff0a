use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Top-level fields every mappings document must carry.
pub const REQUIRED_FIELDS: [&str; 3] = ["versions", "module_mappings", "generated"];

/// Steam release version -> literal CSS class string for one (module, webpack key) pair.
pub type ClassNameMapping = IndexMap<String, String>;

/// The full mappings document as published upstream.
///
/// Every map keeps document order, so "first" always means first as written
/// in the fetched JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub module_mappings: IndexMap<String, Module>,
    pub versions: IndexMap<String, ReleaseChannel>,
    #[serde(deserialize_with = "string_or_number")]
    pub generated: String,
}

/// One logical webpack module. Its per-version ids are aliases of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub name: Option<String>,
    pub ids: IndexMap<String, String>,
    #[serde(default)]
    pub classname_mappings: IndexMap<String, ClassNameMapping>,
    #[serde(default)]
    pub ignore_webpack_keys: Vec<String>,
}

impl Module {
    /// Module id of the first steam version listed for this module.
    #[must_use]
    pub fn first_id(&self) -> Option<&str> {
        self.ids.values().next().map(String::as_str)
    }

    /// Human name when present, `_<first id>` otherwise.
    #[must_use]
    pub fn stable_name(&self) -> Option<String> {
        match &self.name {
            Some(name) => Some(name.clone()),
            None => self.first_id().map(|id| format!("_{id}")),
        }
    }

    /// Distinct module ids across versions, first occurrence order.
    #[must_use]
    pub fn distinct_ids(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for id in self.ids.values() {
            if !out.contains(&id.as_str()) {
                out.push(id);
            }
        }
        out
    }

    #[must_use]
    pub fn steam_versions(&self) -> Vec<&str> {
        self.ids.keys().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReleaseChannel {
    Stable,
    Beta,
    Other(String),
}

impl ReleaseChannel {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stable => "stable",
            Self::Beta => "beta",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ReleaseChannel {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "stable" => Self::Stable,
            "beta" => Self::Beta,
            _ => Self::Other(raw),
        }
    }
}

impl From<ReleaseChannel> for String {
    fn from(channel: ReleaseChannel) -> Self {
        match channel {
            ReleaseChannel::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}
