use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    Steam,
    Epic,
    Paradox,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Steam => "steam",
            Self::Epic => "epic",
            Self::Paradox => "paradox",
        }
    }
}

/// One installed program as reported by a storefront library. Transient:
/// produced by enumeration, consumed once per scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRecord {
    pub platform: Platform,
    pub id: String,
    pub name: String,
    pub branch: Option<String>,
    pub build_id: Option<i64>,
    pub directory: PathBuf,
}

/// Optional result of a remote or cached metadata query. Every field may be
/// absent; a program or DLC legitimately lacking metadata is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppMetadata {
    pub name: Option<String>,
    pub header_icon: Option<String>,
    pub client_icon: Option<String>,
    pub publisher: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DlcKind {
    Steam,
    EpicEntitlement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DlcEntry {
    pub id: String,
    pub kind: DlcKind,
    pub name: String,
    pub icon_url: Option<String>,
}

/// Selector for one program the user asked to scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanTarget {
    pub platform: Platform,
    pub id: String,
    pub name: String,
}

/// Structured app-info document produced by the local cache-building helper
/// tool, queryable by dotted path. Missing children resolve to `None` rather
/// than failing, so callers can chain speculative lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfoTree(serde_json::Value);

impl AppInfoTree {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn get(&self, path: &str) -> Option<&serde_json::Value> {
        let mut current = &self.0;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|value| value.as_str())
    }

    fn value_to_id(value: &serde_json::Value) -> Option<String> {
        match value {
            serde_json::Value::String(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            serde_json::Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    /// DLC app ids listed by the helper tool, in document order with
    /// duplicates removed: the comma-separated `extended.listofdlc` field
    /// plus every `depots.*.dlcappid` value.
    pub fn dlc_app_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        let mut push = |id: String| {
            if !ids.contains(&id) {
                ids.push(id);
            }
        };

        if let Some(list) = self.get_str("extended.listofdlc") {
            for id in list.split(',') {
                let id = id.trim();
                if !id.is_empty() {
                    push(id.to_string());
                }
            }
        }
        if let Some(depots) = self.get("depots").and_then(|value| value.as_object()) {
            for depot in depots.values() {
                if let Some(id) = depot.get("dlcappid").and_then(Self::value_to_id) {
                    push(id);
                }
            }
        }
        ids
    }
}
