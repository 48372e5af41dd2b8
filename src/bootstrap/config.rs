use crate::app::scan_service::BlockList;
use crate::core::models::ScanTarget;
use crate::core::{AppResult, ResultExt};
use crate::infrastructure::store_api::{DEFAULT_EPIC_CATALOG_URL, DEFAULT_STEAM_STORE_API_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_data_dir() -> PathBuf {
    PathBuf::from("dlcdeck-data")
}

fn default_store_api_url() -> String {
    DEFAULT_STEAM_STORE_API_URL.to_string()
}

fn default_epic_catalog_url() -> String {
    DEFAULT_EPIC_CATALOG_URL.to_string()
}

/// On-disk configuration. Every field has a default, so an absent file means
/// "scan with the built-in settings".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// `steamapps` directories to enumerate manifests from.
    pub steam_library_dirs: Vec<PathBuf>,
    pub epic_manifests_dir: Option<PathBuf>,
    pub paradox_install_dir: Option<PathBuf>,
    pub store_api_base_url: String,
    pub epic_catalog_url: String,
    pub appinfo_cache_dir: Option<PathBuf>,
    pub block_list: BlockList,
    /// Empty means "everything the libraries report".
    pub targets: Vec<ScanTarget>,
    pub select_all_new: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            steam_library_dirs: Vec::new(),
            epic_manifests_dir: None,
            paradox_install_dir: None,
            store_api_base_url: default_store_api_url(),
            epic_catalog_url: default_epic_catalog_url(),
            appinfo_cache_dir: None,
            block_list: BlockList::default(),
            targets: Vec::new(),
            select_all_new: false,
        }
    }
}

impl AppConfig {
    pub fn appinfo_cache_dir(&self) -> PathBuf {
        self.appinfo_cache_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("appinfo"))
    }

    pub fn choices_path(&self) -> PathBuf {
        self.data_dir.join("choices.json")
    }
}

pub fn load_config(path: &Path) -> AppResult<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_code("config_read_failed", "failed to read the configuration file")?;
    serde_json::from_str(&raw).with_code(
        "config_parse_failed",
        "the configuration file is not valid JSON",
    )
}

#[cfg(test)]
#[path = "../../tests/bootstrap/config_tests.rs"]
mod tests;
