use super::GameLibrary;
use crate::core::models::{Platform, ProgramRecord};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const EPIC_SDK_DLLS: [&str; 2] = ["EOSSDK-Win32-Shipping.dll", "EOSSDK-Win64-Shipping.dll"];

const ITEM_SUFFIX: &str = ".item";

/// Installed Epic programs, enumerated from the launcher's `Manifests/*.item`
/// JSON files. The catalog namespace doubles as the program id.
#[derive(Debug, Clone)]
pub struct EpicLibrary {
    manifests_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ItemManifest {
    #[serde(rename = "DisplayName", default)]
    display_name: String,
    #[serde(rename = "CatalogNamespace", default)]
    catalog_namespace: String,
    #[serde(rename = "InstallLocation", default)]
    install_location: String,
}

pub fn find_dll_directories(directory: &Path) -> Option<Vec<PathBuf>> {
    super::find_dirs_with_dlls(directory, &EPIC_SDK_DLLS)
}

impl EpicLibrary {
    pub fn new(manifests_dir: PathBuf) -> Self {
        Self { manifests_dir }
    }
}

impl GameLibrary for EpicLibrary {
    fn platform(&self) -> Platform {
        Platform::Epic
    }

    fn is_available(&self) -> bool {
        self.manifests_dir.is_dir()
    }

    fn list_installed(&self) -> Vec<ProgramRecord> {
        let Ok(entries) = fs::read_dir(&self.manifests_dir) else {
            return Vec::new();
        };
        let mut records: Vec<ProgramRecord> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_item = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(ITEM_SUFFIX));
            if !is_item {
                continue;
            }
            let Ok(raw) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(manifest) = serde_json::from_str::<ItemManifest>(&raw) else {
                tracing::debug!(event = "epic_manifest_skipped", path = %path.display());
                continue;
            };
            if manifest.catalog_namespace.is_empty() || manifest.display_name.is_empty() {
                continue;
            }
            let directory = PathBuf::from(&manifest.install_location);
            if !directory.is_dir() {
                continue;
            }
            if records
                .iter()
                .any(|known| known.id == manifest.catalog_namespace)
            {
                continue;
            }
            records.push(ProgramRecord {
                platform: Platform::Epic,
                id: manifest.catalog_namespace,
                name: manifest.display_name,
                branch: None,
                build_id: None,
                directory,
            });
        }
        records
    }

    fn resolve_dll_directories(&self, directory: &Path) -> Option<Vec<PathBuf>> {
        find_dll_directories(directory)
    }
}
