use super::{GameLibrary, epic, steam};
use crate::core::models::{Platform, ProgramRecord};
use std::path::{Path, PathBuf};

pub const PARADOX_LAUNCHER_ID: &str = "ParadoxLauncher";
pub const PARADOX_LAUNCHER_NAME: &str = "Paradox Launcher";

/// The launcher itself, surfaced as a single pseudo-program when its install
/// directory exists.
#[derive(Debug, Clone)]
pub struct ParadoxLibrary {
    install_dir: PathBuf,
}

impl ParadoxLibrary {
    pub fn new(install_dir: PathBuf) -> Self {
        Self { install_dir }
    }
}

impl GameLibrary for ParadoxLibrary {
    fn platform(&self) -> Platform {
        Platform::Paradox
    }

    fn is_available(&self) -> bool {
        self.install_dir.is_dir()
    }

    fn list_installed(&self) -> Vec<ProgramRecord> {
        if !self.is_available() {
            return Vec::new();
        }
        vec![ProgramRecord {
            platform: Platform::Paradox,
            id: PARADOX_LAUNCHER_ID.to_string(),
            name: PARADOX_LAUNCHER_NAME.to_string(),
            branch: None,
            build_id: None,
            directory: self.install_dir.clone(),
        }]
    }

    /// Both storefront SDKs can ship alongside the launcher; the probe
    /// returns the union.
    fn resolve_dll_directories(&self, directory: &Path) -> Option<Vec<PathBuf>> {
        let mut directories = steam::find_dll_directories(directory).unwrap_or_default();
        for dir in epic::find_dll_directories(directory).unwrap_or_default() {
            if !directories.contains(&dir) {
                directories.push(dir);
            }
        }
        (!directories.is_empty()).then_some(directories)
    }
}
