use super::GameLibrary;
use crate::core::models::{Platform, ProgramRecord};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

pub const STEAM_API_DLLS: [&str; 2] = ["steam_api.dll", "steam_api64.dll"];

const MANIFEST_PREFIX: &str = "appmanifest_";
const MANIFEST_SUFFIX: &str = ".acf";

/// Installed Steam programs, enumerated from `appmanifest_<id>.acf` files in
/// the configured `steamapps` directories.
#[derive(Debug, Clone)]
pub struct SteamLibrary {
    steamapps_dirs: Vec<PathBuf>,
}

/// First string value for `key` in a VDF document, e.g. `"appid" "440"`.
fn vdf_string(raw: &str, key: &str) -> Option<String> {
    let pattern = format!(r#"(?mi)^\s*"{}"\s+"([^"]*)""#, regex::escape(key));
    let captures = Regex::new(&pattern).ok()?.captures(raw)?;
    let value = captures.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_manifest(steamapps_dir: &Path, raw: &str) -> Option<ProgramRecord> {
    let id = vdf_string(raw, "appid")?;
    let name = vdf_string(raw, "name")?;
    let install_dir = vdf_string(raw, "installdir")?;
    let directory = steamapps_dir.join("common").join(install_dir);
    if !directory.is_dir() {
        return None;
    }
    Some(ProgramRecord {
        platform: Platform::Steam,
        id,
        name,
        branch: vdf_string(raw, "BetaKey"),
        build_id: vdf_string(raw, "buildid").and_then(|value| value.parse().ok()),
        directory,
    })
}

pub fn find_dll_directories(directory: &Path) -> Option<Vec<PathBuf>> {
    super::find_dirs_with_dlls(directory, &STEAM_API_DLLS)
}

impl SteamLibrary {
    pub fn new(steamapps_dirs: Vec<PathBuf>) -> Self {
        Self { steamapps_dirs }
    }
}

impl GameLibrary for SteamLibrary {
    fn platform(&self) -> Platform {
        Platform::Steam
    }

    fn is_available(&self) -> bool {
        self.steamapps_dirs.iter().any(|dir| dir.is_dir())
    }

    fn list_installed(&self) -> Vec<ProgramRecord> {
        let mut records: Vec<ProgramRecord> = Vec::new();
        for steamapps_dir in &self.steamapps_dirs {
            let Ok(entries) = fs::read_dir(steamapps_dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                    continue;
                };
                if !file_name.starts_with(MANIFEST_PREFIX) || !file_name.ends_with(MANIFEST_SUFFIX)
                {
                    continue;
                }
                let Ok(raw) = fs::read_to_string(&path) else {
                    tracing::debug!(
                        event = "steam_manifest_unreadable",
                        path = %path.display()
                    );
                    continue;
                };
                match parse_manifest(steamapps_dir, &raw) {
                    Some(record) => {
                        if !records.iter().any(|known| known.id == record.id) {
                            records.push(record);
                        }
                    }
                    None => {
                        tracing::debug!(
                            event = "steam_manifest_skipped",
                            path = %path.display()
                        );
                    }
                }
            }
        }
        records
    }

    fn resolve_dll_directories(&self, directory: &Path) -> Option<Vec<PathBuf>> {
        find_dll_directories(directory)
    }
}
