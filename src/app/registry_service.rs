use crate::core::models::{DlcEntry, DlcKind, ScanTarget};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The durable aggregate for one program: everything a scan discovered about
/// it plus the user's DLC choices. Lives for the session; survives rescans
/// while the program stays requested.
#[derive(Debug, Clone, Default)]
pub struct ProgramSelection {
    pub id: String,
    pub name: String,
    pub root_directory: PathBuf,
    pub dll_directories: Vec<PathBuf>,
    pub is_steam: bool,
    pub is_epic: bool,
    pub enabled: bool,
    /// Every DLC discovered for this program, superset of `selected_dlc`.
    pub all_dlc: BTreeMap<String, DlcEntry>,
    /// User-enabled subset of `all_dlc` and `extra_dlc`.
    pub selected_dlc: BTreeMap<String, DlcEntry>,
    /// User-supplied DLC the scan never discovered.
    pub extra_dlc: BTreeMap<String, DlcEntry>,
    pub product_url: Option<String>,
    pub icon_url: Option<String>,
    pub sub_icon_url: Option<String>,
    pub publisher: Option<String>,
}

impl ProgramSelection {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Idempotent select/deselect of one DLC id. Selecting an id unknown to
    /// both `all_dlc` and `extra_dlc` synthesizes a bare entry into
    /// `extra_dlc`, keeping every selected id backed by a known entry.
    pub fn toggle_dlc(&mut self, dlc_id: &str, on: bool) {
        if !on {
            self.selected_dlc.remove(dlc_id);
            return;
        }
        let entry = self
            .all_dlc
            .get(dlc_id)
            .or_else(|| self.extra_dlc.get(dlc_id))
            .cloned()
            .unwrap_or_else(|| {
                let synthesized = DlcEntry {
                    id: dlc_id.to_string(),
                    kind: if self.is_epic {
                        DlcKind::EpicEntitlement
                    } else {
                        DlcKind::Steam
                    },
                    name: dlc_id.to_string(),
                    icon_url: None,
                };
                self.extra_dlc
                    .insert(dlc_id.to_string(), synthesized.clone());
                synthesized
            });
        self.selected_dlc.insert(dlc_id.to_string(), entry);
    }

    pub fn is_dlc_selected(&self, dlc_id: &str) -> bool {
        self.selected_dlc.contains_key(dlc_id)
    }

    fn owns_dlc(&self, dlc_id: &str) -> bool {
        self.all_dlc.contains_key(dlc_id) || self.extra_dlc.contains_key(dlc_id)
    }
}

/// Process-wide table of program selections, owned by the session and passed
/// explicitly to whoever mutates it. Lookups never create entries; creation
/// happens only where a scan result is merged (`upsert`).
#[derive(Debug, Default)]
pub struct SelectionRegistry {
    programs: BTreeMap<String, ProgramSelection>,
}

impl SelectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_id(&self, id: &str) -> Option<&ProgramSelection> {
        self.programs.get(id)
    }

    pub fn from_id_mut(&mut self, id: &str) -> Option<&mut ProgramSelection> {
        self.programs.get_mut(id)
    }

    pub fn take(&mut self, id: &str) -> Option<ProgramSelection> {
        self.programs.remove(id)
    }

    /// Registers (or replaces) a selection. DLC ids share the id namespace
    /// with programs; an entry colliding with any registered program id is
    /// dropped here instead of relying on lookup order to disambiguate.
    pub fn upsert(&mut self, mut selection: ProgramSelection) {
        let colliding: Vec<String> = selection
            .all_dlc
            .keys()
            .chain(selection.extra_dlc.keys())
            .filter(|dlc_id| {
                *dlc_id == &selection.id || self.programs.contains_key(*dlc_id)
            })
            .cloned()
            .collect();
        for dlc_id in colliding {
            tracing::warn!(
                event = "dlc_id_collides_with_program_id",
                program_id = selection.id.as_str(),
                dlc_id = dlc_id.as_str()
            );
            selection.all_dlc.remove(&dlc_id);
            selection.extra_dlc.remove(&dlc_id);
            selection.selected_dlc.remove(&dlc_id);
        }
        self.programs.insert(selection.id.clone(), selection);
    }

    /// Resolves a DLC id to its owning program by scanning each selection's
    /// `all_dlc`. Ids are unique by construction of the storefront id space,
    /// so the first match is authoritative.
    pub fn dlc_from_id(&self, dlc_id: &str) -> Option<(&str, &DlcEntry)> {
        self.programs.values().find_map(|selection| {
            selection
                .all_dlc
                .get(dlc_id)
                .map(|entry| (selection.id.as_str(), entry))
        })
    }

    /// Select/deselect a DLC by id on whichever program owns it. No-op when
    /// no program owns the id.
    pub fn toggle_dlc(&mut self, dlc_id: &str, on: bool) -> bool {
        let Some(owner) = self
            .programs
            .values_mut()
            .find(|selection| selection.owns_dlc(dlc_id))
        else {
            return false;
        };
        owner.toggle_dlc(dlc_id, on);
        true
    }

    /// Drops selections for programs no longer requested, prunes DLL
    /// directories that no longer resolve on disk, and drops selections left
    /// with none. Survivors keep their `selected_dlc` and `enabled` state,
    /// which is what preserves user choices across rescans. Idempotent.
    pub fn validate_all(&mut self, requested: &[ScanTarget]) {
        self.programs.retain(|id, selection| {
            if !requested.iter().any(|target| target.id == *id) {
                return false;
            }
            selection.dll_directories.retain(|dir| dir.is_dir());
            !selection.dll_directories.is_empty()
        });
    }

    pub fn all(&self) -> impl Iterator<Item = &ProgramSelection> {
        self.programs.values()
    }

    pub fn all_enabled(&self) -> impl Iterator<Item = &ProgramSelection> {
        self.programs.values().filter(|selection| selection.enabled)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn clear(&mut self) {
        self.programs.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/app/registry_service_tests.rs"]
mod tests;
