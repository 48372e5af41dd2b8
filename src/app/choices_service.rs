use crate::app::registry_service::SelectionRegistry;
use crate::core::{AppResult, ResultExt};
use std::path::Path;

/// Re-applies a persisted id list to the registry as "already selected"
/// hints: program ids re-enable their selection, DLC ids re-select on their
/// owning program. Ids unknown to the registry are skipped; hint application
/// never fails.
pub fn apply_selected_hints(registry: &mut SelectionRegistry, ids: &[String]) {
    for id in ids {
        if let Some(selection) = registry.from_id_mut(id) {
            selection.enabled = true;
            continue;
        }
        if !registry.toggle_dlc(id, true) {
            tracing::debug!(event = "choice_hint_unknown_id", id = id.as_str());
        }
    }
}

/// Extracts the current selection as a stable ordered id list: each enabled
/// program followed by its selected DLC ids.
pub fn collect_selected(registry: &SelectionRegistry) -> Vec<String> {
    let mut ids = Vec::new();
    for selection in registry.all_enabled() {
        ids.push(selection.id.clone());
        ids.extend(selection.selected_dlc.keys().cloned());
    }
    ids
}

pub fn load_choices(path: &Path) -> AppResult<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path).with_code(
        "choices_read_failed",
        "failed to read the selected-id choices file",
    )?;
    serde_json::from_str(&raw).with_code(
        "choices_parse_failed",
        "the selected-id choices file is not a valid id list",
    )
}

pub fn save_choices(path: &Path, ids: &[String]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_code(
            "choices_dir_create_failed",
            "failed to create the choices directory",
        )?;
    }
    let raw = serde_json::to_string_pretty(ids).with_code(
        "choices_serialize_failed",
        "failed to serialize the selected-id list",
    )?;
    std::fs::write(path, raw).with_code(
        "choices_write_failed",
        "failed to write the selected-id choices file",
    )
}

#[cfg(test)]
#[path = "../../tests/app/choices_service_tests.rs"]
mod tests;
