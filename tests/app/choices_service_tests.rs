use super::*;

use crate::app::registry_service::ProgramSelection;
use crate::core::models::{DlcEntry, DlcKind};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

fn create_temp_dir(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("dlcdeck-{prefix}-{}", Uuid::new_v4()));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn entry(id: &str) -> DlcEntry {
    DlcEntry {
        id: id.to_string(),
        kind: DlcKind::Steam,
        name: format!("DLC {id}"),
        icon_url: None,
    }
}

fn seeded_registry() -> SelectionRegistry {
    let mut first = ProgramSelection::new("10");
    first.all_dlc.insert("1".to_string(), entry("1"));
    first.all_dlc.insert("2".to_string(), entry("2"));

    let mut second = ProgramSelection::new("20");
    second.all_dlc.insert("3".to_string(), entry("3"));

    let mut registry = SelectionRegistry::new();
    registry.upsert(first);
    registry.upsert(second);
    registry
}

#[test]
fn should_collect_enabled_programs_followed_by_their_selected_dlc() {
    let mut registry = seeded_registry();
    registry.toggle_dlc("2", true);
    registry.toggle_dlc("1", true);
    registry.from_id_mut("10").expect("program").enabled = true;

    let ids = collect_selected(&registry);
    assert_eq!(ids, vec!["10".to_string(), "1".to_string(), "2".to_string()]);
}

#[test]
fn should_apply_hints_to_programs_and_dlc_and_skip_unknown_ids() {
    let mut registry = seeded_registry();
    let hints = [
        "10".to_string(),
        "3".to_string(),
        "nope".to_string(),
    ];
    apply_selected_hints(&mut registry, &hints);

    assert!(registry.from_id("10").expect("program").enabled);
    assert!(registry.from_id("20").expect("program").is_dlc_selected("3"));
    assert!(registry.dlc_from_id("nope").is_none());
}

#[test]
fn should_round_trip_the_choices_file() {
    let dir = create_temp_dir("choices");
    let path = dir.join("nested").join("choices.json");
    let ids = vec!["10".to_string(), "1".to_string()];

    save_choices(&path, &ids).expect("save choices");
    assert_eq!(load_choices(&path).expect("load choices"), ids);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn should_treat_a_missing_choices_file_as_empty() {
    let dir = create_temp_dir("choices-missing");
    let ids = load_choices(&dir.join("choices.json")).expect("load choices");
    assert!(ids.is_empty());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn should_fail_with_a_parse_code_on_corrupt_choices() {
    let dir = create_temp_dir("choices-corrupt");
    let path = dir.join("choices.json");
    fs::write(&path, "{ not json ]").expect("write corrupt file");

    let error = load_choices(&path).expect_err("parse should fail");
    assert_eq!(error.code, "choices_parse_failed");

    let _ = fs::remove_dir_all(dir);
}
