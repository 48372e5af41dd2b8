use super::*;

use std::fs;
use uuid::Uuid;

fn create_temp_dir(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("dlcdeck-{prefix}-{}", Uuid::new_v4()));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

const MANIFEST: &str = r#"
"AppState"
{
	"appid"		"10"
	"name"		"Base Game"
	"installdir"		"BaseGame"
	"buildid"		"42"
	"UserConfig"
	{
		"BetaKey"		"beta"
	}
}
"#;

#[test]
fn should_enumerate_steam_manifests() {
    let steamapps = create_temp_dir("steamapps");
    fs::create_dir_all(steamapps.join("common").join("BaseGame")).expect("create install dir");
    fs::write(steamapps.join("appmanifest_10.acf"), MANIFEST).expect("write manifest");
    fs::write(steamapps.join("appmanifest_11.acf"), "not a manifest").expect("write junk");
    fs::write(steamapps.join("libraryfolders.vdf"), "ignored").expect("write unrelated file");

    let library = SteamLibrary::new(vec![steamapps.clone()]);
    assert!(library.is_available());
    let records = library.list_installed();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.platform, Platform::Steam);
    assert_eq!(record.id, "10");
    assert_eq!(record.name, "Base Game");
    assert_eq!(record.branch.as_deref(), Some("beta"));
    assert_eq!(record.build_id, Some(42));
    assert_eq!(record.directory, steamapps.join("common").join("BaseGame"));

    let _ = fs::remove_dir_all(steamapps);
}

#[test]
fn should_skip_manifests_whose_install_dir_is_missing() {
    let steamapps = create_temp_dir("steamapps-missing");
    fs::write(steamapps.join("appmanifest_10.acf"), MANIFEST).expect("write manifest");

    let records = SteamLibrary::new(vec![steamapps.clone()]).list_installed();
    assert!(records.is_empty());

    let _ = fs::remove_dir_all(steamapps);
}

#[test]
fn should_probe_nested_sdk_dll_directories() {
    let root = create_temp_dir("dll-probe");
    let nested = root.join("game").join("bin");
    fs::create_dir_all(&nested).expect("create nested dir");
    fs::write(nested.join("Steam_API64.DLL"), b"dll").expect("write dll");
    fs::write(root.join("readme.txt"), b"text").expect("write decoy");

    let found = steam::find_dll_directories(&root).expect("probe hit");
    assert_eq!(found, vec![nested]);
    assert!(epic::find_dll_directories(&root).is_none());

    let empty = create_temp_dir("dll-probe-empty");
    assert!(steam::find_dll_directories(&empty).is_none());

    let _ = fs::remove_dir_all(root);
    let _ = fs::remove_dir_all(empty);
}

#[test]
fn should_enumerate_epic_item_manifests() {
    let manifests = create_temp_dir("epic-manifests");
    let install = create_temp_dir("epic-install");
    let item = serde_json::json!({
        "DisplayName": "Epic Game",
        "CatalogNamespace": "ns1",
        "InstallLocation": install.to_string_lossy(),
    });
    fs::write(
        manifests.join("abc.item"),
        serde_json::to_string(&item).expect("serialize item"),
    )
    .expect("write item");
    fs::write(manifests.join("broken.item"), "{").expect("write broken item");
    fs::write(manifests.join("notes.txt"), "ignored").expect("write unrelated file");

    let library = EpicLibrary::new(manifests.clone());
    assert!(library.is_available());
    let records = library.list_installed();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "ns1");
    assert_eq!(records[0].name, "Epic Game");
    assert_eq!(records[0].directory, install);

    let _ = fs::remove_dir_all(manifests);
    let _ = fs::remove_dir_all(install);
}

#[test]
fn should_surface_the_launcher_as_a_single_record() {
    let install = create_temp_dir("paradox-install");
    let library = ParadoxLibrary::new(install.clone());
    assert!(library.is_available());
    let records = library.list_installed();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, PARADOX_LAUNCHER_ID);
    assert_eq!(records[0].name, PARADOX_LAUNCHER_NAME);
    assert_eq!(records[0].platform, Platform::Paradox);

    let missing = ParadoxLibrary::new(install.join("gone"));
    assert!(!missing.is_available());
    assert!(missing.list_installed().is_empty());

    let _ = fs::remove_dir_all(install);
}

#[test]
fn should_union_both_sdk_probes_for_the_launcher() {
    let install = create_temp_dir("paradox-probe");
    let steam_dir = install.join("steam");
    let epic_dir = install.join("epic");
    fs::create_dir_all(&steam_dir).expect("create steam dir");
    fs::create_dir_all(&epic_dir).expect("create epic dir");
    fs::write(steam_dir.join("steam_api.dll"), b"dll").expect("write steam dll");
    fs::write(epic_dir.join("EOSSDK-Win64-Shipping.dll"), b"dll").expect("write epic dll");

    let library = ParadoxLibrary::new(install.clone());
    let found = library
        .resolve_dll_directories(&install)
        .expect("probe hit");
    assert!(found.contains(&steam_dir));
    assert!(found.contains(&epic_dir));

    let _ = fs::remove_dir_all(install);
}
