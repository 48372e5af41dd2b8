use super::*;

use crate::infrastructure::store_api::Entitlement;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn create_temp_dir(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("dlcdeck-{prefix}-{}", Uuid::new_v4()));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

struct FakeLibrary {
    platform: Platform,
    records: Vec<ProgramRecord>,
    dll_dirs: HashMap<PathBuf, Vec<PathBuf>>,
}

impl GameLibrary for FakeLibrary {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_available(&self) -> bool {
        true
    }

    fn list_installed(&self) -> Vec<ProgramRecord> {
        self.records.clone()
    }

    fn resolve_dll_directories(&self, directory: &Path) -> Option<Vec<PathBuf>> {
        self.dll_dirs
            .get(directory)
            .cloned()
            .filter(|dirs| !dirs.is_empty())
    }
}

struct FakeCatalog(HashMap<String, StoreAppDetails>);

impl StoreCatalog for FakeCatalog {
    async fn query_app(&self, app_id: &str, _is_dlc: bool) -> Option<StoreAppDetails> {
        self.0.get(app_id).cloned()
    }
}

struct FakeAppInfo(HashMap<String, serde_json::Value>);

impl CachedAppInfo for FakeAppInfo {
    async fn query_app_info(
        &self,
        app_id: &str,
        _branch: Option<&str>,
        _build_id: Option<i64>,
    ) -> Option<AppInfoTree> {
        self.0.get(app_id).cloned().map(AppInfoTree::new)
    }
}

struct FakeEntitlements(HashMap<String, Vec<Entitlement>>);

impl EntitlementCatalog for FakeEntitlements {
    async fn query_entitlements(&self, namespace: &str) -> Vec<Entitlement> {
        self.0.get(namespace).cloned().unwrap_or_default()
    }
}

type FakeProviders = MetadataProviders<FakeCatalog, FakeAppInfo, FakeEntitlements>;

fn providers(
    catalog: HashMap<String, StoreAppDetails>,
    app_info: HashMap<String, serde_json::Value>,
    entitlements: HashMap<String, Vec<Entitlement>>,
) -> FakeProviders {
    MetadataProviders {
        catalog: Arc::new(FakeCatalog(catalog)),
        app_info: Arc::new(FakeAppInfo(app_info)),
        entitlements: Arc::new(FakeEntitlements(entitlements)),
    }
}

fn record(platform: Platform, id: &str, name: &str, directory: &Path) -> ProgramRecord {
    ProgramRecord {
        platform,
        id: id.to_string(),
        name: name.to_string(),
        branch: None,
        build_id: None,
        directory: directory.to_path_buf(),
    }
}

fn target(platform: Platform, id: &str, name: &str) -> ScanTarget {
    ScanTarget {
        platform,
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn details(name: &str, dlc_ids: &[&str]) -> StoreAppDetails {
    StoreAppDetails {
        name: name.to_string(),
        header_image: Some(format!("https://img.example/{}.jpg", name.replace(' ', "-"))),
        publishers: vec!["Example Publishing".to_string()],
        dlc_ids: dlc_ids.iter().map(|id| id.to_string()).collect(),
    }
}

/// One Steam program "10" installed under a fresh temp directory, with its
/// DLL directory really on disk so rescans keep it valid.
fn steam_world(prefix: &str) -> (PathBuf, Arc<dyn GameLibrary>, Vec<ScanTarget>) {
    let root = create_temp_dir(prefix);
    let bin = root.join("bin");
    fs::create_dir_all(&bin).expect("create bin dir");
    let library = FakeLibrary {
        platform: Platform::Steam,
        records: vec![record(Platform::Steam, "10", "Base Game", &root)],
        dll_dirs: HashMap::from([(root.clone(), vec![bin])]),
    };
    let targets = vec![target(Platform::Steam, "10", "Base Game")];
    (root, Arc::new(library), targets)
}

#[allow(clippy::too_many_arguments)]
async fn run_scan(
    registry: &mut SelectionRegistry,
    tree: &mut SelectionTree,
    libraries: &[Arc<dyn GameLibrary>],
    providers: &FakeProviders,
    targets: &[ScanTarget],
    block_list: &BlockList,
    options: ScanOptions,
    cancel: &CancelToken,
) -> ScanOutcome {
    let (progress, _hub) = ProgressHub::new();
    scan(
        registry, tree, libraries, providers, targets, block_list, options, cancel, &progress,
    )
    .await
}

#[tokio::test]
async fn should_merge_dlc_from_both_metadata_sources() {
    let (root, library, targets) = steam_world("scan-merge");
    let providers = providers(
        HashMap::from([
            ("10".to_string(), details("Base Game", &["1"])),
            ("1".to_string(), details("DLC One", &[])),
        ]),
        HashMap::from([
            (
                "10".to_string(),
                serde_json::json!({"extended": {"listofdlc": "2,3"}}),
            ),
            (
                "2".to_string(),
                serde_json::json!({"common": {"name": "DLC Two", "icon": "iconhash"}}),
            ),
        ]),
        HashMap::new(),
    );

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        &[library],
        &providers,
        &targets,
        &BlockList::default(),
        ScanOptions::default(),
        &CancelToken::new(),
    )
    .await;

    assert_eq!(outcome.programs_discovered, 1);
    assert_eq!(outcome.programs_merged, 1);
    assert_eq!(outcome.dlc_merged, 2);
    assert!(!outcome.canceled);

    let selection = registry.from_id("10").expect("merged program");
    assert_eq!(selection.name, "Base Game");
    assert!(selection.is_steam);
    assert!(!selection.enabled);
    assert!(selection.selected_dlc.is_empty());
    assert_eq!(
        selection.all_dlc.keys().cloned().collect::<Vec<_>>(),
        vec!["1".to_string(), "2".to_string()]
    );
    // Direct store result wins for "1"; "2" falls back to the cached
    // document; "3" resolves nowhere and is excluded.
    let direct = selection.all_dlc.get("1").expect("dlc one");
    assert_eq!(direct.name, "DLC One");
    assert_eq!(direct.icon_url.as_deref(), Some("https://img.example/DLC-One.jpg"));
    let cached = selection.all_dlc.get("2").expect("dlc two");
    assert_eq!(cached.name, "DLC Two");
    assert!(cached.icon_url.as_deref().expect("icon").contains("/2/iconhash.jpg"));

    assert_eq!(
        selection.product_url.as_deref(),
        Some("https://store.steampowered.com/app/10")
    );
    assert_eq!(selection.publisher.as_deref(), Some("Example Publishing"));

    let node = tree.find("10").expect("program node");
    assert_eq!(node.children.len(), 2);
    assert!(!node.checked);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn should_drop_a_program_without_dll_directories() {
    let root = create_temp_dir("scan-no-dll");
    let library = FakeLibrary {
        platform: Platform::Steam,
        records: vec![record(Platform::Steam, "10", "Base Game", &root)],
        dll_dirs: HashMap::new(),
    };
    let providers = providers(
        HashMap::from([("10".to_string(), details("Base Game", &["1"]))]),
        HashMap::new(),
        HashMap::new(),
    );

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        &[Arc::new(library)],
        &providers,
        &[target(Platform::Steam, "10", "Base Game")],
        &BlockList::default(),
        ScanOptions::default(),
        &CancelToken::new(),
    )
    .await;

    assert_eq!(outcome.programs_discovered, 1);
    assert_eq!(outcome.programs_merged, 0);
    assert_eq!(outcome.programs_dropped(), 1);
    assert!(registry.is_empty());
    assert!(tree.roots().is_empty());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn should_drop_a_program_whose_sources_list_no_dlc() {
    let (root, library, targets) = steam_world("scan-no-dlc");
    let providers = providers(
        HashMap::from([("10".to_string(), details("Base Game", &[]))]),
        HashMap::new(),
        HashMap::new(),
    );

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        &[library],
        &providers,
        &targets,
        &BlockList::default(),
        ScanOptions::default(),
        &CancelToken::new(),
    )
    .await;

    assert_eq!(outcome.programs_merged, 0);
    assert!(registry.is_empty());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn should_drop_a_program_when_both_metadata_sources_are_silent() {
    let (root, library, targets) = steam_world("scan-no-metadata");
    let providers = providers(HashMap::new(), HashMap::new(), HashMap::new());

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        &[library],
        &providers,
        &targets,
        &BlockList::default(),
        ScanOptions::default(),
        &CancelToken::new(),
    )
    .await;

    assert_eq!(outcome.programs_merged, 0);
    assert!(registry.is_empty());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn should_skip_programs_matching_the_block_list() {
    let (root, library, targets) = steam_world("scan-blocked");
    let providers = providers(
        HashMap::from([("10".to_string(), details("Base Game", &["1"]))]),
        HashMap::new(),
        HashMap::new(),
    );
    let block_list = BlockList {
        names: vec!["Base Game".to_string()],
        ..BlockList::default()
    };

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        &[library],
        &providers,
        &targets,
        &block_list,
        ScanOptions::default(),
        &CancelToken::new(),
    )
    .await;

    assert_eq!(outcome.programs_discovered, 0);
    assert!(registry.is_empty());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn should_preserve_user_choices_across_rescans() {
    let (root, library, targets) = steam_world("scan-rescan");
    let first_pass = providers(
        HashMap::from([
            ("10".to_string(), details("Base Game", &["1", "2"])),
            ("1".to_string(), details("DLC One", &[])),
            ("2".to_string(), details("DLC Two", &[])),
        ]),
        HashMap::new(),
        HashMap::new(),
    );

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    run_scan(
        &mut registry,
        &mut tree,
        std::slice::from_ref(&library),
        &first_pass,
        &targets,
        &BlockList::default(),
        ScanOptions::default(),
        &CancelToken::new(),
    )
    .await;

    registry.toggle_dlc("1", true);
    registry.toggle_dlc("2", true);
    registry.from_id_mut("10").expect("program").enabled = true;

    // "2" disappears from the catalog before the second pass.
    let second_pass = providers(
        HashMap::from([
            ("10".to_string(), details("Base Game", &["1"])),
            ("1".to_string(), details("DLC One", &[])),
        ]),
        HashMap::new(),
        HashMap::new(),
    );
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        &[library],
        &second_pass,
        &targets,
        &BlockList::default(),
        ScanOptions::default(),
        &CancelToken::new(),
    )
    .await;

    assert_eq!(outcome.programs_merged, 1);
    let selection = registry.from_id("10").expect("program");
    assert!(selection.enabled);
    assert!(selection.is_dlc_selected("1"));
    assert!(!selection.is_dlc_selected("2"));
    assert!(!selection.all_dlc.contains_key("2"));
    assert!(tree.find("1").expect("dlc node").checked);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn should_select_everything_new_when_requested() {
    let (root, library, targets) = steam_world("scan-select-all");
    let providers = providers(
        HashMap::from([
            ("10".to_string(), details("Base Game", &["1", "2"])),
            ("1".to_string(), details("DLC One", &[])),
            ("2".to_string(), details("DLC Two", &[])),
        ]),
        HashMap::new(),
        HashMap::new(),
    );

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    run_scan(
        &mut registry,
        &mut tree,
        &[library],
        &providers,
        &targets,
        &BlockList::default(),
        ScanOptions {
            select_all_new: true,
        },
        &CancelToken::new(),
    )
    .await;

    let selection = registry.from_id("10").expect("program");
    assert!(selection.enabled);
    assert_eq!(selection.selected_dlc.len(), 2);
    assert!(tree.all_checked());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn should_merge_the_launcher_without_a_dlc_phase() {
    let root = create_temp_dir("scan-paradox");
    let sdk_dir = root.join("sdk");
    fs::create_dir_all(&sdk_dir).expect("create sdk dir");
    fs::write(sdk_dir.join("steam_api64.dll"), b"dll").expect("write sdk dll");

    let library = FakeLibrary {
        platform: Platform::Paradox,
        records: vec![record(
            Platform::Paradox,
            "ParadoxLauncher",
            "Paradox Launcher",
            &root,
        )],
        dll_dirs: HashMap::new(),
    };
    let providers = providers(HashMap::new(), HashMap::new(), HashMap::new());

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        &[Arc::new(library)],
        &providers,
        &[target(Platform::Paradox, "ParadoxLauncher", "Paradox Launcher")],
        &BlockList::default(),
        ScanOptions::default(),
        &CancelToken::new(),
    )
    .await;

    assert_eq!(outcome.programs_merged, 1);
    assert_eq!(outcome.dlc_merged, 0);
    let selection = registry.from_id("ParadoxLauncher").expect("launcher");
    assert!(selection.is_steam);
    assert!(!selection.is_epic);
    assert!(selection.all_dlc.is_empty());
    assert!(!selection.enabled);
    assert_eq!(selection.dll_directories, vec![sdk_dir]);
    assert!(tree.find("ParadoxLauncher").expect("node").children.is_empty());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn should_merge_entitlements_for_an_epic_program() {
    let root = create_temp_dir("scan-epic");
    let bin = root.join("bin");
    fs::create_dir_all(&bin).expect("create bin dir");
    let library = FakeLibrary {
        platform: Platform::Epic,
        records: vec![record(Platform::Epic, "ns1", "Epic Game", &root)],
        dll_dirs: HashMap::from([(root.clone(), vec![bin])]),
    };
    let entitlements = vec![
        Entitlement {
            id: "e1".to_string(),
            name: "Epic Game".to_string(),
            product_slug: Some("epic-game".to_string()),
            icon_url: Some("https://img.example/epic.png".to_string()),
            developer: Some("Example Dev".to_string()),
        },
        Entitlement {
            id: "e2".to_string(),
            name: "Expansion".to_string(),
            product_slug: None,
            icon_url: None,
            developer: None,
        },
        Entitlement {
            id: "e3".to_string(),
            name: "  ".to_string(),
            product_slug: None,
            icon_url: None,
            developer: None,
        },
    ];
    let providers = providers(
        HashMap::new(),
        HashMap::new(),
        HashMap::from([("ns1".to_string(), entitlements)]),
    );

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        &[Arc::new(library)],
        &providers,
        &[target(Platform::Epic, "ns1", "Epic Game")],
        &BlockList::default(),
        ScanOptions::default(),
        &CancelToken::new(),
    )
    .await;

    assert_eq!(outcome.programs_merged, 1);
    let selection = registry.from_id("ns1").expect("program");
    assert!(selection.is_epic);
    assert_eq!(
        selection.all_dlc.keys().cloned().collect::<Vec<_>>(),
        vec!["e1".to_string(), "e2".to_string()]
    );
    assert_eq!(
        selection.all_dlc.get("e1").expect("entitlement").kind,
        DlcKind::EpicEntitlement
    );
    assert_eq!(
        selection.product_url.as_deref(),
        Some("https://www.epicgames.com/store/product/epic-game")
    );
    assert_eq!(selection.publisher.as_deref(), Some("Example Dev"));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn should_merge_nothing_after_cancellation() {
    let (root, library, targets) = steam_world("scan-cancel");
    let providers = providers(
        HashMap::from([("10".to_string(), details("Base Game", &["1"]))]),
        HashMap::new(),
        HashMap::new(),
    );
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        std::slice::from_ref(&library),
        &providers,
        &targets,
        &BlockList::default(),
        ScanOptions::default(),
        &cancel,
    )
    .await;

    assert!(outcome.canceled);
    assert_eq!(outcome.programs_discovered, 0);
    assert_eq!(outcome.programs_merged, 0);
    assert!(registry.is_empty());

    // A reset token lets the next scan run normally.
    cancel.reset();
    let outcome = run_scan(
        &mut registry,
        &mut tree,
        &[library],
        &providers,
        &targets,
        &BlockList::default(),
        ScanOptions::default(),
        &cancel,
    )
    .await;
    assert!(!outcome.canceled);
    assert_eq!(outcome.programs_discovered, 1);
    assert_eq!(outcome.programs_merged, 1);
    // The single listed DLC resolves nowhere, so the program merges bare.
    let selection = registry.from_id("10").expect("program");
    assert!(selection.all_dlc.is_empty());

    let _ = fs::remove_dir_all(root);
}
