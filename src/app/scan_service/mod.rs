use crate::app::registry_service::{ProgramSelection, SelectionRegistry};
use crate::app::tree_service::SelectionTree;
use crate::core::CancelToken;
use crate::core::models::{
    AppInfoTree, AppMetadata, DlcEntry, DlcKind, Platform, ProgramRecord, ScanTarget,
};
use crate::infrastructure::store_api::StoreAppDetails;
use crate::infrastructure::providers::{
    CachedAppInfo, EntitlementCatalog, GameLibrary, StoreCatalog, epic, steam,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub mod filter;
pub mod progress;

pub use filter::BlockList;
pub use progress::{ProgressHub, ProgressSink, ProgressSnapshot, ScanPhase, UnitKind};

/// Pause between dispatching DLC sub-tasks. A scheduling courtesy to keep
/// the host responsive; the queries themselves still run concurrently.
const DLC_DISPATCH_DELAY: Duration = Duration::from_millis(10);

const STEAM_STORE_APP_URL: &str = "https://store.steampowered.com/app";
const STEAM_APP_IMAGES_URL: &str =
    "https://cdn.cloudflare.steamstatic.com/steamcommunity/public/images/apps";
const EPIC_PRODUCT_URL: &str = "https://www.epicgames.com/store/product";

fn steam_app_image_url(app_id: &str, image_id: &str, ext: &str) -> String {
    format!("{STEAM_APP_IMAGES_URL}/{app_id}/{image_id}.{ext}")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// When active, newly merged programs and all their DLC start selected.
    pub select_all_new: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub programs_discovered: usize,
    pub programs_merged: usize,
    pub dlc_merged: usize,
    pub canceled: bool,
}

impl ScanOutcome {
    pub fn programs_dropped(&self) -> usize {
        self.programs_discovered.saturating_sub(self.programs_merged)
    }
}

/// The async metadata seams the orchestrator fans out to.
pub struct MetadataProviders<C, A, E> {
    pub catalog: Arc<C>,
    pub app_info: Arc<A>,
    pub entitlements: Arc<E>,
}

/// One program's fully resolved scan result, produced by a worker task and
/// consumed by the single-writer merge step.
#[derive(Debug)]
struct ProgramScanResult {
    platform: Platform,
    id: String,
    name: String,
    directory: PathBuf,
    dll_directories: Vec<PathBuf>,
    is_steam: bool,
    is_epic: bool,
    dlc: Vec<DlcEntry>,
    product_url: Option<String>,
    icon_url: Option<String>,
    sub_icon_url: Option<String>,
    publisher: Option<String>,
}

/// Runs the end-to-end discovery pipeline. The registry (mirrored into the
/// tree) is the only durable output; safe to invoke repeatedly. Discovery
/// and metadata queries run in parallel, but the registry and tree are
/// mutated exclusively by the merge drain at the bottom of this function.
#[allow(clippy::too_many_arguments)]
pub async fn scan<C, A, E>(
    registry: &mut SelectionRegistry,
    tree: &mut SelectionTree,
    libraries: &[Arc<dyn GameLibrary>],
    providers: &MetadataProviders<C, A, E>,
    targets: &[ScanTarget],
    block_list: &BlockList,
    options: ScanOptions,
    cancel: &CancelToken,
    progress: &ProgressSink,
) -> ScanOutcome
where
    C: StoreCatalog,
    A: CachedAppInfo,
    E: EntitlementCatalog,
{
    let mut outcome = ScanOutcome::default();
    progress.phase(ScanPhase::Preparing);
    registry.validate_all(targets);
    tree.clear();
    progress.phase(ScanPhase::Gathering);

    let (results_tx, mut results_rx) = mpsc::unbounded_channel::<ProgramScanResult>();
    let mut handles: Vec<JoinHandle<()>> = Vec::new();

    for library in libraries {
        if cancel.is_canceled() {
            break;
        }
        if !library.is_available() {
            continue;
        }
        let platform = library.platform();
        if !targets.iter().any(|target| target.platform == platform) {
            continue;
        }
        match platform {
            Platform::Paradox => {
                scan_paradox(library, targets, cancel, progress, &results_tx, &mut outcome);
            }
            Platform::Steam => {
                spawn_steam_tasks(
                    library, providers, targets, block_list, cancel, progress, &results_tx,
                    &mut handles, &mut outcome,
                );
            }
            Platform::Epic => {
                spawn_epic_tasks(
                    library, providers, targets, block_list, cancel, progress, &results_tx,
                    &mut handles, &mut outcome,
                );
            }
        }
    }
    drop(results_tx);

    while let Some(result) = results_rx.recv().await {
        if cancel.is_canceled() {
            break;
        }
        apply_scan_result(registry, tree, result, options, &mut outcome);
    }
    for handle in handles {
        if let Err(error) = handle.await
            && !error.is_cancelled()
        {
            tracing::warn!(event = "program_task_join_failed", error = error.to_string());
        }
    }

    outcome.canceled = cancel.is_canceled();
    progress.phase(ScanPhase::Done);
    tracing::info!(
        event = "scan_finished",
        programs_discovered = outcome.programs_discovered,
        programs_merged = outcome.programs_merged,
        programs_dropped = outcome.programs_dropped(),
        dlc_merged = outcome.dlc_merged,
        canceled = outcome.canceled
    );
    outcome
}

/// The launcher has no DLC phase: it is admitted whenever either storefront
/// SDK probe finds DLL directories under its install path.
fn scan_paradox(
    library: &Arc<dyn GameLibrary>,
    targets: &[ScanTarget],
    cancel: &CancelToken,
    progress: &ProgressSink,
    results: &mpsc::UnboundedSender<ProgramScanResult>,
    outcome: &mut ScanOutcome,
) {
    for record in library.list_installed() {
        if cancel.is_canceled() {
            return;
        }
        if !targets.iter().any(|target| target.id == record.id) {
            continue;
        }
        outcome.programs_discovered += 1;
        progress.discovered(UnitKind::Program, record.name.clone());
        let steam_dirs = steam::find_dll_directories(&record.directory);
        let epic_dirs = epic::find_dll_directories(&record.directory);
        let is_steam = steam_dirs.is_some();
        let is_epic = epic_dirs.is_some();
        let mut dll_directories = steam_dirs.unwrap_or_default();
        for dir in epic_dirs.unwrap_or_default() {
            if !dll_directories.contains(&dir) {
                dll_directories.push(dir);
            }
        }
        match (!dll_directories.is_empty()).then_some(dll_directories) {
            Some(dll_directories) => {
                let _ = results.send(ProgramScanResult {
                    platform: Platform::Paradox,
                    id: record.id.clone(),
                    name: record.name.clone(),
                    directory: record.directory.clone(),
                    dll_directories,
                    is_steam,
                    is_epic,
                    dlc: Vec::new(),
                    product_url: None,
                    icon_url: None,
                    sub_icon_url: None,
                    publisher: None,
                });
            }
            None => {
                tracing::debug!(
                    event = "program_dropped_no_dll_directories",
                    id = record.id.as_str(),
                    name = record.name.as_str()
                );
            }
        }
        progress.completed(UnitKind::Program, record.name);
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_steam_tasks<C, A, E>(
    library: &Arc<dyn GameLibrary>,
    providers: &MetadataProviders<C, A, E>,
    targets: &[ScanTarget],
    block_list: &BlockList,
    cancel: &CancelToken,
    progress: &ProgressSink,
    results: &mpsc::UnboundedSender<ProgramScanResult>,
    handles: &mut Vec<JoinHandle<()>>,
    outcome: &mut ScanOutcome,
) where
    C: StoreCatalog,
    A: CachedAppInfo,
    E: EntitlementCatalog,
{
    for record in library.list_installed() {
        if cancel.is_canceled() {
            return;
        }
        if block_list.is_blocked(&record.name, &record.directory)
            || !targets.iter().any(|target| target.id == record.id)
        {
            continue;
        }
        outcome.programs_discovered += 1;
        progress.discovered(UnitKind::Program, record.name.clone());
        handles.push(tokio::spawn(scan_steam_program(
            record,
            Arc::clone(library),
            Arc::clone(&providers.catalog),
            Arc::clone(&providers.app_info),
            cancel.clone(),
            progress.clone(),
            results.clone(),
        )));
    }
}

async fn scan_steam_program<C, A>(
    record: ProgramRecord,
    library: Arc<dyn GameLibrary>,
    catalog: Arc<C>,
    app_info: Arc<A>,
    cancel: CancelToken,
    progress: ProgressSink,
    results: mpsc::UnboundedSender<ProgramScanResult>,
) where
    C: StoreCatalog,
    A: CachedAppInfo,
{
    if cancel.is_canceled() {
        return;
    }
    let Some(dll_directories) = library.resolve_dll_directories(&record.directory) else {
        tracing::debug!(
            event = "program_dropped_no_dll_directories",
            id = record.id.as_str(),
            name = record.name.as_str()
        );
        progress.completed(UnitKind::Program, record.name);
        return;
    };

    let (details, info) = tokio::join!(
        catalog.query_app(&record.id, false),
        app_info.query_app_info(&record.id, record.branch.as_deref(), record.build_id),
    );
    if details.is_none() && info.is_none() {
        tracing::debug!(
            event = "program_dropped_no_metadata",
            id = record.id.as_str(),
            name = record.name.as_str()
        );
        progress.completed(UnitKind::Program, record.name);
        return;
    }
    if cancel.is_canceled() {
        return;
    }

    // Ordered union of both sources' DLC id lists.
    let mut dlc_ids: Vec<String> = Vec::new();
    if let Some(details) = &details {
        for id in &details.dlc_ids {
            if !dlc_ids.contains(id) {
                dlc_ids.push(id.clone());
            }
        }
    }
    if let Some(info) = &info {
        for id in info.dlc_app_ids() {
            if !dlc_ids.contains(&id) {
                dlc_ids.push(id);
            }
        }
    }
    if dlc_ids.is_empty() {
        tracing::debug!(
            event = "program_dropped_no_dlc",
            id = record.id.as_str(),
            name = record.name.as_str()
        );
        progress.completed(UnitKind::Program, record.name);
        return;
    }

    let mut dlc_handles = Vec::new();
    for dlc_id in dlc_ids {
        if cancel.is_canceled() {
            return;
        }
        progress.discovered(UnitKind::Dlc, dlc_id.clone());
        dlc_handles.push(tokio::spawn(resolve_steam_dlc(
            dlc_id,
            Arc::clone(&catalog),
            Arc::clone(&app_info),
            cancel.clone(),
            progress.clone(),
        )));
        tokio::time::sleep(DLC_DISPATCH_DELAY).await;
    }

    // Join barrier: every DLC sub-task finishes before this program merges.
    let mut dlc = Vec::new();
    for handle in dlc_handles {
        match handle.await {
            Ok(Some(entry)) => dlc.push(entry),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(event = "dlc_task_join_failed", error = error.to_string());
            }
        }
    }
    if cancel.is_canceled() {
        return;
    }

    let metadata = steam_app_metadata(&record.id, details.as_ref(), info.as_ref());
    let _ = results.send(ProgramScanResult {
        platform: Platform::Steam,
        id: record.id.clone(),
        name: metadata.name.unwrap_or_else(|| record.name.clone()),
        directory: record.directory.clone(),
        dll_directories,
        is_steam: true,
        is_epic: false,
        dlc,
        product_url: Some(format!("{STEAM_STORE_APP_URL}/{}", record.id)),
        icon_url: metadata.header_icon,
        sub_icon_url: metadata.client_icon,
        publisher: metadata.publisher,
    });
    progress.completed(UnitKind::Program, record.name);
}

/// Folds both metadata sources into the program's presentation fields. The
/// store result wins wherever both answer; the cached app-info document
/// backfills the rest.
fn steam_app_metadata(
    app_id: &str,
    details: Option<&StoreAppDetails>,
    info: Option<&AppInfoTree>,
) -> AppMetadata {
    AppMetadata {
        name: details
            .map(|details| details.name.clone())
            .filter(|name| !name.trim().is_empty()),
        header_icon: info
            .and_then(|info| info.get_str("common.icon"))
            .map(|icon| steam_app_image_url(app_id, icon, "jpg")),
        client_icon: details
            .and_then(|details| details.header_image.clone())
            .or_else(|| {
                info.and_then(|info| info.get_str("common.clienticon"))
                    .map(|icon| steam_app_image_url(app_id, icon, "ico"))
            }),
        publisher: details
            .and_then(|details| details.publishers.first().cloned())
            .or_else(|| {
                info.and_then(|info| info.get_str("extended.publisher"))
                    .map(str::to_string)
            }),
    }
}

/// Resolves one DLC's display name and icon: direct store result preferred,
/// cached app-info fallback, otherwise the DLC is excluded (a name is the
/// minimum viable record).
async fn resolve_steam_dlc<C, A>(
    dlc_id: String,
    catalog: Arc<C>,
    app_info: Arc<A>,
    cancel: CancelToken,
    progress: ProgressSink,
) -> Option<DlcEntry>
where
    C: StoreCatalog,
    A: CachedAppInfo,
{
    if cancel.is_canceled() {
        return None;
    }
    let mut name = None;
    let mut icon_url = None;
    if let Some(details) = catalog.query_app(&dlc_id, true).await {
        name = Some(details.name);
        icon_url = details.header_image;
    } else if let Some(info) = app_info.query_app_info(&dlc_id, None, None).await {
        name = info.get_str("common.name").map(str::to_string);
        icon_url = info
            .get_str("common.icon")
            .or_else(|| info.get_str("common.logo_small"))
            .or_else(|| info.get_str("common.logo"))
            .map(|icon| steam_app_image_url(&dlc_id, icon, "jpg"));
    }
    if cancel.is_canceled() {
        return None;
    }
    let entry = match name.filter(|name| !name.trim().is_empty()) {
        Some(name) => Some(DlcEntry {
            id: dlc_id.clone(),
            kind: DlcKind::Steam,
            name,
            icon_url,
        }),
        None => {
            tracing::debug!(event = "dlc_dropped_no_name", dlc_id = dlc_id.as_str());
            None
        }
    };
    progress.completed(UnitKind::Dlc, dlc_id);
    entry
}

#[allow(clippy::too_many_arguments)]
fn spawn_epic_tasks<C, A, E>(
    library: &Arc<dyn GameLibrary>,
    providers: &MetadataProviders<C, A, E>,
    targets: &[ScanTarget],
    block_list: &BlockList,
    cancel: &CancelToken,
    progress: &ProgressSink,
    results: &mpsc::UnboundedSender<ProgramScanResult>,
    handles: &mut Vec<JoinHandle<()>>,
    outcome: &mut ScanOutcome,
) where
    C: StoreCatalog,
    A: CachedAppInfo,
    E: EntitlementCatalog,
{
    for record in library.list_installed() {
        if cancel.is_canceled() {
            return;
        }
        if block_list.is_blocked(&record.name, &record.directory)
            || !targets.iter().any(|target| target.id == record.id)
        {
            continue;
        }
        outcome.programs_discovered += 1;
        progress.discovered(UnitKind::Program, record.name.clone());
        handles.push(tokio::spawn(scan_epic_program(
            record,
            Arc::clone(library),
            Arc::clone(&providers.entitlements),
            cancel.clone(),
            progress.clone(),
            results.clone(),
        )));
    }
}

async fn scan_epic_program<E>(
    record: ProgramRecord,
    library: Arc<dyn GameLibrary>,
    entitlements_catalog: Arc<E>,
    cancel: CancelToken,
    progress: ProgressSink,
    results: mpsc::UnboundedSender<ProgramScanResult>,
) where
    E: EntitlementCatalog,
{
    if cancel.is_canceled() {
        return;
    }
    let Some(dll_directories) = library.resolve_dll_directories(&record.directory) else {
        tracing::debug!(
            event = "program_dropped_no_dll_directories",
            id = record.id.as_str(),
            name = record.name.as_str()
        );
        progress.completed(UnitKind::Program, record.name);
        return;
    };

    let entitlements = entitlements_catalog.query_entitlements(&record.id).await;
    if entitlements.is_empty() {
        tracing::debug!(
            event = "program_dropped_no_entitlements",
            id = record.id.as_str(),
            name = record.name.as_str()
        );
        progress.completed(UnitKind::Program, record.name);
        return;
    }
    if cancel.is_canceled() {
        return;
    }

    let mut dlc_handles = Vec::new();
    for entitlement in entitlements.iter().cloned() {
        if cancel.is_canceled() {
            return;
        }
        progress.discovered(UnitKind::Dlc, entitlement.id.clone());
        let cancel = cancel.clone();
        let progress = progress.clone();
        dlc_handles.push(tokio::spawn(async move {
            if cancel.is_canceled() {
                return None;
            }
            let entry = if entitlement.name.trim().is_empty() {
                tracing::debug!(
                    event = "dlc_dropped_no_name",
                    dlc_id = entitlement.id.as_str()
                );
                None
            } else {
                Some(DlcEntry {
                    id: entitlement.id.clone(),
                    kind: DlcKind::EpicEntitlement,
                    name: entitlement.name.clone(),
                    icon_url: entitlement.icon_url.clone(),
                })
            };
            progress.completed(UnitKind::Dlc, entitlement.id);
            entry
        }));
        tokio::time::sleep(DLC_DISPATCH_DELAY).await;
    }

    let mut dlc = Vec::new();
    for handle in dlc_handles {
        match handle.await {
            Ok(Some(entry)) => dlc.push(entry),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(event = "dlc_task_join_failed", error = error.to_string());
            }
        }
    }
    if cancel.is_canceled() {
        return;
    }

    // Product page, icon and publisher come from the entitlement that
    // carries the program's own name, when there is one.
    let mut product_url = None;
    let mut icon_url = None;
    let mut publisher = None;
    for entitlement in &entitlements {
        if entitlement.name == record.name {
            product_url = entitlement
                .product_slug
                .as_ref()
                .map(|slug| format!("{EPIC_PRODUCT_URL}/{slug}"));
            icon_url = entitlement.icon_url.clone();
            publisher = entitlement.developer.clone();
        }
    }

    let _ = results.send(ProgramScanResult {
        platform: Platform::Epic,
        id: record.id.clone(),
        name: record.name.clone(),
        directory: record.directory.clone(),
        dll_directories,
        is_steam: false,
        is_epic: true,
        dlc,
        product_url,
        icon_url,
        sub_icon_url: None,
        publisher,
    });
    progress.completed(UnitKind::Program, record.name);
}

/// The single writer of registry and tree. Preserves the surviving
/// selection's user choices: `selected_dlc` keeps every id still present in
/// the new `all_dlc` or `extra_dlc` and drops the rest.
fn apply_scan_result(
    registry: &mut SelectionRegistry,
    tree: &mut SelectionTree,
    result: ProgramScanResult,
    options: ScanOptions,
    outcome: &mut ScanOutcome,
) {
    let prior = registry.take(&result.id);
    let prior_enabled = prior.as_ref().is_some_and(|selection| selection.enabled);
    let mut selection = prior.unwrap_or_else(|| ProgramSelection::new(&result.id));

    selection.name = result.name;
    selection.root_directory = result.directory;
    selection.dll_directories = result.dll_directories;
    selection.is_steam = result.is_steam;
    selection.is_epic = result.is_epic;
    selection.product_url = result.product_url;
    selection.icon_url = result.icon_url;
    selection.sub_icon_url = result.sub_icon_url;
    selection.publisher = result.publisher;
    selection.all_dlc = result
        .dlc
        .into_iter()
        .map(|entry| (entry.id.clone(), entry))
        .collect();

    if options.select_all_new {
        let entries: Vec<DlcEntry> = selection.all_dlc.values().cloned().collect();
        for entry in entries {
            selection.selected_dlc.insert(entry.id.clone(), entry);
        }
    }
    let ProgramSelection {
        all_dlc,
        extra_dlc,
        selected_dlc,
        ..
    } = &mut selection;
    selected_dlc.retain(|id, _| all_dlc.contains_key(id) || extra_dlc.contains_key(id));

    selection.enabled = options.select_all_new
        || prior_enabled
        || !selection.selected_dlc.is_empty()
        || !selection.extra_dlc.is_empty();

    outcome.programs_merged += 1;
    outcome.dlc_merged += selection.all_dlc.len();
    tracing::debug!(
        event = "program_merged",
        id = selection.id.as_str(),
        platform = result.platform.as_str(),
        dlc_count = selection.all_dlc.len(),
        enabled = selection.enabled
    );

    let id = selection.id.clone();
    registry.upsert(selection);
    if let Some(selection) = registry.from_id(&id) {
        tree.upsert_program(selection);
    }
}

#[cfg(test)]
#[path = "../../../tests/app/scan_service/orchestrator_tests.rs"]
mod tests;
