use dlcdeck::app::registry_service::SelectionRegistry;
use dlcdeck::app::scan_service::{self, MetadataProviders, ProgressHub, ScanOptions};
use dlcdeck::app::tree_service::SelectionTree;
use dlcdeck::app::{choices_service, scan_service::ScanOutcome};
use dlcdeck::bootstrap;
use dlcdeck::core::models::ScanTarget;
use dlcdeck::core::{AppResult, CancelToken};
use dlcdeck::infrastructure::appinfo_cache::AppInfoCacheClient;
use dlcdeck::infrastructure::providers::{EpicLibrary, GameLibrary, ParadoxLibrary, SteamLibrary};
use dlcdeck::infrastructure::store_api::{EpicCatalogClient, SteamStoreClient};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "dlcdeck.json";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("dlcdeck: {error}");
        std::process::exit(1);
    }
}

fn every_installed(libraries: &[Arc<dyn GameLibrary>]) -> Vec<ScanTarget> {
    let mut targets = Vec::new();
    for library in libraries {
        if !library.is_available() {
            continue;
        }
        for record in library.list_installed() {
            targets.push(ScanTarget {
                platform: record.platform,
                id: record.id,
                name: record.name,
            });
        }
    }
    targets
}

fn print_summary(registry: &SelectionRegistry, outcome: &ScanOutcome) {
    println!(
        "programs: {} discovered, {} merged, {} dropped; dlc merged: {}{}",
        outcome.programs_discovered,
        outcome.programs_merged,
        outcome.programs_dropped(),
        outcome.dlc_merged,
        if outcome.canceled { " (canceled)" } else { "" }
    );
    for selection in registry.all() {
        println!(
            "{} {} ({}/{} DLC selected)",
            if selection.enabled { "[x]" } else { "[ ]" },
            selection.name,
            selection.selected_dlc.len(),
            selection.all_dlc.len() + selection.extra_dlc.len()
        );
    }
}

async fn run() -> AppResult<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let context = bootstrap::setup(&config_path)?;
    let config = context.config;

    let mut libraries: Vec<Arc<dyn GameLibrary>> = vec![Arc::new(SteamLibrary::new(
        config.steam_library_dirs.clone(),
    ))];
    if let Some(dir) = &config.epic_manifests_dir {
        libraries.push(Arc::new(EpicLibrary::new(dir.clone())));
    }
    if let Some(dir) = &config.paradox_install_dir {
        libraries.push(Arc::new(ParadoxLibrary::new(dir.clone())));
    }

    let providers = MetadataProviders {
        catalog: Arc::new(SteamStoreClient::new(config.store_api_base_url.clone())?),
        app_info: Arc::new(AppInfoCacheClient::new(config.appinfo_cache_dir())),
        entitlements: Arc::new(EpicCatalogClient::new(config.epic_catalog_url.clone())?),
    };

    let targets = if config.targets.is_empty() {
        every_installed(&libraries)
    } else {
        config.targets.clone()
    };
    tracing::info!(event = "scan_targets_resolved", count = targets.len());

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!(event = "cancel_requested");
                cancel.cancel();
            }
        });
    }

    let (progress, hub) = ProgressHub::new();
    let mut snapshots = hub.subscribe();
    let hub_task = tokio::spawn(hub.run());
    let monitor = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            tracing::info!(
                event = "scan_progress",
                percent = snapshot.percent,
                phase = snapshot.phase.label(),
                remaining_programs = snapshot.remaining_programs.len(),
                remaining_dlc = snapshot.remaining_dlc.len()
            );
        }
    });

    let mut registry = SelectionRegistry::new();
    let mut tree = SelectionTree::new();
    let outcome = scan_service::scan(
        &mut registry,
        &mut tree,
        &libraries,
        &providers,
        &targets,
        &config.block_list,
        ScanOptions {
            select_all_new: config.select_all_new,
        },
        &cancel,
        &progress,
    )
    .await;
    drop(progress);
    let _ = hub_task.await;
    let _ = monitor.await;

    let choices_path = config.choices_path();
    let saved = choices_service::load_choices(&choices_path)?;
    choices_service::apply_selected_hints(&mut registry, &saved);
    for selection in registry.all() {
        tree.upsert_program(selection);
    }
    choices_service::save_choices(&choices_path, &choices_service::collect_selected(&registry))?;

    print_summary(&registry, &outcome);
    Ok(())
}
