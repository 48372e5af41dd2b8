use crate::core::models::{AppInfoTree, Platform, ProgramRecord};
use crate::infrastructure::store_api::{Entitlement, StoreAppDetails};
use std::future::Future;
use std::path::{Path, PathBuf};

pub mod epic;
pub mod paradox;
pub mod steam;

pub use epic::EpicLibrary;
pub use paradox::{PARADOX_LAUNCHER_ID, PARADOX_LAUNCHER_NAME, ParadoxLibrary};
pub use steam::SteamLibrary;

/// Installed-program source for one storefront. Enumeration and the SDK DLL
/// probe are local filesystem reads, so the seam stays synchronous and
/// object-safe.
pub trait GameLibrary: Send + Sync {
    fn platform(&self) -> Platform;

    fn is_available(&self) -> bool;

    fn list_installed(&self) -> Vec<ProgramRecord>;

    /// Directories under the install root carrying the storefront SDK DLLs,
    /// or `None` when the probe finds nothing.
    fn resolve_dll_directories(&self, directory: &Path) -> Option<Vec<PathBuf>>;
}

/// Direct storefront catalog queries. `None` covers every failure mode:
/// unknown app, malformed response, network trouble.
pub trait StoreCatalog: Send + Sync + 'static {
    fn query_app(
        &self,
        app_id: &str,
        is_dlc: bool,
    ) -> impl Future<Output = Option<StoreAppDetails>> + Send;
}

/// Locally cached app-info documents built by the companion dump tool. A
/// document older than the installed build counts as absent.
pub trait CachedAppInfo: Send + Sync + 'static {
    fn query_app_info(
        &self,
        app_id: &str,
        branch: Option<&str>,
        build_id: Option<i64>,
    ) -> impl Future<Output = Option<AppInfoTree>> + Send;
}

/// Entitlement listing for one catalog namespace. Failures surface as an
/// empty list.
pub trait EntitlementCatalog: Send + Sync + 'static {
    fn query_entitlements(&self, namespace: &str) -> impl Future<Output = Vec<Entitlement>> + Send;
}

/// Walks `root` and collects every directory holding at least one of the
/// given DLL file names.
pub(crate) fn find_dirs_with_dlls(root: &Path, dll_names: &[&str]) -> Option<Vec<PathBuf>> {
    let mut directories: Vec<PathBuf> = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if !dll_names
            .iter()
            .any(|dll| dll.eq_ignore_ascii_case(file_name))
        {
            continue;
        }
        if let Some(parent) = entry.path().parent()
            && !directories.iter().any(|known| known == parent)
        {
            directories.push(parent.to_path_buf());
        }
    }
    (!directories.is_empty()).then_some(directories)
}

#[cfg(test)]
#[path = "../../../tests/infrastructure/providers_tests.rs"]
mod tests;
