use crate::core::models::AppInfoTree;
use crate::infrastructure::providers::CachedAppInfo;
use serde_json::Value;
use std::path::PathBuf;

const DEFAULT_BRANCH: &str = "public";

/// Reads app-info documents dumped as `<app_id>.json` by the companion
/// cache-building tool.
#[derive(Debug, Clone)]
pub struct AppInfoCacheClient {
    cache_dir: PathBuf,
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

impl AppInfoCacheClient {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn cached_build_id(tree: &AppInfoTree, branch: Option<&str>) -> Option<i64> {
        let branch = branch.unwrap_or(DEFAULT_BRANCH);
        tree.get(&format!("depots.branches.{branch}.buildid"))
            .and_then(value_to_i64)
    }
}

impl CachedAppInfo for AppInfoCacheClient {
    async fn query_app_info(
        &self,
        app_id: &str,
        branch: Option<&str>,
        build_id: Option<i64>,
    ) -> Option<AppInfoTree> {
        let path = self.cache_dir.join(format!("{app_id}.json"));
        let raw = tokio::fs::read_to_string(&path).await.ok()?;
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(
                    event = "appinfo_cache_unparseable",
                    app_id,
                    path = %path.display(),
                    error = error.to_string()
                );
                return None;
            }
        };
        let tree = AppInfoTree::new(value);

        // A document behind the installed build is treated as absent.
        if let Some(installed) = build_id
            && let Some(cached) = Self::cached_build_id(&tree, branch)
            && cached < installed
        {
            tracing::debug!(
                event = "appinfo_cache_stale",
                app_id,
                cached_build_id = cached,
                installed_build_id = installed
            );
            return None;
        }
        Some(tree)
    }
}

#[cfg(test)]
#[path = "../../tests/infrastructure/appinfo_cache_tests.rs"]
mod tests;
