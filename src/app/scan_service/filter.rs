use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Read-only block rules consulted while admitting enumerated programs:
/// blocked display names, blocked directory prefixes, and directory-prefix
/// exceptions that re-admit a sub-path otherwise excluded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockList {
    pub names: Vec<String>,
    pub directory_prefixes: Vec<PathBuf>,
    pub directory_exceptions: Vec<PathBuf>,
}

fn prefix_depth(prefixes: &[PathBuf], directory: &Path) -> Option<usize> {
    prefixes
        .iter()
        .filter(|prefix| directory.starts_with(prefix))
        .map(|prefix| prefix.components().count())
        .max()
}

impl BlockList {
    /// Longest-prefix semantics: a directory is blocked when its longest
    /// matching blocked prefix is deeper than its longest matching exception
    /// prefix, so an exception under a blocked path re-admits that sub-path
    /// and its descendants.
    pub fn is_blocked(&self, name: &str, directory: &Path) -> bool {
        if self
            .names
            .iter()
            .any(|blocked| blocked.eq_ignore_ascii_case(name))
        {
            return true;
        }
        let Some(blocked_depth) = prefix_depth(&self.directory_prefixes, directory) else {
            return false;
        };
        match prefix_depth(&self.directory_exceptions, directory) {
            Some(exception_depth) => blocked_depth > exception_depth,
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/app/scan_service/filter_tests.rs"]
mod tests;
