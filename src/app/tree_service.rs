use crate::app::registry_service::{ProgramSelection, SelectionRegistry};

/// One checkable node: a program at the root level, a DLC underneath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub label: String,
    pub checked: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(id: impl Into<String>, label: impl Into<String>, checked: bool) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            checked,
            children: Vec::new(),
        }
    }
}

/// Checkable program/DLC tree kept in lockstep with the selection
/// registry. Propagation is an explicit two-pass transform over owned data:
/// programmatic writes cannot re-enter the toggle path, so there is no event
/// suppression to get wrong.
#[derive(Debug, Default)]
pub struct SelectionTree {
    roots: Vec<TreeNode>,
}

/// Registry write for one node: program lookup first, DLC lookup only when
/// no program carries the id.
fn sync_registry(registry: &mut SelectionRegistry, id: &str, checked: bool) {
    if let Some(selection) = registry.from_id_mut(id) {
        selection.enabled = checked;
        return;
    }
    registry.toggle_dlc(id, checked);
}

fn set_subtree(node: &mut TreeNode, checked: bool, registry: &mut SelectionRegistry) {
    node.checked = checked;
    sync_registry(registry, &node.id, checked);
    for child in &mut node.children {
        set_subtree(child, checked, registry);
    }
}

impl SelectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        fn walk<'a>(nodes: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
            for node in nodes {
                if node.id == id {
                    return Some(node);
                }
                if let Some(found) = walk(&node.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.roots, id)
    }

    fn path_to(&self, id: &str) -> Option<Vec<usize>> {
        fn walk(nodes: &[TreeNode], id: &str, path: &mut Vec<usize>) -> bool {
            for (index, node) in nodes.iter().enumerate() {
                path.push(index);
                if node.id == id || walk(&node.children, id, path) {
                    return true;
                }
                path.pop();
            }
            false
        }
        let mut path = Vec::new();
        walk(&self.roots, id, &mut path).then_some(path)
    }

    fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut TreeNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.roots.get_mut(first)?;
        for &index in rest {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }

    /// Rebuilds the node for one program from its registry state: program
    /// checked iff enabled, DLC checked iff in `selected_dlc`. Children
    /// are ordered by id; discovered and extra DLC both appear.
    pub fn upsert_program(&mut self, selection: &ProgramSelection) {
        let mut node = TreeNode::new(&selection.id, &selection.name, selection.enabled);
        for entry in selection
            .all_dlc
            .values()
            .chain(selection.extra_dlc.values())
        {
            node.children.push(TreeNode::new(
                &entry.id,
                &entry.name,
                selection.is_dlc_selected(&entry.id),
            ));
        }
        match self.roots.iter_mut().find(|root| root.id == selection.id) {
            Some(existing) => *existing = node,
            None => self.roots.push(node),
        }
    }

    pub fn remove_program(&mut self, id: &str) {
        self.roots.retain(|root| root.id != id);
    }

    /// User toggle of node `id` to `checked`. Applies the registry write for
    /// the node, forces every descendant to the new state (with registry
    /// writes), then recomputes each ancestor as the OR of its direct
    /// children (with registry writes). Returns false for an unknown id.
    pub fn toggle(&mut self, registry: &mut SelectionRegistry, id: &str, checked: bool) -> bool {
        let Some(path) = self.path_to(id) else {
            return false;
        };

        if let Some(node) = self.node_at_mut(&path) {
            set_subtree(node, checked, registry);
        }

        // Upward pass, deepest ancestor first.
        for depth in (1..path.len()).rev() {
            if let Some(ancestor) = self.node_at_mut(&path[..depth]) {
                let any_child = ancestor.children.iter().any(|child| child.checked);
                ancestor.checked = any_child;
                let ancestor_id = ancestor.id.clone();
                sync_registry(registry, &ancestor_id, any_child);
            }
        }
        true
    }

    /// Sets every top-level node (and therefore every node) to `checked`.
    pub fn set_all(&mut self, registry: &mut SelectionRegistry, checked: bool) {
        let root_ids: Vec<String> = self.roots.iter().map(|root| root.id.clone()).collect();
        for id in root_ids {
            self.toggle(registry, &id, checked);
        }
    }

    /// Global indicator: AND over all top-level nodes. True for an empty
    /// tree, matching the convention that an empty conjunction holds.
    pub fn all_checked(&self) -> bool {
        self.roots.iter().all(|root| root.checked)
    }
}

#[cfg(test)]
#[path = "../../tests/app/tree_service_tests.rs"]
mod tests;
