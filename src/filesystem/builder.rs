use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::ext::PathExt;
use crate::filesystem::{FileEntry, FileTree, HiddenEntries};
use crate::tree::{NodeId, Tree};

/// Owns the cached tree and populates it from disk on demand.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Option<FileTree>,
    hidden: HiddenEntries,
}

impl TreeBuilder {
    pub fn new(hidden: HiddenEntries) -> Self {
        Self { tree: None, hidden }
    }

    pub fn tree(&self) -> Option<&FileTree> {
        self.tree.as_ref()
    }

    pub fn hidden(&self) -> HiddenEntries {
        self.hidden
    }

    /// Entry of a live node.
    pub fn entry(&self, id: NodeId) -> Option<&FileEntry> {
        self.tree.as_ref()?.value(id)
    }

    /// Builds a fresh tree rooted at `root_path` and fetches the root's
    /// immediate children.
    ///
    /// Leaves the tree unset and returns `None` if the path does not exist.
    pub fn load(&mut self, root_path: impl AsRef<Path>) -> Option<NodeId> {
        let root_path = root_path.as_ref();
        let canonical = match root_path.canonicalize() {
            Ok(path) => path,
            Err(err) => {
                debug!("Cannot load tree from {}: {err}", root_path.best_effort_display());
                return None;
            }
        };
        let root_entry = match FileEntry::from_path(canonical) {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Cannot stat tree root {}: {err}", root_path.best_effort_display());
                return None;
            }
        };

        info!("Loading tree at {}", root_entry.absolute_path().display());
        let tree = Tree::new(root_entry);
        let root = tree.root();
        self.tree = Some(tree);
        self.fetch_children(root);
        Some(root)
    }

    /// Like [`TreeBuilder::load`], then fetches every directory below the root.
    /// Symlinked directories are left unfetched.
    ///
    /// Only suitable for small subtrees; never used unless asked for.
    pub fn load_eager(&mut self, root_path: impl AsRef<Path>) -> Option<NodeId> {
        let root = self.load(root_path)?;
        let mut pending = vec![root];
        let mut directories = 0usize;

        while let Some(id) = pending.pop() {
            self.fetch_children(id);
            directories += 1;
            if let Some(tree) = &self.tree {
                pending.extend(
                    tree.children(id)
                        .iter()
                        .copied()
                        .filter(|&child| tree.value(child).is_some_and(FileEntry::is_traversable)),
                );
            }
        }

        info!("Preloaded {directories} directories");
        Some(root)
    }

    /// Materializes the direct children of a directory node.
    ///
    /// Does nothing if the node was already fetched or is a plain file. An
    /// unreadable directory ends up fetched with no children. Returns the
    /// number of inserted nodes.
    pub fn fetch_children(&mut self, id: NodeId) -> usize {
        let hidden = self.hidden;
        let Some(tree) = self.tree.as_mut() else {
            return 0;
        };
        let Some(entry) = tree.value(id) else {
            return 0;
        };
        if tree.is_fetched(id) || !entry.is_directory() {
            return 0;
        }

        let mut entries = list_directory(entry.absolute_path(), hidden);
        entries.sort_by(directories_first);
        let count = entries.len();
        for child in entries {
            tree.insert(id, child);
        }
        tree.mark_fetched(id);

        debug!("Fetched {count} children for {id}");
        count
    }

    /// Discards the cached children of `id` and fetches them again.
    pub fn invalidate(&mut self, id: NodeId) -> usize {
        let Some(tree) = self.tree.as_mut() else {
            return 0;
        };
        let released = tree.clear(id);
        debug!("Invalidated {id}, released {released} nodes");
        self.fetch_children(id)
    }
}

fn list_directory(path: &Path, hidden: HiddenEntries) -> Vec<FileEntry> {
    let reader = match fs::read_dir(path) {
        Ok(reader) => reader,
        Err(err) => {
            warn!("Failed to list {}: {err}", path.display());
            return Vec::new();
        }
    };

    reader
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry in {}: {err}", path.display());
                None
            }
        })
        .map(|entry| FileEntry::from_listing(entry.path()))
        .filter(|entry| hidden == HiddenEntries::Show || !entry.is_hidden())
        .collect()
}

fn directories_first(a: &FileEntry, b: &FileEntry) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| a.name().cmp(b.name()))
}
