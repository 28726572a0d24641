use std::collections::HashMap;

use crate::filesystem::{FileEntry, TreeBuilder};
use crate::tree::NodeId;

/// Filter used by [`TreeBuilder::find`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryKind {
    #[default]
    Any,
    Directory,
    File,
}

impl EntryKind {
    fn matches(self, entry: &FileEntry) -> bool {
        match self {
            EntryKind::Any => true,
            EntryKind::Directory => entry.is_directory(),
            EntryKind::File => !entry.is_directory(),
        }
    }
}

/// Aggregate figures for a subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    pub total_size: u64,
    pub file_count: usize,
    pub dir_count: usize,
    pub extensions: HashMap<String, usize>,
}

impl Analysis {
    fn add_file(&mut self, entry: &FileEntry) {
        self.file_count += 1;
        self.total_size += entry.size();
        if let Some(extension) = entry.extension() {
            *self.extensions.entry(extension).or_default() += 1;
        }
    }

    /// The `limit` most common extensions, ties broken by name.
    pub fn top_extensions(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut counts: Vec<_> = self
            .extensions
            .iter()
            .map(|(extension, &count)| (extension.as_str(), count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts.truncate(limit);
        counts
    }
}

impl TreeBuilder {
    /// Every node below `start` whose name contains `pattern`, in pre-order.
    ///
    /// Walks with an explicit stack and fetches unvisited directories on the way.
    pub fn find(&mut self, start: NodeId, pattern: &str, kind: EntryKind) -> Vec<NodeId> {
        let mut matches = Vec::new();
        self.visit_subtree(start, |id, entry| {
            if id != start && entry.name().contains(pattern) && kind.matches(entry) {
                matches.push(id);
            }
        });
        matches
    }

    /// Totals for the subtree rooted at `start`, fetching as needed.
    ///
    /// `start` itself is only counted when it is a plain file.
    pub fn analyze(&mut self, start: NodeId) -> Analysis {
        let mut analysis = Analysis::default();
        self.visit_subtree(start, |id, entry| {
            if !entry.is_directory() {
                analysis.add_file(entry);
            } else if id != start {
                analysis.dir_count += 1;
            }
        });
        analysis
    }

    fn visit_subtree<F>(&mut self, start: NodeId, mut visit: F)
    where
        F: FnMut(NodeId, &FileEntry),
    {
        let mut pending = vec![start];
        while let Some(id) = pending.pop() {
            // Symlinked directories below the start are reported but not entered
            let descend = id == start || self.entry(id).is_some_and(FileEntry::is_traversable);
            if descend {
                self.fetch_children(id);
            }
            let Some(tree) = self.tree() else {
                return;
            };
            let Some(entry) = tree.value(id) else {
                continue;
            };
            visit(id, entry);
            if descend {
                pending.extend(tree.children(id).iter().rev().copied());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::HiddenEntries;
    use rstest::*;
    use std::fs;
    use tempfile::TempDir;

    /// root/
    ///   notes.txt (5)
    ///   src/
    ///     main.rs (12)
    ///     lib.rs (3)
    ///     notes/
    ///       todo.TXT (4)
    ///   README (6)
    #[fixture]
    fn loaded() -> (TempDir, TreeBuilder, NodeId) {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path();
        fs::create_dir_all(root.join("src/notes")).unwrap();
        fs::write(root.join("notes.txt"), "12345").unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("src/lib.rs"), "//!").unwrap();
        fs::write(root.join("src/notes/todo.TXT"), "todo").unwrap();
        fs::write(root.join("README"), "readme").unwrap();

        let mut builder = TreeBuilder::new(HiddenEntries::Skip);
        let root_id = builder.load(root).expect("root should load");
        (temp, builder, root_id)
    }

    fn names(builder: &TreeBuilder, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| builder.entry(id).unwrap().name().to_string())
            .collect()
    }

    #[rstest]
    #[case(EntryKind::Any, &["notes", "notes.txt"])]
    #[case(EntryKind::Directory, &["notes"])]
    #[case(EntryKind::File, &["notes.txt"])]
    fn find_filters_by_kind(
        loaded: (TempDir, TreeBuilder, NodeId),
        #[case] kind: EntryKind,
        #[case] expected: &[&str],
    ) {
        let (_temp, mut builder, root) = loaded;
        let found = builder.find(root, "notes", kind);
        assert_eq!(names(&builder, &found), expected);
    }

    #[rstest]
    fn find_descends_into_unfetched_directories(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        let found = builder.find(root, "todo", EntryKind::Any);
        assert_eq!(names(&builder, &found), ["todo.TXT"]);
    }

    #[rstest]
    fn find_is_case_sensitive(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        assert!(builder.find(root, "readme", EntryKind::Any).is_empty());
    }

    #[rstest]
    fn analyze_totals_the_subtree(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        let analysis = builder.analyze(root);

        assert_eq!(analysis.file_count, 5);
        assert_eq!(analysis.dir_count, 2);
        assert_eq!(analysis.total_size, 5 + 12 + 3 + 4 + 6);
        assert_eq!(analysis.top_extensions(10), [("rs", 2), ("txt", 2)]);
        assert_eq!(analysis.top_extensions(1), [("rs", 2)]);
    }

    #[rstest]
    fn analyze_of_a_file_counts_only_that_file(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        let readme = builder.resolve(root, "README").unwrap();
        let analysis = builder.analyze(readme);

        assert_eq!(analysis.file_count, 1);
        assert_eq!(analysis.dir_count, 0);
        assert_eq!(analysis.total_size, 6);
        assert!(analysis.extensions.is_empty());
    }

    #[cfg(unix)]
    #[rstest]
    fn symlink_cycles_are_not_followed(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (temp, mut builder, root) = loaded;
        std::os::unix::fs::symlink(temp.path().join("src"), temp.path().join("src/notes/up"))
            .unwrap();
        std::os::unix::fs::symlink(temp.path().join("src/notes"), temp.path().join("src/down"))
            .unwrap();
        builder.invalidate(root);

        let analysis = builder.analyze(root);
        assert_eq!(analysis.file_count, 5);
        assert_eq!(analysis.total_size, 5 + 12 + 3 + 4 + 6);
        // src, notes, and the two links
        assert_eq!(analysis.dir_count, 4);

        let found = builder.find(root, "todo", EntryKind::Any);
        assert_eq!(names(&builder, &found), ["todo.TXT"]);
        let links = builder.find(root, "up", EntryKind::Directory);
        assert_eq!(names(&builder, &links), ["up"]);
    }

    #[cfg(unix)]
    #[rstest]
    fn symlinked_start_is_entered_but_not_reentered(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (temp, mut builder, root) = loaded;
        std::os::unix::fs::symlink(temp.path(), temp.path().join("loop")).unwrap();
        builder.invalidate(root);
        let link = builder.resolve(root, "loop").unwrap();

        let analysis = builder.analyze(link);

        // Everything under root seen through the link, without re-entering loop
        assert_eq!(analysis.file_count, 5);
        assert_eq!(analysis.dir_count, 3);
    }
}
