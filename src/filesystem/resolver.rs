use snafu::prelude::*;
use tracing::debug;

use crate::filesystem::TreeBuilder;
use crate::tree::NodeId;

pub const SEPARATOR: char = '/';

const CURRENT_DIR: &str = ".";
const PARENT_DIR: &str = "..";

impl TreeBuilder {
    /// Locates the node for `path`, fetching directories along the way.
    ///
    /// Absolute paths start at the tree root, anything else at `start`. Empty
    /// and `.` segments are skipped. `..` is inert: it keeps the
    /// walk on the current node. Names match case-sensitively and only the
    /// last segment may name a plain file.
    pub fn resolve(&mut self, start: NodeId, path: &str) -> Result<NodeId, ResolveError> {
        let tree = self.tree().context(NotLoadedSnafu)?;
        let mut target = if path.starts_with(SEPARATOR) {
            tree.root()
        } else {
            ensure!(tree.contains(start), StaleStartSnafu { path });
            start
        };

        let segments: Vec<&str> = path
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty() && *segment != CURRENT_DIR)
            .collect();

        for (position, segment) in segments.iter().enumerate() {
            if *segment == PARENT_DIR {
                continue;
            }

            self.fetch_children(target);
            let tree = self.tree().context(NotLoadedSnafu)?;
            let next = tree
                .find_child(target, |entry| entry.name() == *segment)
                .context(NotFoundSnafu { path, segment: *segment })?;

            let is_last = position + 1 == segments.len();
            let is_directory = tree.value(next).is_some_and(|entry| entry.is_directory());
            ensure!(
                is_last || is_directory,
                NotADirectorySnafu { path, segment: *segment }
            );
            target = next;
        }

        debug!("Resolved '{path}' to {target}");
        Ok(target)
    }

    /// Resolves `path` and requires the result to be a directory.
    pub fn resolve_directory(&mut self, start: NodeId, path: &str) -> Result<NodeId, ResolveError> {
        let id = self.resolve(start, path)?;
        let is_directory = self.entry(id).is_some_and(|entry| entry.is_directory());
        ensure!(is_directory, NotADirectorySnafu { path, segment: path });
        Ok(id)
    }
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ResolveError {
    #[snafu(display("No tree is loaded"))]
    NotLoaded,
    #[snafu(display("Path {path} not found: no entry named '{segment}'"))]
    NotFound { path: String, segment: String },
    #[snafu(display("Path {path} is not a directory: '{segment}' is a file"))]
    NotADirectory { path: String, segment: String },
    #[snafu(display("Cannot resolve {path}: the starting directory is no longer cached"))]
    StaleStart { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::HiddenEntries;
    use rstest::*;
    use std::fs;
    use tempfile::TempDir;

    /// root/
    ///   docs/
    ///     a.txt (10 bytes)
    ///     nested/
    ///       deep.md
    ///   Readme
    #[fixture]
    fn loaded() -> (TempDir, TreeBuilder, NodeId) {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path();
        fs::create_dir_all(root.join("docs/nested")).unwrap();
        fs::write(root.join("docs/a.txt"), "0123456789").unwrap();
        fs::write(root.join("docs/nested/deep.md"), "# deep").unwrap();
        fs::write(root.join("Readme"), "readme").unwrap();

        let mut builder = TreeBuilder::new(HiddenEntries::Skip);
        let root_id = builder.load(root).expect("root should load");
        (temp, builder, root_id)
    }

    fn name_of(builder: &TreeBuilder, id: NodeId) -> &str {
        builder.entry(id).unwrap().name()
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("./")]
    #[case("/")]
    #[case("..")]
    fn trivial_paths_resolve_to_root(loaded: (TempDir, TreeBuilder, NodeId), #[case] path: &str) {
        let (_temp, mut builder, root) = loaded;
        assert_eq!(builder.resolve(root, path), Ok(root));
    }

    #[rstest]
    fn resolves_nested_file(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;

        let id = builder.resolve(root, "docs/a.txt").unwrap();
        let entry = builder.entry(id).unwrap();

        assert_eq!(entry.name(), "a.txt");
        assert!(!entry.is_directory());
        assert_eq!(entry.size(), 10);
    }

    #[rstest]
    fn missing_final_segment_is_not_found(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        assert_eq!(
            builder.resolve(root, "docs/missing.txt"),
            Err(ResolveError::NotFound {
                path: "docs/missing.txt".into(),
                segment: "missing.txt".into(),
            })
        );
    }

    #[rstest]
    fn missing_intermediate_segment_is_not_found(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        assert!(matches!(
            builder.resolve(root, "a.txt/x"),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[rstest]
    fn file_in_the_middle_is_not_a_directory(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        assert!(matches!(
            builder.resolve(root, "docs/a.txt/x"),
            Err(ResolveError::NotADirectory { segment, .. }) if segment == "a.txt"
        ));
    }

    #[rstest]
    fn relative_paths_start_at_the_given_node(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        let docs = builder.resolve(root, "docs").unwrap();

        let deep = builder.resolve(docs, "nested/deep.md").unwrap();
        assert_eq!(name_of(&builder, deep), "deep.md");

        assert!(builder.resolve(docs, "Readme").is_err());
        let readme = builder.resolve(docs, "/Readme").unwrap();
        assert_eq!(name_of(&builder, readme), "Readme");
    }

    #[rstest]
    fn parent_segments_are_inert(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        let docs = builder.resolve(root, "docs").unwrap();

        assert_eq!(builder.resolve(docs, ".."), Ok(docs));
        let nested = builder.resolve(root, "docs/../nested").unwrap();
        assert_eq!(name_of(&builder, nested), "nested");
    }

    #[rstest]
    #[case("DOCS")]
    #[case("readme")]
    fn matching_is_case_sensitive(loaded: (TempDir, TreeBuilder, NodeId), #[case] path: &str) {
        let (_temp, mut builder, root) = loaded;
        assert!(matches!(
            builder.resolve(root, path),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[rstest]
    fn resolution_fetches_lazily(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        let docs = builder.resolve(root, "docs").unwrap();
        assert!(!builder.tree().unwrap().is_fetched(docs));

        builder.resolve(root, "docs/nested").unwrap();
        assert!(builder.tree().unwrap().is_fetched(docs));
    }

    #[rstest]
    fn resolve_directory_rejects_files(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        assert!(builder.resolve_directory(root, "docs").is_ok());
        assert!(matches!(
            builder.resolve_directory(root, "Readme"),
            Err(ResolveError::NotADirectory { .. })
        ));
    }

    #[rstest]
    fn stale_start_is_reported(loaded: (TempDir, TreeBuilder, NodeId)) {
        let (_temp, mut builder, root) = loaded;
        let docs = builder.resolve(root, "docs").unwrap();
        builder.invalidate(root);

        assert!(matches!(
            builder.resolve(docs, "a.txt"),
            Err(ResolveError::StaleStart { .. })
        ));
        assert!(builder.resolve(docs, "/docs/a.txt").is_ok());
    }

    #[test]
    fn unloaded_builder_reports_not_loaded() {
        let mut builder = TreeBuilder::default();
        let mut other = TreeBuilder::default();
        let temp = TempDir::new().unwrap();
        let foreign_root = other.load(temp.path()).unwrap();

        assert_eq!(builder.resolve(foreign_root, "x"), Err(ResolveError::NotLoaded));
    }
}
