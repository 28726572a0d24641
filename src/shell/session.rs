use std::path::{Path, PathBuf};

use snafu::prelude::*;
use tracing::{debug, info};

use crate::ext::PathExt;
use crate::filesystem::{
    FileEntry, FileOperations, HiddenEntries, ResolveError, SEPARATOR, TreeBuilder,
};
use crate::tree::NodeId;

/// The cached tree plus the shell's working directory.
///
/// `current` is a handle into the tree and can go stale whenever a mutation
/// clears one of its ancestors, so the session also remembers the path it
/// stood on and relocates after every command.
#[derive(Debug)]
pub struct Session {
    builder: TreeBuilder,
    current: NodeId,
    current_path: PathBuf,
}

impl Session {
    pub fn open(root: &Path, hidden: HiddenEntries, preload: bool) -> Result<Self, SessionError> {
        let mut builder = TreeBuilder::new(hidden);
        let loaded = if preload {
            builder.load_eager(root)
        } else {
            builder.load(root)
        };
        let root_id = loaded.context(RootNotFoundSnafu {
            path: root.best_effort_display(),
        })?;
        let root_entry = builder
            .entry(root_id)
            .context(RootNotFoundSnafu {
                path: root.best_effort_display(),
            })?
            .clone();
        ensure!(
            root_entry.is_directory(),
            RootNotDirectorySnafu {
                path: root_entry.absolute_path().display().to_string(),
            }
        );

        info!("Session opened at {}", root_entry.absolute_path().display());
        Ok(Self {
            builder,
            current: root_id,
            current_path: root_entry.absolute_path().to_path_buf(),
        })
    }

    pub fn builder(&self) -> &TreeBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut TreeBuilder {
        &mut self.builder
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    pub fn current_entry(&self) -> Option<&FileEntry> {
        self.builder.entry(self.current)
    }

    pub fn root(&self) -> NodeId {
        self.builder
            .tree()
            .map(|tree| tree.root())
            .unwrap_or(self.current)
    }

    pub fn root_path(&self) -> &Path {
        self.builder
            .entry(self.root())
            .map(FileEntry::absolute_path)
            .unwrap_or(self.current_path.as_path())
    }

    /// Name shown in the prompt.
    pub fn prompt_name(&self) -> &str {
        self.current_entry().map(FileEntry::name).unwrap_or_default()
    }

    /// Resolves `path` relative to the current node.
    pub fn resolve(&mut self, path: &str) -> Result<NodeId, ResolveError> {
        self.builder.resolve(self.current, path)
    }

    /// Moves the working directory; `None` goes back to the root.
    pub fn change_directory(&mut self, path: Option<&str>) -> Result<(), ResolveError> {
        let target = match path {
            Some(path) => self.builder.resolve_directory(self.current, path)?,
            None => self.root(),
        };
        self.set_current(target);
        Ok(())
    }

    pub fn operations(&mut self) -> FileOperations<'_> {
        FileOperations::new(&mut self.builder, self.current)
    }

    /// Re-establishes a live current node after the tree changed.
    ///
    /// Tries the remembered path first, then each of its ancestors, and
    /// finally the root.
    pub fn revalidate(&mut self) {
        if self.builder.tree().is_some_and(|tree| tree.contains(self.current)) {
            return;
        }

        let root_path = self.root_path().to_path_buf();
        let mut candidate = self.current_path.clone();
        while candidate.starts_with(&root_path) {
            if let Some(id) = self.locate_directory(&root_path, &candidate) {
                debug!("Relocated current directory to {}", candidate.display());
                self.set_current(id);
                return;
            }
            if !candidate.pop() {
                break;
            }
        }

        debug!("Current directory is gone, returning to the root");
        self.set_current(self.root());
    }

    fn locate_directory(&mut self, root_path: &Path, path: &Path) -> Option<NodeId> {
        let relative = path.strip_prefix(root_path).ok()?;
        let mut absolute = String::from(SEPARATOR);
        for component in relative.components() {
            absolute.push_str(component.as_os_str().to_str()?);
            absolute.push(SEPARATOR);
        }
        let root = self.root();
        self.builder.resolve_directory(root, &absolute).ok()
    }

    fn set_current(&mut self, id: NodeId) {
        if let Some(entry) = self.builder.entry(id) {
            self.current_path = entry.absolute_path().to_path_buf();
            self.current = id;
        }
    }
}

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("Cannot open {path}: no such file or directory"))]
    RootNotFound { path: String },
    #[snafu(display("Cannot open {path}: not a directory"))]
    RootNotDirectory { path: String },
}
