use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use snafu::prelude::*;
use tracing::{debug, info};

use crate::ext::PathExt;
use crate::filesystem::{FileEntry, ResolveError, SEPARATOR, TreeBuilder};
use crate::tree::{NodeId, TraversalOrder};

/// Structural filesystem mutations that keep the cache in step.
///
/// Every operation touches the disk first and only invalidates cached
/// directories once the filesystem call succeeded. Paths are interpreted the
/// same way as [`TreeBuilder::resolve`], relative to `current`.
pub struct FileOperations<'a> {
    builder: &'a mut TreeBuilder,
    current: NodeId,
}

impl<'a> FileOperations<'a> {
    pub fn new(builder: &'a mut TreeBuilder, current: NodeId) -> Self {
        Self { builder, current }
    }

    /// Creates a single directory whose parent must already exist.
    pub fn make_directory(&mut self, path: &str) -> Result<PathBuf, OperationError> {
        let target = self.new_entry_path(path)?;
        fs::create_dir(&target).context(CreateDirectorySnafu { path: &target })?;
        info!("Created directory {}", target.display());

        self.refresh_parent_of(&target);
        // A fresh directory is known to be empty
        if let Some(id) = self.locate(&target) {
            self.builder.fetch_children(id);
        }
        Ok(target)
    }

    /// Deletes a file or a whole directory tree, children before parents.
    pub fn remove(&mut self, path: &str) -> Result<PathBuf, OperationError> {
        let id = self.resolve_movable(path, "remove")?;
        let target = self.path_of(id)?;

        remove_recursively(&target).context(RemoveSnafu { path: &target })?;
        info!("Removed {}", target.display());

        self.refresh_parent_of(&target);
        Ok(target)
    }

    /// Renames an entry in place; `new_name` is a bare name, not a path.
    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<PathBuf, OperationError> {
        validate_name(new_name)?;
        let id = self.resolve_movable(path, "rename")?;
        let from = self.path_of(id)?;
        let to = from.with_file_name(new_name);
        ensure!(!exists(&to), AlreadyExistsSnafu { path: &to });

        fs::rename(&from, &to).context(RenameSnafu { from: &from, to: &to })?;
        info!("Renamed {} to {}", from.display(), to.display());

        self.refresh_parent_of(&to);
        Ok(to)
    }

    /// Moves an entry into an existing directory, or to a new path.
    pub fn move_entry(&mut self, source: &str, destination: &str) -> Result<PathBuf, OperationError> {
        let id = self.resolve_movable(source, "move")?;
        let from = self.path_of(id)?;
        let to = self.destination_path(&from, destination)?;

        fs::rename(&from, &to).context(RenameSnafu { from: &from, to: &to })?;
        info!("Moved {} to {}", from.display(), to.display());

        self.refresh_parent_of(&from);
        if from.parent() != to.parent() {
            self.refresh_parent_of(&to);
        }
        Ok(to)
    }

    /// Copies a file or a directory tree.
    pub fn copy(&mut self, source: &str, destination: &str) -> Result<PathBuf, OperationError> {
        let id = self
            .builder
            .resolve(self.current, source)
            .context(ResolveSnafu)?;
        let from = self.path_of(id)?;
        let to = self.destination_path(&from, destination)?;

        copy_recursively(&from, &to).context(CopySnafu { from: &from, to: &to })?;
        info!("Copied {} to {}", from.display(), to.display());

        self.refresh_parent_of(&to);
        Ok(to)
    }

    /// Drops whatever is cached for a directory and lists it again.
    pub fn refresh(&mut self, path: &str) -> Result<PathBuf, OperationError> {
        let id = self
            .builder
            .resolve_directory(self.current, path)
            .context(ResolveSnafu)?;
        let count = self.builder.invalidate(id);
        debug!("Refreshed {id} with {count} entries");
        self.path_of(id)
    }

    fn resolve_movable(&mut self, path: &str, action: &'static str) -> Result<NodeId, OperationError> {
        let id = self
            .builder
            .resolve(self.current, path)
            .context(ResolveSnafu)?;
        let root = self.builder.tree().map(|tree| tree.root());
        ensure!(root != Some(id), TreeRootSnafu { action });
        Ok(id)
    }

    /// Absolute path for an entry that must not exist yet, inside a cached
    /// directory.
    fn new_entry_path(&mut self, path: &str) -> Result<PathBuf, OperationError> {
        let (parent, name) = split_parent(path);
        validate_name(name)?;
        let parent_id = self
            .builder
            .resolve_directory(self.current, parent)
            .context(ResolveSnafu)?;
        let target = self.path_of(parent_id)?.join(name);
        ensure!(!exists(&target), AlreadyExistsSnafu { path: &target });
        Ok(target)
    }

    /// Where `from` ends up for `mv`/`cp`: inside `destination` when that is
    /// an existing directory, otherwise at `destination` itself.
    fn destination_path(&mut self, from: &Path, destination: &str) -> Result<PathBuf, OperationError> {
        let to = match self.builder.resolve(self.current, destination) {
            Ok(id) => {
                let existing = self.path_of(id)?;
                let is_directory = self
                    .builder
                    .entry(id)
                    .is_some_and(FileEntry::is_directory);
                ensure!(is_directory, AlreadyExistsSnafu { path: &existing });
                let name = from.file_name().context(TreeRootSnafu { action: "move" })?;
                existing.join(name)
            }
            Err(ResolveError::NotFound { .. }) => self.new_entry_path(destination)?,
            Err(source) => return Err(OperationError::Resolve { source }),
        };

        ensure!(
            !to.starts_with(from),
            IntoItselfSnafu { from, to: &to }
        );
        ensure!(!exists(&to), AlreadyExistsSnafu { path: &to });
        Ok(to)
    }

    fn path_of(&self, id: NodeId) -> Result<PathBuf, OperationError> {
        self.builder
            .entry(id)
            .map(|entry| entry.absolute_path().to_path_buf())
            .ok_or(OperationError::Resolve {
                source: ResolveError::NotLoaded,
            })
    }

    fn locate(&self, path: &Path) -> Option<NodeId> {
        self.builder.tree()?.search(&FileEntry::key(path))
    }

    fn refresh_parent_of(&mut self, path: &Path) {
        let parent = path.parent().unwrap_or(path);
        self.refresh_directory(parent);

        // The same directory may also be cached under its real path or
        // behind a symlink
        let Ok(canonical) = parent.canonicalize() else {
            return;
        };
        for alias in self.aliases_of(parent, &canonical) {
            debug!("Refreshing alias {alias} of {}", canonical.display());
            self.builder.invalidate(alias);
        }
    }

    /// Fetched nodes other than `cached` that name the directory `canonical`.
    fn aliases_of(&self, cached: &Path, canonical: &Path) -> Vec<NodeId> {
        let Some(tree) = self.builder.tree() else {
            return Vec::new();
        };
        tree.walk(tree.root(), TraversalOrder::PreOrder)
            .filter(|&id| tree.is_fetched(id))
            .filter(|&id| {
                tree.value(id).is_some_and(|entry| {
                    let path = entry.absolute_path();
                    path != cached
                        && (path == canonical
                            || (entry.is_symlink()
                                && path.canonicalize().is_ok_and(|target| target == canonical)))
                })
            })
            .collect()
    }

    /// Invalidates the cached node for `directory`, or the current node when
    /// the directory was never cached.
    fn refresh_directory(&mut self, directory: &Path) {
        let Some(tree) = self.builder.tree() else {
            return;
        };
        let target = match tree.search(&FileEntry::key(directory)) {
            Some(id) => id,
            None if tree.contains(self.current) => self.current,
            None => tree.root(),
        };
        debug!(
            "Refreshing {} through {target}",
            directory.best_effort_display()
        );
        self.builder.invalidate(target);
    }
}

fn split_parent(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(0) => ("/", &trimmed[1..]),
        Some(index) => (&trimmed[..index], &trimmed[index + 1..]),
        None => ("", trimmed),
    }
}

fn validate_name(name: &str) -> Result<(), OperationError> {
    ensure!(
        !name.is_empty() && name != "." && name != ".." && !name.contains(SEPARATOR),
        InvalidNameSnafu { name }
    );
    Ok(())
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Removes `path` without following symlinks, using an explicit stack.
fn remove_recursively(path: &Path) -> io::Result<()> {
    if !fs::symlink_metadata(path)?.is_dir() {
        return fs::remove_file(path);
    }

    // (directory, children already scheduled)
    let mut pending = vec![(path.to_path_buf(), false)];
    while let Some((directory, expanded)) = pending.pop() {
        if expanded {
            fs::remove_dir(&directory)?;
            continue;
        }
        pending.push((directory.clone(), true));
        for entry in fs::read_dir(&directory)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                pending.push((entry.path(), false));
            } else {
                fs::remove_file(entry.path())?;
            }
        }
    }
    Ok(())
}

fn copy_recursively(from: &Path, to: &Path) -> io::Result<()> {
    if !fs::metadata(from)?.is_dir() {
        fs::copy(from, to)?;
        return Ok(());
    }

    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((source, destination)) = pending.pop() {
        fs::create_dir(&destination)?;
        for entry in fs::read_dir(&source)? {
            let entry = entry?;
            let target = destination.join(entry.file_name());
            if entry.file_type()?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Snafu)]
pub enum OperationError {
    #[snafu(display("{source}"))]
    Resolve { source: ResolveError },
    #[snafu(display("'{name}' is not a valid entry name"))]
    InvalidName { name: String },
    #[snafu(display("{} already exists", path.display()))]
    AlreadyExists { path: PathBuf },
    #[snafu(display("Refusing to {action} the root of the tree"))]
    TreeRoot { action: &'static str },
    #[snafu(display("Cannot place {} inside itself at {}", from.display(), to.display()))]
    IntoItself { from: PathBuf, to: PathBuf },
    #[snafu(display("Failed to create directory {}", path.display()))]
    CreateDirectory { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to remove {}", path.display()))]
    Remove { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to move {} to {}", from.display(), to.display()))]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[snafu(display("Failed to copy {} to {}", from.display(), to.display()))]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}
