//! Lazy, invalidation-driven cache of a filesystem subtree.
//!
//! [`TreeBuilder`] owns a [`Tree`](crate::tree::Tree) of [`FileEntry`] values,
//! fetching a directory's children the first time something walks into it.
//! The cache is never refreshed implicitly: [`FileOperations`] clears and
//! re-fetches the affected directories after every mutation it performs.

mod analysis;
mod builder;
mod file_entry;
mod operations;
mod resolver;

pub use analysis::{Analysis, EntryKind};
pub use builder::TreeBuilder;
pub use file_entry::FileEntry;
pub use operations::{FileOperations, OperationError};
pub use resolver::{ResolveError, SEPARATOR};

use crate::tree::Tree;

pub type FileTree = Tree<FileEntry>;

/// Names starting with this marker are hidden entries
pub const HIDDEN_MARKER: char = '.';

/// Whether hidden entries are materialized when a directory is fetched.
///
/// Applies to both the lazy and the eager build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HiddenEntries {
    #[default]
    Skip,
    Show,
}

impl From<bool> for HiddenEntries {
    fn from(show: bool) -> Self {
        if show { Self::Show } else { Self::Skip }
    }
}
