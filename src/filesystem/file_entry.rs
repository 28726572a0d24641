use std::fmt;
use std::fs::{self, Metadata};
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

/// Snapshot of a filesystem entry, used as the payload of every cached node.
///
/// Identity is the absolute path alone. The directory flag and size are only
/// what was observed at fetch time and may go stale without affecting lookups.
#[derive(Debug, Clone)]
pub struct FileEntry {
    name: String,
    absolute_path: PathBuf,
    is_directory: bool,
    is_symlink: bool,
    size: u64,
}

impl FileEntry {
    /// Stats `path`, following symlinks.
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path)?;
        let is_symlink = is_link(&path);
        Ok(Self::from_metadata(path, &metadata, is_symlink))
    }

    /// Builds an entry for a listed directory child.
    ///
    /// Never fails: a dangling symlink is described by its own metadata and
    /// anything unreadable becomes an empty plain file. A link to a directory
    /// counts as a directory but keeps its symlink flag.
    pub(crate) fn from_listing(path: PathBuf) -> Self {
        let is_symlink = is_link(&path);
        match fs::metadata(&path).or_else(|_| fs::symlink_metadata(&path)) {
            Ok(metadata) => Self::from_metadata(path, &metadata, is_symlink),
            Err(_) => Self {
                name: entry_name(&path),
                absolute_path: path,
                is_directory: false,
                is_symlink,
                size: 0,
            },
        }
    }

    /// Lookup key carrying only the identity of `path`.
    pub fn key(path: impl Into<PathBuf>) -> Self {
        let absolute_path = path.into();
        Self {
            name: entry_name(&absolute_path),
            absolute_path,
            is_directory: false,
            is_symlink: false,
            size: 0,
        }
    }

    fn from_metadata(path: PathBuf, metadata: &Metadata, is_symlink: bool) -> Self {
        Self {
            name: entry_name(&path),
            is_directory: metadata.is_dir(),
            is_symlink,
            size: metadata.len(),
            absolute_path: path,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    /// Whole-subtree walks descend into this entry. Symlinked directories
    /// are excluded so link cycles cannot be followed.
    pub fn is_traversable(&self) -> bool {
        self.is_directory && !self.is_symlink
    }

    /// Length in bytes; meaningless for directories.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with(super::HIDDEN_MARKER)
    }

    /// Lower-cased extension of a plain file, if it has one.
    pub fn extension(&self) -> Option<String> {
        if self.is_directory {
            return None;
        }
        self.absolute_path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }
}

fn is_link(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|metadata| metadata.is_symlink())
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl PartialEq for FileEntry {
    fn eq(&self, other: &Self) -> bool {
        self.absolute_path == other.absolute_path
    }
}

impl Eq for FileEntry {}

impl Hash for FileEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.absolute_path.hash(state);
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.is_directory { "[DIR]" } else { "[FILE]" };
        write!(f, "{tag} {}", self.name)
    }
}
