//! Directory tree traversal.
//!
//! [`walk`] yields every entry below a root in pre-order (a directory before
//! its children, siblings sorted by file name). The root itself is not
//! yielded. Entries that cannot be inspected come back as [`WalkError`] items
//! and the walk carries on with the next entry.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

/// What a tree entry is archived as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
        }
    }
}

/// One file or directory found during a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path used for I/O
    pub absolute_path: PathBuf,

    /// Root-relative path, byte-for-byte as found on disk
    pub archive_path: PathBuf,

    /// Root-relative path with `/` separators, for display
    pub relative_path: String,

    pub kind: EntryKind,
}

/// An entry that could not be read or classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkError {
    /// Offending path, when known
    pub path: Option<PathBuf>,

    /// Root-relative form of `path`, empty when unknown
    pub relative_path: String,

    pub message: String,
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for WalkError {}

/// Starts a fresh walk of the tree under `root`.
///
/// Symbolic links are never descended into. A link to a file is reported as
/// a file (its target's content gets archived) and a link to a directory as
/// a directory. A dangling link is reported as an error. Sockets, FIFOs and
/// device nodes are skipped.
pub fn walk(root: &Path) -> TreeWalk {
    let inner = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    TreeWalk {
        root: root.to_path_buf(),
        inner,
    }
}

/// Number of items [`walk`] yields for `root` right now, errors included.
pub fn count(root: &Path) -> u64 {
    walk(root).count() as u64
}

/// Lazy pre-order sequence over a directory tree
pub struct TreeWalk {
    root: PathBuf,
    inner: walkdir::IntoIter,
}

impl TreeWalk {
    fn relative(&self, path: &Path) -> String {
        relative_path(&self.root, path)
    }
}

impl Iterator for TreeWalk {
    type Item = Result<TreeEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf);
                    let relative_path = path
                        .as_deref()
                        .map(|p| self.relative(p))
                        .unwrap_or_default();
                    return Some(Err(WalkError {
                        path,
                        relative_path,
                        message: e.to_string(),
                    }));
                }
            };

            let relative_path = self.relative(entry.path());
            match classify(&entry) {
                Ok(Some(kind)) => {
                    let archive_path = stripped_path(&self.root, entry.path());
                    return Some(Ok(TreeEntry {
                        absolute_path: entry.into_path(),
                        archive_path,
                        relative_path,
                        kind,
                    }));
                }
                Ok(None) => {
                    trace!("Skipping special file: {}", entry.path().display());
                    continue;
                }
                Err(message) => {
                    return Some(Err(WalkError {
                        path: Some(entry.into_path()),
                        relative_path,
                        message,
                    }))
                }
            }
        }
    }
}

fn classify(entry: &walkdir::DirEntry) -> Result<Option<EntryKind>, String> {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        return Ok(Some(EntryKind::Directory));
    }
    if file_type.is_file() {
        return Ok(Some(EntryKind::File));
    }
    if file_type.is_symlink() {
        let target = fs::metadata(entry.path())
            .map_err(|e| format!("cannot resolve symbolic link: {}", e))?;
        if target.is_dir() {
            return Ok(Some(EntryKind::Directory));
        }
        if target.is_file() {
            return Ok(Some(EntryKind::File));
        }
    }
    Ok(None)
}

/// `path` relative to `root`, keeping only its normal components.
pub fn stripped_path(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

/// `path` relative to `root`, joined with `/` whatever the platform separator.
///
/// Lossy for names that are not valid UTF-8; use [`stripped_path`] for I/O.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let stripped = path.strip_prefix(root).unwrap_or(path);
    stripped
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
