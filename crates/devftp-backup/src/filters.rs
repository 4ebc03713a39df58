//! Path exclusion for backup operations.
//!
//! Exclusions are absolute path prefixes. Matching is segment-aligned:
//! excluding `/a/b` drops `/a/b` and `/a/b/c` but keeps `/a/bc`.

use std::path::{Component, Path};

/// Canonical separator used for comparisons
const SEPARATOR: char = '/';

/// Normalizes a path to an absolute, `/`-separated string.
///
/// Relative paths are resolved against the current directory. `.` and `..`
/// components are folded lexically; the filesystem is never consulted, so
/// symlinks are not resolved and the path does not need to exist.
pub fn normalize(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    };

    let mut prefix = String::new();
    let mut parts: Vec<String> = Vec::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(p) => prefix = p.as_os_str().to_string_lossy().into_owned(),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }

    let joined = format!("{}{}{}", prefix, SEPARATOR, parts.join("/"));
    joined.replace('\\', "/")
}

/// Returns true if `path` equals or is nested under any member of `set`.
pub fn is_excluded(path: &Path, set: &ExclusionSet) -> bool {
    set.is_excluded(path)
}

/// Ordered set of normalized absolute path prefixes to leave out of a backup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    prefixes: Vec<String>,
}

impl ExclusionSet {
    /// Builds a set from arbitrary paths, normalizing each one.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut set = Self::default();
        for path in paths {
            set.push(path.as_ref());
        }
        set
    }

    /// Appends one prefix, skipping duplicates.
    pub fn push(&mut self, path: &Path) {
        let normalized = normalize(path);
        if !self.prefixes.contains(&normalized) {
            self.prefixes.push(normalized);
        }
    }

    /// Returns a copy with the always-excluded directories appended.
    ///
    /// `vcs_dir` is the source's version-control metadata directory and
    /// `output_dir` the directory archives are written to. Excluding the
    /// latter keeps a backup from swallowing itself or earlier backups.
    pub fn with_implicit(&self, vcs_dir: &Path, output_dir: &Path) -> Self {
        let mut merged = self.clone();
        merged.push(vcs_dir);
        merged.push(output_dir);
        merged
    }

    /// Returns true if the path equals or is nested under any member.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let candidate = normalize(path);
        self.prefixes
            .iter()
            .any(|prefix| is_segment_prefix(prefix, &candidate))
    }

    /// Normalized members, in insertion order.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

fn is_segment_prefix(prefix: &str, candidate: &str) -> bool {
    let trimmed = prefix.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() || trimmed.ends_with(':') {
        // Filesystem root (`/` or a drive root)
        return candidate.starts_with(prefix);
    }

    match candidate.strip_prefix(trimmed) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}
