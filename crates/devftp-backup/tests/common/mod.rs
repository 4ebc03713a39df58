//! Shared fixtures for devftp-backup integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tempfile::TempDir;

/// Entry read back from an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchivedEntry {
    Directory,
    File(Vec<u8>),
}

/// Creates a small project tree:
///
/// ```text
/// .git/HEAD
/// README.md
/// src/main.rs
/// src/lib/util.rs
/// assets/logo.bin
/// ```
pub fn create_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let base = temp.path();

    fs::create_dir_all(base.join(".git")).unwrap();
    fs::write(base.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::write(base.join("README.md"), "# demo project\n").unwrap();
    fs::create_dir_all(base.join("src/lib")).unwrap();
    fs::write(base.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(base.join("src/lib/util.rs"), "pub fn util() {}\n").unwrap();
    fs::create_dir_all(base.join("assets")).unwrap();
    let binary: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
    fs::write(base.join("assets/logo.bin"), binary).unwrap();

    temp
}

/// Reads every entry of a tar.gz archive, keyed by name without trailing `/`
pub fn read_archive(path: &Path) -> BTreeMap<String, ArchivedEntry> {
    let file = File::open(path).unwrap();
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut entries = BTreeMap::new();

    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry
            .path()
            .unwrap()
            .to_string_lossy()
            .trim_end_matches('/')
            .to_string();
        let value = match entry.header().entry_type() {
            EntryType::Directory => ArchivedEntry::Directory,
            _ => {
                let mut data = Vec::new();
                std::io::Read::read_to_end(&mut entry, &mut data).unwrap();
                ArchivedEntry::File(data)
            }
        };
        entries.insert(name, value);
    }

    entries
}

/// Names of all archived entries
pub fn archived_names(path: &Path) -> Vec<String> {
    read_archive(path).into_keys().collect()
}

/// Raw name bytes and file contents of every regular entry, in archive order
pub fn read_raw_files(path: &Path) -> Vec<(Vec<u8>, Vec<u8>)> {
    let file = File::open(path).unwrap();
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut files = Vec::new();

    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.header().entry_type() != EntryType::Regular {
            continue;
        }
        let name = entry.path_bytes().into_owned();
        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut data).unwrap();
        files.push((name, data));
    }

    files
}
