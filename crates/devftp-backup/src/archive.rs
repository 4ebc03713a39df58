//! Archive creation for backups.
//!
//! This module writes a gzip-compressed tar stream straight to the output
//! file, one entry at a time. Adding an entry never aborts the archive: a
//! failure is returned to the caller, which records it and moves on.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read};
use std::path::{Component, Path, PathBuf};

use devftp_core::{Error, Result};
use flate2::write::GzEncoder;
use tar::{Builder as TarBuilder, EntryType, Header, HeaderMode};
use tracing::{debug, warn};

use crate::compression::CompressionLevel;

type TarStream = TarBuilder<GzEncoder<BufWriter<File>>>;

enum Stream {
    /// Output file created, compressed stream not started yet
    Pending(BufWriter<File>),
    Writing(TarStream),
    Closed,
}

/// Open output container for a single backup run.
///
/// The gzip stream starts at the first added entry, so the level set with
/// [`ArchiveBuilder::set_compression_level`] before that governs the whole
/// archive. Single-threaded use only; [`ArchiveBuilder::close`] consumes the
/// builder.
pub struct ArchiveBuilder {
    output_path: PathBuf,
    level: CompressionLevel,
    stream: Stream,
    /// Set once a failed write left the tar stream inconsistent
    broken: Option<String>,
    entries: u64,
}

impl ArchiveBuilder {
    /// Creates (or truncates) the output file.
    ///
    /// Fails with `Create` when the file cannot be created, e.g. because its
    /// parent directory is missing.
    pub fn open(output_path: &Path) -> Result<Self> {
        let file = File::create(output_path).map_err(|e| Error::create(output_path, e))?;
        debug!("Opened archive {}", output_path.display());

        Ok(Self {
            output_path: output_path.to_path_buf(),
            level: CompressionLevel::default(),
            stream: Stream::Pending(BufWriter::new(file)),
            broken: None,
            entries: 0,
        })
    }

    /// Sets the compression level for the archive.
    ///
    /// Ignored with a warning once the first entry has been written, since
    /// the gzip stream is already running at its initial level.
    pub fn set_compression_level(&mut self, level: CompressionLevel) {
        match self.stream {
            Stream::Pending(_) => self.level = level,
            _ => warn!(
                "Compression level {} ignored: archive stream already started at level {}",
                level, self.level
            ),
        }
    }

    pub fn compression_level(&self) -> CompressionLevel {
        self.level
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Number of entries written so far.
    pub fn entries_written(&self) -> u64 {
        self.entries
    }

    /// Registers the directory at `source` as an empty entry under `relative_path`.
    ///
    /// Mode and mtime come from the directory's own metadata, following
    /// symbolic links.
    pub fn add_directory(&mut self, source: &Path, relative_path: impl AsRef<Path>) -> Result<()> {
        let relative_path = relative_path.as_ref();
        let name = display_name(relative_path);
        self.check_usable(relative_path, &name)?;

        let metadata = fs::metadata(source).map_err(|e| Error::entry(name.as_str(), e))?;
        if !metadata.is_dir() {
            return Err(Error::entry(name, "not a directory"));
        }

        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);

        let tar = self.tar()?;
        if let Err(e) = tar.append_data(&mut header, relative_path, io::empty()) {
            return Err(self.mark_broken(&name, e));
        }

        self.entries += 1;
        Ok(())
    }

    /// Streams the file at `source` into the archive under `relative_path`.
    ///
    /// Open and stat failures are reported before anything is written. A
    /// file that shrinks or fails to read mid-copy is padded with zeros up
    /// to the size in its header and reported as an `Entry` error; the
    /// archive stays usable. Only a failed write to the output leaves the
    /// stream inconsistent, after which every later call fails and
    /// [`ArchiveBuilder::close`] reports `Finalize`.
    pub fn add_file(&mut self, source: &Path, relative_path: impl AsRef<Path>) -> Result<()> {
        let relative_path = relative_path.as_ref();
        let name = display_name(relative_path);
        self.check_usable(relative_path, &name)?;

        let file = File::open(source).map_err(|e| Error::entry(name.as_str(), e))?;
        let metadata = file
            .metadata()
            .map_err(|e| Error::entry(name.as_str(), e))?;
        if !metadata.is_file() {
            return Err(Error::entry(name, "not a regular file"));
        }

        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
        header.set_entry_type(EntryType::Regular);
        header.set_size(metadata.len());

        self.append_padded(header, relative_path, &name, file)
    }

    /// Writes one regular entry whose header already carries its size.
    fn append_padded<R: Read>(
        &mut self,
        mut header: Header,
        relative_path: &Path,
        name: &str,
        source: R,
    ) -> Result<()> {
        let size = header.size().map_err(|e| Error::entry(name, e))?;
        let mut reader = PaddedReader::new(source, size);

        let tar = self.tar()?;
        // The reader never fails, so any error here is on the output side
        if let Err(e) = tar.append_data(&mut header, relative_path, &mut reader) {
            return Err(self.mark_broken(name, e));
        }

        if let Some(problem) = reader.shortfall() {
            warn!("Entry {} padded with zeros: {}", name, problem);
            return Err(Error::entry(name, problem));
        }

        self.entries += 1;
        Ok(())
    }

    /// Finishes the tar stream, the gzip stream and syncs the file to disk.
    ///
    /// On error the output file must be treated as invalid.
    pub fn close(mut self) -> Result<()> {
        if let Some(reason) = self.broken.take() {
            self.stream = Stream::Closed;
            return Err(Error::finalize(format!(
                "archive stream is inconsistent: {}",
                reason
            )));
        }

        self.tar()?;
        let tar = match std::mem::replace(&mut self.stream, Stream::Closed) {
            Stream::Writing(tar) => tar,
            _ => return Err(Error::finalize("archive already closed")),
        };

        let encoder = tar.into_inner().map_err(Error::finalize)?;
        let writer = encoder.finish().map_err(Error::finalize)?;
        let file = writer.into_inner().map_err(|e| Error::finalize(e.error()))?;
        file.sync_all().map_err(Error::finalize)?;

        debug!(
            "Closed archive {} with {} entries",
            self.output_path.display(),
            self.entries
        );
        Ok(())
    }

    fn check_usable(&self, relative_path: &Path, name: &str) -> Result<()> {
        if let Some(reason) = &self.broken {
            return Err(Error::entry(
                name,
                format!("archive stream is inconsistent: {}", reason),
            ));
        }
        if !relative_path
            .components()
            .any(|c| matches!(c, Component::Normal(_)))
        {
            return Err(Error::entry(name, "empty entry name"));
        }
        Ok(())
    }

    /// Starts the compressed stream on first use.
    fn tar(&mut self) -> Result<&mut TarStream> {
        if let Stream::Pending(_) = self.stream {
            if let Stream::Pending(writer) = std::mem::replace(&mut self.stream, Stream::Closed) {
                let encoder = GzEncoder::new(writer, self.level.to_flate2());
                self.stream = Stream::Writing(TarBuilder::new(encoder));
            }
        }

        match &mut self.stream {
            Stream::Writing(tar) => Ok(tar),
            _ => Err(Error::finalize("archive already closed")),
        }
    }

    fn mark_broken(&mut self, relative_path: &str, e: io::Error) -> Error {
        warn!("Archive stream broken while adding {}: {}", relative_path, e);
        self.broken = Some(format!("{}: {}", relative_path, e));
        Error::entry(relative_path, e)
    }
}

/// Yields exactly `size` bytes: the source's bytes, then zeros if the
/// source ends early or fails.
struct PaddedReader<R> {
    inner: R,
    remaining: u64,
    read: u64,
    shortfall: Option<String>,
}

impl<R: Read> PaddedReader<R> {
    fn new(inner: R, size: u64) -> Self {
        Self {
            inner,
            remaining: size,
            read: 0,
            shortfall: None,
        }
    }

    /// Why the entry had to be padded, if it was
    fn shortfall(&self) -> Option<&str> {
        self.shortfall.as_deref()
    }

    /// Largest read that stays within the declared size
    fn limit(&self, len: usize) -> usize {
        usize::try_from(self.remaining).map_or(len, |remaining| len.min(remaining))
    }

    fn pad(&mut self, buf: &mut [u8]) -> usize {
        let n = self.limit(buf.len());
        buf[..n].fill(0);
        n
    }
}

impl<R: Read> Read for PaddedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let n = if self.shortfall.is_some() {
            self.pad(buf)
        } else {
            let limit = self.limit(buf.len());
            match self.inner.read(&mut buf[..limit]) {
                Ok(0) => {
                    self.shortfall = Some(format!(
                        "file shrank while reading ({} of {} bytes)",
                        self.read,
                        self.read + self.remaining
                    ));
                    self.pad(buf)
                }
                Ok(n) => {
                    self.read += n as u64;
                    n
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => return Err(e),
                Err(e) => {
                    self.shortfall = Some(format!(
                        "read failed after {} of {} bytes: {}",
                        self.read,
                        self.read + self.remaining,
                        e
                    ));
                    self.pad(buf)
                }
            }
        };

        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Entry name as shown in errors and logs
fn display_name(relative_path: &Path) -> String {
    relative_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    /// Reads an archive back into `name -> Some(bytes)` for files and
    /// `name -> None` for directories.
    fn read_archive(path: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
        let mut contents = BTreeMap::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let name = entry
                .path()
                .unwrap()
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string();
            if entry.header().entry_type().is_dir() {
                contents.insert(name, None);
            } else {
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                contents.insert(name, Some(data));
            }
        }
        contents
    }

    #[test]
    fn test_directory_and_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hello.txt");
        fs::write(&source, b"hello archive").unwrap();
        let output = temp.path().join("out.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        builder.add_directory(temp.path(), "docs").unwrap();
        builder.add_file(&source, "docs/hello.txt").unwrap();
        assert_eq!(builder.entries_written(), 2);
        builder.close().unwrap();

        let contents = read_archive(&output);
        assert_eq!(contents.get("docs"), Some(&None));
        assert_eq!(
            contents.get("docs/hello.txt"),
            Some(&Some(b"hello archive".to_vec()))
        );
    }

    #[test]
    fn test_store_only_archive_is_valid() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("data.bin");
        let payload = b"uncompressed ".repeat(1000);
        fs::write(&source, &payload).unwrap();
        let output = temp.path().join("stored.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        builder.set_compression_level(CompressionLevel::store_only());
        builder.add_file(&source, "data.bin").unwrap();
        builder.close().unwrap();

        // Stored deflate blocks are larger than the payload itself
        assert!(fs::metadata(&output).unwrap().len() > payload.len() as u64);
        assert_eq!(read_archive(&output).get("data.bin"), Some(&Some(payload)));
    }

    #[test]
    fn test_higher_level_compresses_better() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("repeat.txt");
        fs::write(&source, b"Repeated content! ".repeat(5000)).unwrap();

        let build = |name: &str, level: i64| {
            let output = temp.path().join(name);
            let mut builder = ArchiveBuilder::open(&output).unwrap();
            builder.set_compression_level(CompressionLevel::new(level).unwrap());
            builder.add_file(&source, "repeat.txt").unwrap();
            builder.close().unwrap();
            fs::metadata(&output).unwrap().len()
        };

        assert!(build("best.tar.gz", 9) < build("none.tar.gz", 0));
    }

    #[test]
    fn test_unreadable_file_keeps_archive_usable() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.txt");
        fs::write(&good, b"ok").unwrap();
        let output = temp.path().join("out.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        let err = builder
            .add_file(&temp.path().join("missing.txt"), "missing.txt")
            .unwrap_err();
        assert!(matches!(err, Error::Entry { .. }));

        builder.add_file(&good, "good.txt").unwrap();
        builder.close().unwrap();

        let contents = read_archive(&output);
        assert_eq!(contents.len(), 1);
        assert!(contents.contains_key("good.txt"));
    }

    #[test]
    fn test_directory_as_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        // Opening a directory succeeds on some platforms; the stat check
        // still rejects it before anything is written
        assert!(builder.add_file(temp.path(), "dir").is_err());
        builder.close().unwrap();
        assert!(read_archive(&output).is_empty());
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("empty.tar.gz");

        ArchiveBuilder::open(&output).unwrap().close().unwrap();

        assert!(output.exists());
        assert!(read_archive(&output).is_empty());
    }

    #[test]
    fn test_open_missing_parent_is_create_error() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("no/such/dir/out.tar.gz");

        let err = ArchiveBuilder::open(&output).err().unwrap();
        assert!(matches!(err, Error::Create { .. }));
    }

    #[test]
    fn test_level_change_after_start_is_ignored() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        builder.set_compression_level(CompressionLevel::new(3).unwrap());
        builder.add_directory(temp.path(), "a").unwrap();
        builder.set_compression_level(CompressionLevel::new(9).unwrap());

        assert_eq!(builder.compression_level().value(), 3);
        builder.close().unwrap();
    }

    #[test]
    fn test_empty_name_rejected() {
        let temp = TempDir::new().unwrap();
        let mut builder = ArchiveBuilder::open(&temp.path().join("out.tar.gz")).unwrap();
        assert!(builder.add_directory(temp.path(), "").is_err());
        assert!(builder.add_directory(temp.path(), "/").is_err());
        builder.close().unwrap();
    }

    /// Returns its bytes, then fails every later read
    struct FailingReader {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.data.len() {
                return Err(io::Error::new(io::ErrorKind::Other, "device error"));
            }
            let n = buf.len().min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn regular_header(size: u64) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(size);
        header
    }

    #[test]
    fn test_failed_read_is_padded_and_archive_stays_usable() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.txt");
        fs::write(&good, b"still fine").unwrap();
        let output = temp.path().join("out.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        let source = FailingReader {
            data: b"hello".to_vec(),
            pos: 0,
        };
        let err = builder
            .append_padded(regular_header(100), Path::new("broken.log"), "broken.log", source)
            .unwrap_err();
        assert!(matches!(err, Error::Entry { ref path, .. } if path == "broken.log"));
        assert!(err.to_string().contains("device error"));

        builder.add_file(&good, "good.txt").unwrap();
        assert_eq!(builder.entries_written(), 1);
        builder.close().unwrap();

        let contents = read_archive(&output);
        let mut padded = b"hello".to_vec();
        padded.resize(100, 0);
        assert_eq!(contents.get("broken.log"), Some(&Some(padded)));
        assert_eq!(
            contents.get("good.txt"),
            Some(&Some(b"still fine".to_vec()))
        );
    }

    #[test]
    fn test_shrunk_source_is_padded() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        let err = builder
            .append_padded(regular_header(10), Path::new("app.log"), "app.log", &b"abc"[..])
            .unwrap_err();
        assert!(err.to_string().contains("file shrank while reading (3 of 10 bytes)"));

        builder.add_directory(temp.path(), "after").unwrap();
        builder.close().unwrap();

        let contents = read_archive(&output);
        assert_eq!(
            contents.get("app.log"),
            Some(&Some(b"abc\0\0\0\0\0\0\0".to_vec()))
        );
        assert_eq!(contents.get("after"), Some(&None));
    }

    #[test]
    fn test_missing_directory_source_is_entry_error() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        let err = builder
            .add_directory(&temp.path().join("gone"), "gone")
            .unwrap_err();
        assert!(matches!(err, Error::Entry { .. }));
        builder.close().unwrap();
        assert!(read_archive(&output).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_header_uses_metadata() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let private = temp.path().join("private");
        fs::create_dir(&private).unwrap();
        fs::set_permissions(&private, fs::Permissions::from_mode(0o700)).unwrap();
        let output = temp.path().join("out.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        builder.add_directory(&private, "private").unwrap();
        builder.close().unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&output).unwrap()));
        let entry = archive.entries().unwrap().next().unwrap().unwrap();
        let header = entry.header();
        assert!(header.entry_type().is_dir());
        assert_eq!(header.mode().unwrap() & 0o777, 0o700);
        assert_eq!(
            header.mtime().unwrap(),
            fs::metadata(&private)
                .unwrap()
                .modified()
                .unwrap()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_secs()
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_are_stored_raw() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("data.txt");
        fs::write(&source, b"x").unwrap();
        let output = temp.path().join("out.tar.gz");

        let mut builder = ArchiveBuilder::open(&output).unwrap();
        builder
            .add_file(&source, Path::new(OsStr::from_bytes(b"a\xff")))
            .unwrap();
        builder
            .add_file(&source, Path::new(OsStr::from_bytes(b"a\xfe")))
            .unwrap();
        builder.close().unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&output).unwrap()));
        let names: Vec<Vec<u8>> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path_bytes().into_owned())
            .collect();
        assert_eq!(names, vec![b"a\xff".to_vec(), b"a\xfe".to_vec()]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_output_write_failure_is_finalize_error() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("data.txt");
        fs::write(&source, b"payload").unwrap();

        let mut builder = ArchiveBuilder::open(full).unwrap();
        // Small entries stay buffered, so the write error surfaces at close
        let _ = builder.add_file(&source, "data.txt");
        let err = builder.close().unwrap_err();
        assert!(matches!(err, Error::Finalize { .. }));
    }
}
