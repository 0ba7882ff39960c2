//! The package archive container: a ZIP-family file holding, in a fixed
//! entry order, `metadata.xml` (one [`PackageRecord`]), `files.xml` (the
//! file list, path-sorted), an optional `comar/` script directory, and the
//! `install/` payload tree.

use coralpkg_core::{FileEntry, FileKind, PackageRecord};
use coralpkg_version::Revision;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

pub const METADATA_ENTRY: &str = "metadata.xml";
pub const FILES_ENTRY: &str = "files.xml";
pub const COMAR_PREFIX: &str = "comar/";
pub const INSTALL_PREFIX: &str = "install/";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("archive is missing required entry '{0}'")]
    MissingEntry(String),
    #[error("hash mismatch: expected {expected}, got {got}")]
    HashMismatch { expected: String, got: String },
}

fn io_err(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One delta package: a binary patch applicable only against an installed
/// revision at exactly `source_release`, for the same distribution and
/// architecture as `base`.
#[derive(Debug, Clone)]
pub struct DeltaPackage {
    pub source_release: u32,
    pub base: PackageRecord,
}

impl DeltaPackage {
    /// `true` iff this delta can be applied on top of `installed` to reach
    /// `self.base`'s revision, for a system running `distro_id`/`arch`.
    #[must_use]
    pub fn applicable(&self, installed: &Revision, distro_id: &str, arch: &str) -> bool {
        installed.release == self.source_release
            && self.base.distro_id == distro_id
            && self.base.arch == arch
    }
}

/// Reads a package archive without necessarily extracting its payload.
pub struct ArchiveReader {
    path: PathBuf,
    zip: zip::ZipArchive<File>,
    entries: Vec<String>,
}

impl ArchiveReader {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|e| io_err(path, e))?;
        let zip = zip::ZipArchive::new(file)?;
        let entries = zip.file_names().map(str::to_string).collect();
        Ok(Self {
            path: path.to_path_buf(),
            zip,
            entries,
        })
    }

    /// Entry names in container order, without extracting anything.
    #[must_use]
    pub fn list_entries(&self) -> &[String] {
        &self.entries
    }

    fn read_entry_string(&mut self, name: &str) -> Result<String, ArchiveError> {
        let mut file = self
            .zip
            .by_name(name)
            .map_err(|_| ArchiveError::MissingEntry(name.to_string()))?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)
            .map_err(|e| io_err(&self.path, e))?;
        Ok(buf)
    }

    /// Parse `metadata.xml` into a [`PackageRecord`] without extracting
    /// the payload tree.
    #[instrument(skip(self))]
    pub fn extract_metadata(&mut self) -> Result<PackageRecord, ArchiveError> {
        if !self.entries.iter().any(|e| e == METADATA_ENTRY) {
            return Err(ArchiveError::MissingEntry(METADATA_ENTRY.to_string()));
        }
        let xml = self.read_entry_string(METADATA_ENTRY)?;
        let record: PackageRecord = quick_xml::de::from_str(&xml)?;
        Ok(record)
    }

    /// Parse `files.xml` into the recorded file list.
    #[instrument(skip(self))]
    pub fn extract_files(&mut self) -> Result<Vec<FileEntry>, ArchiveError> {
        if !self.entries.iter().any(|e| e == FILES_ENTRY) {
            return Err(ArchiveError::MissingEntry(FILES_ENTRY.to_string()));
        }
        let xml = self.read_entry_string(FILES_ENTRY)?;
        let wrapper: FilesXml = quick_xml::de::from_str(&xml)?;
        Ok(wrapper.file)
    }

    /// Extract the full `install/` payload tree (and any `comar/`
    /// scripts) under `dest`, preserving relative layout.
    #[instrument(skip(self), fields(dest = %dest.display()))]
    pub fn extract_full(&mut self, dest: &Path) -> Result<(), ArchiveError> {
        std::fs::create_dir_all(dest).map_err(|e| io_err(dest, e))?;
        let names = self.entries.clone();
        for name in names {
            if name == METADATA_ENTRY || name == FILES_ENTRY {
                continue;
            }
            let rel = name
                .strip_prefix(INSTALL_PREFIX)
                .or_else(|| name.strip_prefix(COMAR_PREFIX))
                .unwrap_or(&name);
            if rel.is_empty() {
                continue;
            }
            let out_path = dest.join(rel);
            let mut entry = self.zip.by_name(&name)?;
            if entry.is_dir() {
                std::fs::create_dir_all(&out_path).map_err(|e| io_err(&out_path, e))?;
                continue;
            }
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
            let mut out = File::create(&out_path).map_err(|e| io_err(&out_path, e))?;
            std::io::copy(&mut entry, &mut out).map_err(|e| io_err(&out_path, e))?;
            debug!(entry = %name, "extracted");
        }
        Ok(())
    }

    /// Recompute the whole file's SHA-1 and compare against
    /// `expected_sha1` (hex-encoded, lowercase).
    pub fn verify(&self, expected_sha1: &str) -> Result<(), ArchiveError> {
        let mut file = File::open(&self.path).map_err(|e| io_err(&self.path, e))?;
        let mut hasher = Sha1::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf).map_err(|e| io_err(&self.path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let got = hex::encode(hasher.finalize());
        if got.eq_ignore_ascii_case(expected_sha1) {
            Ok(())
        } else {
            Err(ArchiveError::HashMismatch {
                expected: expected_sha1.to_string(),
                got,
            })
        }
    }
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename = "Files")]
struct FilesXml {
    #[serde(rename = "File", default)]
    file: Vec<FileEntry>,
}

/// Produces a package archive: `metadata.xml`, `files.xml` (path-sorted),
/// optional `comar/` scripts, then the `install/` payload tree, in that
/// order.
pub struct ArchiveWriter<W: Write + Seek> {
    zip: zip::ZipWriter<W>,
    options: zip::write::SimpleFileOptions,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self {
            zip: zip::ZipWriter::new(sink),
            options: zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated),
        }
    }

    /// Write `metadata.xml` and `files.xml` (sorted lexicographically by
    /// path for compression stability), then `comar_scripts` under
    /// `comar/`, then `payload_root`'s tree under `install/`.
    pub fn write_package(
        mut self,
        record: &PackageRecord,
        files: &[FileEntry],
        comar_scripts: &[(String, Vec<u8>)],
        payload_root: &Path,
    ) -> Result<(), ArchiveError> {
        let metadata_xml = quick_xml::se::to_string(record).map_err(ArchiveError::Xml)?;
        self.zip.start_file(METADATA_ENTRY, self.options)?;
        self.zip
            .write_all(metadata_xml.as_bytes())
            .map_err(|e| io_err(Path::new(METADATA_ENTRY), e))?;

        let mut sorted: Vec<&FileEntry> = files.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        let wrapper = FilesXml {
            file: sorted.into_iter().cloned().collect(),
        };
        let files_xml = quick_xml::se::to_string(&wrapper).map_err(ArchiveError::Xml)?;
        self.zip.start_file(FILES_ENTRY, self.options)?;
        self.zip
            .write_all(files_xml.as_bytes())
            .map_err(|e| io_err(Path::new(FILES_ENTRY), e))?;

        for (name, contents) in comar_scripts {
            self.zip
                .start_file(format!("{COMAR_PREFIX}{name}"), self.options)?;
            self.zip
                .write_all(contents)
                .map_err(|e| io_err(Path::new(name), e))?;
        }

        let mut entries: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in walkdir::WalkDir::new(payload_root)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() {
                let rel = entry
                    .path()
                    .strip_prefix(payload_root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                entries.insert(format!("{INSTALL_PREFIX}{rel}"), entry.path().to_path_buf());
            }
        }
        for (zip_path, real_path) in entries {
            self.zip.start_file(&zip_path, self.options)?;
            let mut f = File::open(&real_path).map_err(|e| io_err(&real_path, e))?;
            std::io::copy(&mut f, &mut self.zip).map_err(|e| io_err(&real_path, e))?;
        }

        self.zip.finish()?;
        Ok(())
    }
}

/// Classify whether a recorded file should be preserved across
/// reinstall/upgrade the way config files are: config files and
/// directories are permanent, everything else is replaceable.
#[must_use]
pub fn infer_permanent(kind: &FileKind) -> bool {
    matches!(kind, FileKind::Config | FileKind::Dir)
}
