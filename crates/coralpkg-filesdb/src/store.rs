//! On-disk format for the path-ownership index: a single file holding a
//! version header followed by `(digest, package name)` records. Generalized
//! from the donor's layered `l1`/`l2`/tiered cache (same versioned-header,
//! rebuild-on-mismatch shape) down to one flat map, since an ownership
//! index has no eviction policy to apply.

use crate::error::FilesDbError;
use ahash::AHashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"CFDB";
pub const FORMAT_VERSION: u32 = 1;

pub struct Store {
    pub entries: AHashMap<[u8; 16], String>,
}

impl Store {
    pub fn empty() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }

    /// Reads the store file, returning `Ok(None)` if it doesn't exist and
    /// `Err(NeedsRebuild)` if the header is missing or the version doesn't
    /// match [`FORMAT_VERSION`].
    pub fn load(path: &Path) -> Result<Option<Self>, FilesDbError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FilesDbError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        let mut version_buf = [0u8; 4];
        let read_header = reader.read_exact(&mut magic).is_ok() && &magic == MAGIC
            && reader.read_exact(&mut version_buf).is_ok();
        if !read_header {
            return Err(FilesDbError::NeedsRebuild(path.to_path_buf()));
        }
        let version = u32::from_le_bytes(version_buf);
        if version != FORMAT_VERSION {
            return Err(FilesDbError::NeedsRebuild(path.to_path_buf()));
        }

        let mut entries = AHashMap::new();
        loop {
            let mut digest = [0u8; 16];
            match reader.read_exact(&mut digest) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    return Err(FilesDbError::Io {
                        path: path.to_path_buf(),
                        source: e,
                    })
                }
            }
            let mut len_buf = [0u8; 2];
            reader
                .read_exact(&mut len_buf)
                .map_err(|_| FilesDbError::Corrupt(path.to_path_buf()))?;
            let len = u16::from_le_bytes(len_buf) as usize;
            let mut name_buf = vec![0u8; len];
            reader
                .read_exact(&mut name_buf)
                .map_err(|_| FilesDbError::Corrupt(path.to_path_buf()))?;
            let name = String::from_utf8(name_buf)
                .map_err(|_| FilesDbError::Corrupt(path.to_path_buf()))?;
            entries.insert(digest, name);
        }

        Ok(Some(Self { entries }))
    }

    /// Writes the store to a fresh temp file in the same directory, `fsync`s
    /// it, then renames it over `path`. The version header is written and
    /// flushed before any entry, so a half-written file never parses as a
    /// different, plausible-looking version.
    pub fn persist(&self, path: &Path) -> Result<(), FilesDbError> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| FilesDbError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
        let tmp_path: PathBuf = path.with_extension("tmp");
        {
            let file = File::create(&tmp_path).map_err(|e| FilesDbError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
            let mut writer = BufWriter::new(file);
            let write_all = |w: &mut BufWriter<File>, buf: &[u8]| {
                w.write_all(buf).map_err(|e| FilesDbError::Io {
                    path: tmp_path.clone(),
                    source: e,
                })
            };
            write_all(&mut writer, MAGIC)?;
            write_all(&mut writer, &FORMAT_VERSION.to_le_bytes())?;
            writer.flush().map_err(|e| FilesDbError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
            for (digest, name) in &self.entries {
                let len = u16::try_from(name.len()).unwrap_or(u16::MAX);
                write_all(&mut writer, digest)?;
                write_all(&mut writer, &len.to_le_bytes())?;
                write_all(&mut writer, &name.as_bytes()[..len as usize])?;
            }
            writer.flush().map_err(|e| FilesDbError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
            writer
                .get_ref()
                .sync_all()
                .map_err(|e| FilesDbError::Io {
                    path: tmp_path.clone(),
                    source: e,
                })?;
        }
        fs::rename(&tmp_path, path).map_err(|e| FilesDbError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}
