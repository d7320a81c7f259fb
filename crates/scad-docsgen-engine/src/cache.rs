//! Per-source content hashes, persisted between runs to skip unchanged files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::DocsGenError;
use crate::model::Origin;
use crate::report::ErrorLog;

pub const HASH_FILE: &str = ".source_hashes";
const CHUNK_SIZE: usize = 128 * 1024;

/// Table of `source path -> hex sha256`, stored as `path|hash` lines.
#[derive(Debug, Default)]
pub struct FileHashes {
    store: PathBuf,
    previous: BTreeMap<String, String>,
    current: BTreeMap<String, String>,
}

impl FileHashes {
    /// Reads `store`. A missing file is an empty table; a malformed one is
    /// logged as a warning and discarded whole.
    pub fn load(store: impl Into<PathBuf>, log: &mut ErrorLog) -> Self {
        let store = store.into();
        let previous = match Self::read_table(&store) {
            Ok(table) => table,
            Err(err) => {
                log.record(&Origin::new(store.display().to_string(), 0), &err);
                BTreeMap::new()
            }
        };
        Self {
            store,
            current: previous.clone(),
            previous,
        }
    }

    fn read_table(store: &Path) -> Result<BTreeMap<String, String>, DocsGenError> {
        let text = match std::fs::read_to_string(store) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        let mut table = BTreeMap::new();
        for (idx, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('|').collect();
            let &[path, hash] = fields.as_slice() else {
                return Err(DocsGenError::CacheCorruption {
                    path: store.to_path_buf(),
                    detail: format!("line {} is not a `path|hash` record", idx + 1),
                });
            };
            table.insert(path.to_string(), hash.to_string());
        }
        Ok(table)
    }

    /// Hex sha256 of the file's contents, read in chunks. Unreadable files
    /// hash as empty.
    pub fn hash_file(path: &Path) -> String {
        let mut hasher = Sha256::new();
        if let Ok(mut file) = File::open(path) {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match file.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => hasher.update(&buf[..n]),
                    Err(err) => {
                        log::warn!("Could not read {}: {err}", path.display());
                        break;
                    }
                }
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Records the file's current hash and reports whether it differs from
    /// the previous run's. Unknown paths are stale.
    pub fn is_stale(&mut self, path: &str) -> bool {
        let hash = Self::hash_file(Path::new(path));
        let stale = self.previous.get(path) != Some(&hash);
        self.current.insert(path.to_string(), hash);
        stale
    }

    /// Forgets `path`, so the next run treats it as stale.
    pub fn invalidate(&mut self, path: &str) {
        log::debug!("Invalidating cached hash of {path}");
        self.current.remove(path);
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.current.get(path).map(String::as_str)
    }

    pub fn store(&self) -> &Path {
        &self.store
    }

    /// Writes the table, replacing the store atomically.
    pub fn commit(&self) -> Result<(), DocsGenError> {
        let dir = self
            .store
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        for (path, hash) in &self.current {
            writeln!(tmp, "{path}|{hash}")?;
        }
        tmp.flush()?;
        tmp.persist(&self.store).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, String, PathBuf) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("shapes.scad");
        std::fs::write(&src, "// LibFile: shapes.scad\n").unwrap();
        let store = dir.path().join(HASH_FILE);
        (dir, src.display().to_string(), store)
    }

    #[test]
    fn unknown_files_are_stale_until_committed() {
        let (_dir, src, store) = fixture();
        let mut log = ErrorLog::new();

        let mut hashes = FileHashes::load(&store, &mut log);
        assert!(hashes.is_stale(&src));
        hashes.commit().unwrap();

        let mut hashes = FileHashes::load(&store, &mut log);
        assert!(!hashes.is_stale(&src));
        assert!(log.entries().is_empty());
    }

    #[test]
    fn edited_files_are_stale() {
        let (_dir, src, store) = fixture();
        let mut log = ErrorLog::new();
        let mut hashes = FileHashes::load(&store, &mut log);
        hashes.is_stale(&src);
        hashes.commit().unwrap();

        std::fs::write(&src, "// LibFile: shapes.scad\n// Section: Cubes\n").unwrap();

        assert!(FileHashes::load(&store, &mut log).is_stale(&src));
    }

    #[test]
    fn invalidated_entry_is_stale_next_run() {
        let (_dir, src, store) = fixture();
        let mut log = ErrorLog::new();
        let mut hashes = FileHashes::load(&store, &mut log);
        hashes.is_stale(&src);
        hashes.commit().unwrap();

        let mut hashes = FileHashes::load(&store, &mut log);
        assert!(!hashes.is_stale(&src));
        hashes.invalidate(&src);
        hashes.commit().unwrap();

        assert!(FileHashes::load(&store, &mut log).is_stale(&src));
    }

    #[test]
    fn store_format_is_path_pipe_hash() {
        let (_dir, src, store) = fixture();
        let mut log = ErrorLog::new();
        let mut hashes = FileHashes::load(&store, &mut log);
        hashes.is_stale(&src);
        hashes.commit().unwrap();

        let text = std::fs::read_to_string(&store).unwrap();
        let (path, hash) = text.trim_end().split_once('|').unwrap();
        assert_eq!(path, src);
        assert_eq!(hash.len(), 64);
        assert_eq!(Some(hash), hashes.get(&src));
    }

    #[test]
    fn corrupt_store_is_a_warning_and_rebuilt() {
        let (_dir, src, store) = fixture();
        let hash = FileHashes::hash_file(Path::new(&src));
        std::fs::write(&store, format!("{src}|{hash}\ngarbage line\n")).unwrap();
        let mut log = ErrorLog::new();

        let mut hashes = FileHashes::load(&store, &mut log);

        assert!(hashes.is_stale(&src));
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].severity, Severity::Warning);
        assert!(log.entries()[0].message.starts_with("Corrupt hashes file"));
        assert!(!log.has_errors());
    }

    #[test]
    fn missing_source_hashes_as_empty() {
        assert_eq!(
            FileHashes::hash_file(Path::new("/nonexistent/file.scad")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
