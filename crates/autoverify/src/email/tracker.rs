//! Durable record of handled messages.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::StoreError;

/// The set of message keys already handled, backed by a JSON list on disk.
///
/// Entries are never removed. The file is loaded wholesale by [`load`] and
/// overwritten wholesale by [`persist`].
///
/// [`load`]: ProcessedSet::load
/// [`persist`]: ProcessedSet::persist
#[derive(Debug)]
pub struct ProcessedSet {
    path: PathBuf,
    ids: BTreeSet<String>,
    dirty: bool,
}

impl ProcessedSet {
    /// Loads the set from `path`. A missing file is an empty set; a file that
    /// is not a JSON list of strings is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let ids = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let list: Vec<String> =
                    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                list.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No processed set at {}, starting empty", path.display());
                BTreeSet::new()
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        info!(
            "Loaded {} processed message id(s) from {}",
            ids.len(),
            path.display()
        );

        Ok(Self {
            path,
            ids,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Adds an id; returns false if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let added = self.ids.insert(id.into());
        self.dirty |= added;
        added
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// True when ids were added since the last load or persist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Writes the set if it changed. Returns whether a write happened.
    ///
    /// The list is written to a sibling temp file and renamed over the
    /// target, so a crash mid-write leaves the previous list intact.
    pub fn persist(&mut self) -> Result<bool, StoreError> {
        if !self.dirty {
            return Ok(false);
        }

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let list: Vec<&String> = self.ids.iter().collect();
        let json = serde_json::to_string_pretty(&list)
            .map_err(|e| write_err(std::io::Error::other(e)))?;

        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, json).map_err(write_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(write_err)?;

        self.dirty = false;
        debug!(
            "Persisted {} processed message id(s) to {}",
            self.ids.len(),
            self.path.display()
        );
        Ok(true)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let set = ProcessedSet::load(dir.path().join("processed.json")).unwrap();
        assert!(set.is_empty());
        assert!(!set.is_dirty());
    }

    #[test]
    fn test_insert_marks_dirty_once() {
        let dir = TempDir::new().unwrap();
        let mut set = ProcessedSet::load(dir.path().join("processed.json")).unwrap();

        assert!(set.insert("100:1"));
        assert!(set.is_dirty());
        assert!(!set.insert("100:1"));
        assert_eq!(set.len(), 1);
        assert!(set.contains("100:1"));
    }

    #[test]
    fn test_persist_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed.json");

        let mut set = ProcessedSet::load(&path).unwrap();
        set.insert("100:3");
        set.insert("100:1");
        set.insert("mid:abc@netflix.com");
        assert!(set.persist().unwrap());
        assert!(!set.is_dirty());

        let reloaded = ProcessedSet::load(&path).unwrap();
        let ids: Vec<&str> = reloaded.iter().collect();
        assert_eq!(ids, vec!["100:1", "100:3", "mid:abc@netflix.com"]);
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn test_persist_skips_clean_set() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed.json");

        let mut set = ProcessedSet::load(&path).unwrap();
        assert!(!set.persist().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_reads_plain_json_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed.json");
        std::fs::write(&path, r#"["12", "15", "9"]"#).unwrap();

        let set = ProcessedSet::load(&path).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains("15"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed.json");
        std::fs::write(&path, "{ broken").unwrap();

        assert!(matches!(
            ProcessedSet::load(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_persist_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("processed.json");

        let mut set = ProcessedSet::load(&path).unwrap();
        set.insert("1:1");
        set.persist().unwrap();
        assert!(path.exists());
    }
}
