// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Directory-backed artifact store with atomic writes

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::{validate_key, ArtifactStore};
use crate::errors::StoreError;

/// Suffix of in-flight temp files; never listed as artifacts.
const TEMP_SUFFIX: &str = ".tmp";

/// Artifact store writing one JSON file per key into a directory
///
/// Writes go to `{key}.tmp` and are renamed into place, so a reader never
/// observes a partially written artifact. The directory is created on the
/// first write. Writes from one process are serialized by an internal lock;
/// sharing a directory between concurrently running processes is not
/// supported.
///
/// # Examples
///
/// ```rust,ignore
/// use walletscan::store::DiskArtifactStore;
///
/// let store = DiskArtifactStore::new("data");
/// ```
#[derive(Debug)]
pub struct DiskArtifactStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DiskArtifactStore {
    /// Creates a store rooted at `dir`. Nothing is touched until the first
    /// operation.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl ArtifactStore for DiskArtifactStore {
    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(path.display().to_string(), e))
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path.display().to_string(), e)),
        };

        trace!(key = key, bytes = bytes.len(), "Read artifact");
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::serialization(key, e))
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::serialization(key, e))?;

        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(self.dir.display().to_string(), e))?;

        let temp_path = self.dir.join(format!("{key}{TEMP_SUFFIX}"));
        tokio::fs::write(&temp_path, &json)
            .await
            .map_err(|e| StoreError::io(temp_path.display().to_string(), e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StoreError::io(path.display().to_string(), e))?;

        debug!(key = key, bytes = json.len(), "Wrote artifact");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = key, "Removed artifact");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path.display().to_string(), e)),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let dir_str = self.dir.display().to_string();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(dir_str, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(dir_str.clone(), e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".json") {
                    keys.push(name.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "DiskArtifactStore"
    }
}
