// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! JSON-file error ledger with atomic rewrites

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{ErrorLedger, LedgerDocument, LedgerEntry};
use crate::errors::LedgerError;

/// Default ledger file name inside the data directory.
pub const DEFAULT_LEDGER_FILE: &str = "errors.json";

/// Error ledger persisted as `{ "errors": [...] }`.
///
/// Each [`record`](ErrorLedger::record) reads the current document, appends the
/// entry and rewrites the file through a temp file and rename, so readers never
/// observe a half-written ledger. A missing or unparseable file reads as an
/// empty ledger. Before the next record starts a new file, an unparseable one
/// is renamed to `errors.json.corrupt-<timestamp>` so its contents survive.
///
/// Writes from one process are serialized by an internal lock; sharing one
/// ledger file between processes is not supported.
#[derive(Debug)]
pub struct FileErrorLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileErrorLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Ledger at `errors.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_LEDGER_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the ledger. With `set_aside_corrupt`, an unparseable file is
    /// moved out of the way instead of being left for the next write.
    async fn load(&self, set_aside_corrupt: bool) -> Result<LedgerDocument, LedgerError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LedgerDocument::default())
            }
            Err(e) => return Err(LedgerError::io(self.path.display().to_string(), e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(doc) => Ok(doc),
            Err(e) if set_aside_corrupt => {
                let aside = self.corrupt_path();
                tokio::fs::rename(&self.path, &aside)
                    .await
                    .map_err(|e| LedgerError::io(aside.display().to_string(), e))?;
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "Failed to parse error ledger, starting a new one"
                );
                Ok(LedgerDocument::default())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to parse error ledger");
                Ok(LedgerDocument::default())
            }
        }
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| DEFAULT_LEDGER_FILE.into());
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
        self.path.with_file_name(name)
    }

    async fn save(&self, doc: &LedgerDocument) -> Result<(), LedgerError> {
        let json = serde_json::to_vec_pretty(doc)?;
        let path_str = self.path.display().to_string();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LedgerError::io(parent.display().to_string(), e))?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &json)
            .await
            .map_err(|e| LedgerError::io(temp_path.display().to_string(), e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| LedgerError::io(path_str, e))?;
        Ok(())
    }
}

#[async_trait]
impl ErrorLedger for FileErrorLedger {
    async fn record(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load(true).await?;
        doc.errors.push(entry);
        self.save(&doc).await?;
        debug!(path = %self.path.display(), entries = doc.errors.len(), "Recorded ledger entry");
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.load(false).await?.errors)
    }

    fn name(&self) -> &'static str {
        "FileErrorLedger"
    }
}
