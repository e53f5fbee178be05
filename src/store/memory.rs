// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory artifact store

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{validate_key, ArtifactStore};
use crate::errors::StoreError;

/// Artifact store backed by a sorted map; contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<BTreeMap<String, Value>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub async fn len(&self) -> usize {
        self.artifacts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.lock().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        Ok(self.artifacts.lock().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        validate_key(key)?;
        Ok(self.artifacts.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        validate_key(key)?;
        self.artifacts
            .lock()
            .await
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        Ok(self.artifacts.lock().await.remove(key).is_some())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.artifacts.lock().await.keys().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "MemoryArtifactStore"
    }
}
