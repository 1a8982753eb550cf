//! Wide-column table access
//!
//! The core only ever reads from the store. [`RowTable`] is the seam: a
//! production deployment plugs in a client for its wide-column service, tests
//! and the CLI use [`MemoryTable`].

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::keys::RowKey;
use crate::types::{MixerError, Result};

/// Batched keyed read against one tier of the store
#[async_trait]
pub trait RowTable: Send + Sync {
    /// Read the given keys in one batch.
    ///
    /// Returns raw payloads keyed by full row key. Rows missing from the
    /// table are omitted; that is not an error.
    async fn read_rows(&self, keys: &[RowKey]) -> Result<HashMap<String, Vec<u8>>>;

    /// Table name for logging
    fn name(&self) -> &str;
}

/// In-memory table backed by DashMap
pub struct MemoryTable {
    name: String,
    rows: DashMap<String, Vec<u8>>,
}

impl MemoryTable {
    /// Create an empty table
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: DashMap::new(),
        }
    }

    /// Store a raw payload under `key`
    pub fn insert(&self, key: &str, payload: Vec<u8>) {
        self.rows.insert(key.to_string(), payload);
    }

    /// Serialize `value` as JSON and store it under `key`
    pub fn insert_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.insert(key, payload);
        Ok(())
    }

    /// Load a snapshot file: a JSON object mapping row key to row payload
    pub async fn from_json_file(name: &str, path: &Path) -> Result<Self> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            MixerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let rows: HashMap<String, serde_json::Value> = serde_json::from_slice(&raw)
            .map_err(|e| MixerError::Config(format!("Invalid snapshot {}: {}", path.display(), e)))?;

        let table = Self::new(name);
        for (key, value) in &rows {
            table.insert_json(key, value)?;
        }
        info!(table = name, rows = table.len(), path = %path.display(), "Snapshot loaded");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RowTable for MemoryTable {
    async fn read_rows(&self, keys: &[RowKey]) -> Result<HashMap<String, Vec<u8>>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(row) = self.rows.get(key.as_str()) {
                found.insert(key.as_str().to_string(), row.value().clone());
            }
        }
        debug!(
            table = %self.name,
            requested = keys.len(),
            found = found.len(),
            "Batch read"
        );
        Ok(found)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
