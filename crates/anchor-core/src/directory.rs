// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared anchor directory: the key-value service anchors are published to.
//!
//! Records are keyed by cloud anchor id and carry the fields
//! `hosted_anchor_id`, `anchor_description` and `updated_at_timestamp`
//! (epoch milliseconds). Listing is lossy by contract: failures yield an
//! empty list and malformed entries are skipped.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DirectoryError;
use crate::ids::CloudAnchorId;
use crate::model::UnresolvedAnchorDescriptor;

/// One published anchor as written to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Cloud anchor id (also the record key).
    pub hosted_anchor_id: String,
    /// User-supplied description.
    pub anchor_description: String,
    /// Write time, epoch milliseconds.
    pub updated_at_timestamp: u64,
}

impl DirectoryRecord {
    /// Record stamped with the current wall-clock time.
    pub fn stamped_now(cloud_anchor_id: &CloudAnchorId, description: &str) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        Self {
            hosted_anchor_id: cloud_anchor_id.as_str().to_owned(),
            anchor_description: description.to_owned(),
            updated_at_timestamp: millis,
        }
    }
}

/// Listing shape: any field may be missing in the wild.
#[derive(Debug, Default, Deserialize)]
struct ListedEntry {
    hosted_anchor_id: Option<String>,
    anchor_description: Option<String>,
}

impl ListedEntry {
    fn into_descriptor(self) -> Option<UnresolvedAnchorDescriptor> {
        Some(UnresolvedAnchorDescriptor::new(
            self.hosted_anchor_id?,
            self.anchor_description?,
        ))
    }
}

/// Turns raw directory values into descriptors, skipping incomplete entries.
pub fn descriptors_from_values<'a>(
    values: impl IntoIterator<Item = &'a serde_json::Value>,
) -> Vec<UnresolvedAnchorDescriptor> {
    values
        .into_iter()
        .filter_map(|value| match ListedEntry::deserialize(value) {
            Ok(entry) => entry.into_descriptor(),
            Err(err) => {
                debug!(%err, "skipping malformed directory entry");
                None
            }
        })
        .collect()
}

/// One-shot listing callback.
pub type ListCallback = Box<dyn FnOnce(Vec<UnresolvedAnchorDescriptor>) + Send>;

/// Port to the shared anchor directory.
pub trait AnchorDirectory: Send + Sync {
    /// Write (or overwrite) the record keyed by its `hosted_anchor_id`.
    fn store(&self, record: DirectoryRecord) -> Result<(), DirectoryError>;
    /// Deliver every complete `{id, description}` pair exactly once; an empty
    /// list on failure.
    fn fetch_all(&self, on_complete: ListCallback);
}

#[derive(Debug, Default)]
struct MemoryDirectoryInner {
    entries: BTreeMap<String, serde_json::Value>,
    offline: bool,
    writes: usize,
}

/// In-process directory, ordered by key. Serves hosts without a backend and
/// doubles as the reference implementation of the listing contract.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    inner: Mutex<MemoryDirectoryInner>,
}

impl MemoryDirectory {
    /// Empty, online directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw entry as another client might have written it.
    pub fn insert_raw(&self, key: impl Into<String>, value: serde_json::Value) {
        self.lock().entries.insert(key.into(), value);
    }

    /// Simulate connectivity loss: writes fail, listings come back empty.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Record stored under `cloud_anchor_id`, if complete.
    pub fn record(&self, cloud_anchor_id: &str) -> Option<DirectoryRecord> {
        let inner = self.lock();
        let value = inner.entries.get(cloud_anchor_id)?;
        DirectoryRecord::deserialize(value).ok()
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryDirectoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AnchorDirectory for MemoryDirectory {
    fn store(&self, record: DirectoryRecord) -> Result<(), DirectoryError> {
        let value =
            serde_json::to_value(&record).map_err(|e| DirectoryError::Encode(e.to_string()))?;
        let mut inner = self.lock();
        if inner.offline {
            return Err(DirectoryError::Unavailable("offline".into()));
        }
        inner.entries.insert(record.hosted_anchor_id, value);
        inner.writes += 1;
        Ok(())
    }

    fn fetch_all(&self, on_complete: ListCallback) {
        let listed = {
            let inner = self.lock();
            if inner.offline {
                warn!("directory offline; listing as empty");
                Vec::new()
            } else {
                descriptors_from_values(inner.entries.values())
            }
        };
        on_complete(listed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_skips_incomplete_entries() {
        let values = [
            json!({"hosted_anchor_id": "A1", "anchor_description": "Kitchen table"}),
            json!({"hosted_anchor_id": "A2"}),
            json!({"anchor_description": "orphan"}),
            json!("not an object"),
        ];
        let listed = descriptors_from_values(&values);
        assert_eq!(listed, vec![UnresolvedAnchorDescriptor::new("A1", "Kitchen table")]);
    }

    #[test]
    fn offline_directory_lists_empty_and_rejects_writes() {
        let dir = MemoryDirectory::new();
        dir.insert_raw("A1", json!({"hosted_anchor_id": "A1", "anchor_description": "x"}));
        dir.set_offline(true);
        let record = DirectoryRecord::stamped_now(&"B1".into(), "y");
        assert!(matches!(dir.store(record), Err(DirectoryError::Unavailable(_))));
        let (tx, rx) = std::sync::mpsc::channel();
        dir.fetch_all(Box::new(move |list| {
            let _ = tx.send(list.len());
        }));
        assert_eq!(rx.recv().ok(), Some(0));
        assert_eq!(dir.write_count(), 0);
    }
}
