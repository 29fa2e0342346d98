//! Shared cache of parsed archive handles.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

use crate::error::Result;
use crate::zip::ArchiveHandle;

/// Cache key: backing identity plus the archive's absolute root offset.
pub type ArchiveKey = (String, u64);

/// Concurrent map of parsed archives keyed by `(backing, root offset)`.
///
/// Parsing happens outside the lock. When two callers race on the same
/// key both may parse, but only the first insert is kept and both get
/// that handle back.
#[derive(Default)]
pub struct ArchiveCache {
    handles: RwLock<HashMap<ArchiveKey, Arc<ArchiveHandle>>>,
}

impl ArchiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ArchiveKey) -> Option<Arc<ArchiveHandle>> {
        let handles = self.handles.read().unwrap_or_else(|e| e.into_inner());
        handles.get(key).cloned()
    }

    /// Return the cached handle for `key`, opening it with `open` if absent.
    pub fn get_or_try_insert<F>(&self, key: ArchiveKey, open: F) -> Result<Arc<ArchiveHandle>>
    where
        F: FnOnce() -> Result<ArchiveHandle>,
    {
        if let Some(handle) = self.get(&key) {
            trace!(backing = %key.0, offset = key.1, "archive cache hit");
            return Ok(handle);
        }

        let opened = Arc::new(open()?);
        let mut handles = self.handles.write().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(handles.entry(key).or_insert(opened)))
    }

    /// Drop one handle; readers holding it keep it alive.
    pub fn evict(&self, key: &ArchiveKey) -> Option<Arc<ArchiveHandle>> {
        let mut handles = self.handles.write().unwrap_or_else(|e| e.into_inner());
        handles.remove(key)
    }

    /// Drop every handle parsed from the backing named `identity`.
    pub fn evict_backing(&self, identity: &str) -> usize {
        let mut handles = self.handles.write().unwrap_or_else(|e| e.into_inner());
        let before = handles.len();
        handles.retain(|(backing, _), _| backing != identity);
        let evicted = before - handles.len();
        trace!(backing = identity, evicted, "evicted archives of backing");
        evicted
    }

    pub fn clear(&self) {
        let mut handles = self.handles.write().unwrap_or_else(|e| e.into_inner());
        handles.clear();
    }

    pub fn len(&self) -> usize {
        let handles = self.handles.read().unwrap_or_else(|e| e.into_inner());
        handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
