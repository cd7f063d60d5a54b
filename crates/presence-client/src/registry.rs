//! Explicit transport-handle registry.
//!
//! Rather than caching client instances in ambient global singletons,
//! the cache is an explicit value owned by the composition root and
//! passed by reference to whoever needs a handle. The key is the
//! deterministic
//! [`TransportKey`](crate::TransportKey) tuple: equal keys share one
//! handle.

use std::collections::HashMap;
use std::sync::Arc;

use crate::transport::TransportKey;

/// Handle cache keyed by [`TransportKey`].
///
/// Handles are stored behind [`Arc`] so that callers can hold a handle
/// across a `remove` without invalidating it; the underlying connection
/// closes when the last clone drops.
#[derive(Debug)]
pub struct Registry<T> {
    handles: HashMap<TransportKey, Arc<T>>,
}

impl<T> Registry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Look up the handle for a key.
    pub fn get(&self, key: &TransportKey) -> Option<Arc<T>> {
        self.handles.get(key).cloned()
    }

    /// Insert a handle, returning the shared reference.
    ///
    /// Replaces any existing handle under the same key; connections are
    /// opened asynchronously by the caller, so check [`get`](Self::get)
    /// first to reuse an existing one.
    pub fn insert(&mut self, key: TransportKey, transport: T) -> Arc<T> {
        let shared = Arc::new(transport);
        self.handles.insert(key, Arc::clone(&shared));
        shared
    }

    /// Look up or create a handle with a synchronous factory.
    pub fn get_or_insert_with(
        &mut self,
        key: TransportKey,
        create: impl FnOnce() -> T,
    ) -> Arc<T> {
        Arc::clone(
            self.handles
                .entry(key)
                .or_insert_with(|| Arc::new(create())),
        )
    }

    /// Drop the handle for a key. Returns it if one was registered.
    pub fn remove(&mut self, key: &TransportKey) -> Option<Arc<T>> {
        self.handles.remove(key)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the registry holds no handles.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
