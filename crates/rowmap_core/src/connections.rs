//! Named connection registry.
//!
//! Records reach their storage backend through a process-wide name →
//! backend map. The registry does no DSN parsing, pooling or driver
//! bootstrapping; callers construct a backend and register it under a
//! name. Handles serialize access with a mutex, one request at a time.

use crate::error::{CoreError, CoreResult};
use parking_lot::{Mutex, RwLock};
use rowmap_storage::StorageBackend;
use std::collections::HashMap;
use std::sync::Arc;

/// The connection name used when a model declares none.
pub const DEFAULT_CONNECTION_NAME: &str = "default";

/// A shared, lock-guarded storage backend.
pub type StorageHandle = Arc<Mutex<dyn StorageBackend>>;

static CONNECTIONS: RwLock<Option<HashMap<String, StorageHandle>>> = RwLock::new(None);

/// Registers a backend under a connection name, returning its handle.
///
/// Re-registering a name replaces the previous backend.
pub fn register(name: impl Into<String>, backend: impl StorageBackend + 'static) -> StorageHandle {
    let handle: StorageHandle = Arc::new(Mutex::new(backend));
    CONNECTIONS
        .write()
        .get_or_insert_with(HashMap::new)
        .insert(name.into(), Arc::clone(&handle));
    handle
}

/// Looks up the backend registered under a connection name.
///
/// # Errors
///
/// Returns [`CoreError::UnknownConnection`] for unregistered names.
pub fn storage(name: &str) -> CoreResult<StorageHandle> {
    CONNECTIONS
        .read()
        .as_ref()
        .and_then(|map| map.get(name))
        .map(Arc::clone)
        .ok_or_else(|| CoreError::UnknownConnection {
            connection: name.to_string(),
        })
}

/// Removes a connection from the registry.
///
/// Outstanding handles stay usable; only the name lookup is gone.
pub fn unregister(name: &str) {
    if let Some(map) = CONNECTIONS.write().as_mut() {
        map.remove(name);
    }
}
