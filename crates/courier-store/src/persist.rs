//! Load/save of the named JSON documents backing the store.
//!
//! I/O failure is non-fatal by contract: a missing or corrupt document loads
//! as the empty default, and a failed write is logged and swallowed. The
//! store keeps the state in memory and retries on a later flush.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Load a document, falling back to `T::default()` on any failure.
pub(crate) fn load_document<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return T::default();
    }
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt document, starting empty");
                T::default()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read document, starting empty");
            T::default()
        }
    }
}

/// Write pre-serialized JSON to a document. Returns whether the write
/// succeeded; failure is logged here and never raised to the caller.
pub(crate) fn write_document(path: &Path, json: &str) -> bool {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!(path = %path.display(), error = %e, "failed to create data directory");
            return false;
        }
    }
    match fs::write(path, json) {
        Ok(()) => {
            debug!(path = %path.display(), "document flushed");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to write document");
            false
        }
    }
}
