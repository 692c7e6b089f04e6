//! Object-URL style handles for exported blobs.
//!
//! A blob is registered under a `blob:` URL that can be fetched until the
//! returned [`ObjectUrl`] is dropped, at which point the entry is revoked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const URL_PREFIX: &str = "blob:shotframe/";

#[derive(Debug, Clone)]
struct Blob {
    mime: String,
    data: Arc<Vec<u8>>,
}

/// Shared table of live blobs.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    entries: Arc<Mutex<HashMap<u64, Blob>>>,
    next_id: Arc<AtomicU64>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_object_url(&self, mime: &str, data: Vec<u8>) -> ObjectUrl {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                id,
                Blob {
                    mime: mime.to_string(),
                    data: Arc::new(data),
                },
            );
        }
        ObjectUrl {
            id,
            url: format!("{URL_PREFIX}{id}"),
            registry: self.clone(),
        }
    }

    /// Fetch a live blob by URL: `(mime, bytes)`.
    pub fn fetch(&self, url: &str) -> Option<(String, Arc<Vec<u8>>)> {
        let id: u64 = url.strip_prefix(URL_PREFIX)?.parse().ok()?;
        let entries = self.entries.lock().ok()?;
        entries.get(&id).map(|b| (b.mime.clone(), b.data.clone()))
    }

    /// Number of URLs not yet revoked.
    pub fn live_count(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    fn revoke(&self, id: u64) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(&id).is_some() {
                log::trace!("revoked {URL_PREFIX}{id}");
            }
        }
    }
}

/// A live blob URL. Revoked on drop.
#[derive(Debug)]
pub struct ObjectUrl {
    id: u64,
    url: String,
    registry: BlobRegistry,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(self.id);
    }
}
