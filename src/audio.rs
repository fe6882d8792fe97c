//! Revocable audio handles.
//!
//! A generated clip lives in the [`AudioStore`] for exactly as long as its
//! [`AudioHandle`] is alive. The view plays it through the handle's URL;
//! dropping the handle revokes the URL.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

#[derive(Clone)]
pub struct StoredAudio {
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, StoredAudio>>,
}

/// Registry of live audio clips, keyed by handle id.
#[derive(Clone, Default)]
pub struct AudioStore {
    inner: Arc<Inner>,
}

impl AudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `data` and returns the handle that owns it.
    pub fn create(&self, data: Bytes, content_type: Option<String>) -> AudioHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let content_type = content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let len = data.len();

        self.inner.entries.lock().insert(
            id,
            StoredAudio {
                content_type,
                data,
            },
        );
        debug!(id, bytes = len, "audio handle created");

        AudioHandle {
            id,
            size: len,
            store: self.clone(),
        }
    }

    pub fn get(&self, id: u64) -> Option<StoredAudio> {
        self.inner.entries.lock().get(&id).cloned()
    }

    pub fn is_live(&self, id: u64) -> bool {
        self.inner.entries.lock().contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.inner.entries.lock().len()
    }

    fn revoke(&self, id: u64) {
        if self.inner.entries.lock().remove(&id).is_some() {
            debug!(id, "audio handle revoked");
        }
    }
}

/// Exclusive owner of one generated clip. Not `Clone`: there is only ever one
/// owner, and dropping it releases the clip.
pub struct AudioHandle {
    id: u64,
    size: usize,
    store: AudioStore,
}

impl AudioHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> String {
        format!("/audio/{}", self.id)
    }

    pub fn size_bytes(&self) -> usize {
        self.size
    }
}

impl fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioHandle")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        self.store.revoke(self.id);
    }
}
