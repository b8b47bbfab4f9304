//! Displayable handles for the selected image.
//!
//! A presentation shell needs something it can point an image widget at.
//! Handles are acquired when an image is selected and released on drop, so
//! replacing or clearing the image never leaks the previous one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::ImageAsset;

#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    counter: AtomicU64,
    live: Mutex<HashMap<u64, ImageAsset>>,
}

impl RegistryInner {
    fn live(&self) -> std::sync::MutexGuard<'_, HashMap<u64, ImageAsset>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, image: &ImageAsset) -> PreviewHandle {
        let id = self.inner.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.live().insert(id, image.clone());
        PreviewHandle {
            id,
            name: image.name().to_string(),
            registry: Arc::clone(&self.inner),
        }
    }

    /// Look up the image behind a preview URI produced by [`PreviewHandle::uri`].
    pub fn resolve(&self, uri: &str) -> Option<ImageAsset> {
        let id = uri
            .strip_prefix("preview://")?
            .split('/')
            .next()?
            .parse::<u64>()
            .ok()?;
        self.inner.live().get(&id).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.inner.live().len()
    }
}

/// Scoped preview of one image; released when dropped.
pub struct PreviewHandle {
    id: u64,
    name: String,
    registry: Arc<RegistryInner>,
}

impl PreviewHandle {
    pub fn uri(&self) -> String {
        format!("preview://{}/{}", self.id, self.name)
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.uri()).finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.live().remove(&self.id);
    }
}
