/// Asset registry and resume set
///
/// Both live behind the engine's state lock; nothing in here locks on its
/// own except to read asset ids through [`SharedAsset`].
use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::asset::Asset;
use crate::error::{EngineError, EngineResult};

/// Asset shared between the registry, the resume set and in-flight operations
pub type SharedAsset = Arc<Mutex<Asset>>;

/// Mapping from caller id to asset, in registration order
#[derive(Default)]
pub struct AssetRegistry {
    assets: IndexMap<String, SharedAsset>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset under a new id
    pub fn register(&mut self, id: &str, asset: Asset) -> EngineResult<SharedAsset> {
        if self.assets.contains_key(id) {
            return Err(EngineError::DuplicateId(id.to_string()));
        }

        let shared = Arc::new(Mutex::new(asset));
        self.assets.insert(id.to_string(), Arc::clone(&shared));
        Ok(shared)
    }

    pub fn lookup(&self, id: &str) -> EngineResult<SharedAsset> {
        self.assets
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// Remove an asset, keeping the order of the remaining ones
    pub fn remove(&mut self, id: &str) -> EngineResult<SharedAsset> {
        self.assets
            .shift_remove(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SharedAsset)> {
        self.assets.iter().map(|(id, asset)| (id.as_str(), asset))
    }
}

/// Assets paused while playing, waiting to be resumed together
#[derive(Default)]
pub struct ResumeSet {
    queue: VecDeque<(String, SharedAsset)>,
}

impl ResumeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an asset unless it is already queued; returns whether it was added
    pub fn push(&mut self, id: &str, asset: &SharedAsset) -> bool {
        if self.queue.iter().any(|(_, queued)| Arc::ptr_eq(queued, asset)) {
            return false;
        }
        self.queue.push_back((id.to_string(), Arc::clone(asset)));
        true
    }

    /// Take every queued asset, oldest first
    pub fn drain(&mut self) -> Vec<(String, SharedAsset)> {
        self.queue.drain(..).collect()
    }

    /// Forget an asset (used on unload)
    pub fn remove(&mut self, asset: &SharedAsset) {
        self.queue.retain(|(_, queued)| !Arc::ptr_eq(queued, asset));
    }

    pub fn ids(&self) -> Vec<String> {
        self.queue.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
