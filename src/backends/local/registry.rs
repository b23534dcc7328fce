// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::CapabilityKey;
use crate::traits::Capability;

/// Capability implementations by key.
///
/// Held behind `Arc` so one registry can back several executors and worker
/// tasks at once.
///
/// ```rust
/// use the_taskwood::backends::local::CapabilityRegistry;
///
/// let registry = CapabilityRegistry::new();
/// assert!(registry.is_empty());
/// assert!(registry.get("shell").is_none());
/// ```
#[derive(Clone, Default)]
pub struct CapabilityRegistry(HashMap<CapabilityKey, Arc<dyn Capability>>);

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Registers `capability` under `key`, returning whatever it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<CapabilityKey>,
        capability: Arc<dyn Capability>,
    ) -> Option<Arc<dyn Capability>> {
        self.0.insert(key.into(), capability)
    }

    /// Builder-style [`CapabilityRegistry::insert`].
    pub fn with(mut self, key: impl Into<CapabilityKey>, capability: Arc<dyn Capability>) -> Self {
        self.insert(key, capability);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn Capability>> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.0.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<CapabilityKey, Arc<dyn Capability>>> for CapabilityRegistry {
    fn from(map: HashMap<CapabilityKey, Arc<dyn Capability>>) -> Self {
        Self(map)
    }
}
