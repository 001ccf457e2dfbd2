//! Named retry policies.
//!
//! Call sites that talk to the same provider usually share one policy. A
//! [`PolicyRegistry`] keeps them by name ("text-generation", "webhook", ...)
//! so the parameters live in configuration rather than at every call. A
//! process-wide registry is available through the `*_global_policy`
//! functions.

use crate::RetryPolicy;
use std::sync::{OnceLock, PoisonError, RwLock};

/// In-memory registry for named [`RetryPolicy`] values.
///
/// Lookups are linear; registries hold a handful of entries.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    entries: Vec<(String, RetryPolicy)>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a policy under the given name.
    ///
    /// Returns the previously registered policy if one existed.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        policy: RetryPolicy,
    ) -> Option<RetryPolicy> {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, policy)),
            None => {
                self.entries.push((name, policy));
                None
            }
        }
    }

    /// Retrieve a policy by name.
    pub fn get(&self, name: &str) -> Option<RetryPolicy> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, policy)| *policy)
    }

    /// Remove a policy by name, returning it when it existed.
    pub fn remove(&mut self, name: &str) -> Option<RetryPolicy> {
        let index = self
            .entries
            .iter()
            .position(|(existing, _)| existing == name)?;
        Some(self.entries.swap_remove(index).1)
    }

    /// All registered `(name, policy)` pairs.
    pub fn all(&self) -> Vec<(String, RetryPolicy)> {
        self.entries.clone()
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear the registry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn global_registry() -> &'static RwLock<PolicyRegistry> {
    static GLOBAL_POLICIES: OnceLock<RwLock<PolicyRegistry>> = OnceLock::new();
    GLOBAL_POLICIES.get_or_init(|| RwLock::new(PolicyRegistry::new()))
}

/// Register a policy in the global registry.
pub fn register_global_policy(name: impl Into<String>, policy: RetryPolicy) -> Option<RetryPolicy> {
    global_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, policy)
}

/// Fetch a policy from the global registry.
pub fn get_global_policy(name: &str) -> Option<RetryPolicy> {
    global_registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
}

/// Remove a policy from the global registry.
pub fn remove_global_policy(name: &str) -> Option<RetryPolicy> {
    global_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(name)
}

/// List all policies in the global registry.
pub fn list_global_policies() -> Vec<(String, RetryPolicy)> {
    global_registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .all()
}

/// Clear the global registry.
pub fn clear_global_policies() {
    global_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
