//! Immutable role registry and the atomic snapshot handle.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::models::{RegistryError, Role};

/// A validated, immutable collection of roles keyed by name.
///
/// Iteration order is the lexicographic order of role names, which keeps
/// every downstream computation deterministic.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: BTreeMap<String, Role>,
}

impl RoleRegistry {
    /// Builds a registry from a list of roles.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] on duplicate names, non-positive
    /// weights, or thresholds outside [0, 1].
    pub fn from_roles(roles: Vec<Role>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for role in roles {
            role.validate()?;
            if map.contains_key(&role.name) {
                return Err(RegistryError::DuplicateRole(role.name));
            }
            map.insert(role.name.clone(), role);
        }
        Ok(Self { roles: map })
    }

    /// Looks up a role by name.
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Iterates all roles in name order.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    /// Iterates only enabled roles in name order.
    pub fn enabled_roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values().filter(|r| r.enabled)
    }

    /// Number of registered roles (enabled or not).
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// True when no roles are registered.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Number of enabled roles.
    pub fn enabled_count(&self) -> usize {
        self.enabled_roles().count()
    }

    /// Names of all registered roles, in order.
    pub fn role_names(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }
}

/// Shared handle that hands out consistent registry snapshots.
///
/// Replacement is wholesale: [`swap`](Self::swap) installs a complete
/// new registry under the handle while cycles holding an older snapshot
/// continue unaffected.
#[derive(Debug)]
pub struct RegistryHandle {
    current: RwLock<Arc<RoleRegistry>>,
}

impl RegistryHandle {
    /// Wraps an initial registry.
    pub fn new(registry: RoleRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<RoleRegistry> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Atomically replaces the registry, returning the previous one.
    pub fn swap(&self, registry: RoleRegistry) -> Arc<RoleRegistry> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(registry))
    }
}
