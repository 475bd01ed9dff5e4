//! # Role Registry
//!
//! Static mapping of role name to backend binding, priority weight, and
//! confidence threshold, consumed read-only during a council cycle.
//!
//! ## Snapshot Semantics
//!
//! A council cycle must always see one consistent registry. The registry
//! is therefore an immutable value behind an [`Arc`](std::sync::Arc):
//! reconfiguration builds a complete new [`RoleRegistry`] and swaps the
//! pointer via [`RegistryHandle::swap`]. Cycles already in flight keep
//! the snapshot they captured at start and are never affected by a swap.
//!
//! ```text
//!                 ┌────────────────────┐
//!                 │   RegistryHandle   │──swap──▶ Arc<RoleRegistry> (v2)
//!                 └─────────┬──────────┘
//!                           │ snapshot()
//!                           ▼
//!               Arc<RoleRegistry> (v1, held by in-flight cycle)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use conclave_registry::{Role, RoleRegistry, RegistryHandle};
//!
//! let registry = RoleRegistry::from_roles(vec![
//!     Role::new("strategist", "llama3.2:latest").with_weight(1.2),
//!     Role::new("architect", "llama3.2:latest"),
//! ])?;
//!
//! let handle = RegistryHandle::new(registry);
//! let snapshot = handle.snapshot();
//! assert_eq!(snapshot.len(), 2);
//! # Ok::<(), conclave_registry::RegistryError>(())
//! ```

mod models;
mod registry;

pub use models::{RegistryError, Role};
pub use registry::{RegistryHandle, RoleRegistry};

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
