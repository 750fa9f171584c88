//! Configuration models for containers and the runtime itself.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{IdMapping, ResourceLimits};

/// Immutable configuration captured when a container is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Container ID; generated when absent.
    pub id: Option<String>,
    /// Human-readable name; defaults to the ID.
    pub name: Option<String>,
    /// Hostname inside the container; defaults to the name.
    pub hostname: Option<String>,
    /// Path to the root filesystem directory.
    pub rootfs: PathBuf,
    /// Command vector to execute; `/bin/sh` when empty.
    pub command: Vec<String>,
    /// Environment variables as `KEY=VALUE` pairs.
    pub env: Vec<String>,
    /// Resource limits applied to the container's cgroup.
    pub limits: ResourceLimits,
    /// Create a network namespace (no virtual interface wiring).
    pub enable_network: bool,
    /// Create an identity-mapping (user) namespace.
    pub enable_user_ns: bool,
    /// UID mapping written when the user namespace is enabled.
    pub uid_map: IdMapping,
    /// GID mapping written when the user namespace is enabled.
    pub gid_map: IdMapping,
}

/// Paths the runtime engine operates on.
///
/// Injectable so tests can point both roots at temporary directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base directory for persisted container records.
    pub state_root: PathBuf,
    /// The runtime's own cgroup subtree under the unified hierarchy.
    pub cgroup_root: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            state_root: crate::constants::state_dir().clone(),
            cgroup_root: PathBuf::from(crate::constants::CGROUP_V2_PATH)
                .join(crate::constants::RUNTIME_CGROUP),
        }
    }
}
