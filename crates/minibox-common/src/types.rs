//! Domain primitive types used across the minibox workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a container instance.
///
/// A short opaque token of twelve lowercase hex characters, either supplied
/// by the caller or generated from a random UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(hex[..crate::constants::CONTAINER_ID_LEN].to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// Container has been created but not yet started.
    #[default]
    Created,
    /// Container is actively running.
    Running,
    /// Container processes are frozen via the cgroup freezer.
    Paused,
    /// Container has been stopped.
    Stopped,
    /// Container has been deleted; no on-disk record remains.
    Deleted,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for ContainerState {
    type Err = crate::error::MiniboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "stopped" => Ok(Self::Stopped),
            "deleted" => Ok(Self::Deleted),
            other => Err(crate::error::MiniboxError::InvalidArgument {
                message: format!("unknown container state: {other}"),
            }),
        }
    }
}

/// Resource limits for a container.
///
/// A zero value means the corresponding axis is unlimited, matching the
/// cgroup v2 convention of only writing control files for configured limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory ceiling in bytes (0 = unlimited).
    pub memory_bytes: u64,
    /// Swap ceiling in bytes; `None` leaves the kernel default.
    pub memory_swap_bytes: Option<u64>,
    /// Legacy CPU shares (2-262144), rescaled to a cgroup v2 weight.
    pub cpu_shares: u64,
    /// CPU quota in microseconds per period (0 = unlimited).
    pub cpu_quota_us: u64,
    /// CPU period in microseconds (0 = default of 100 000).
    pub cpu_period_us: u64,
    /// Maximum number of processes (0 = unlimited).
    pub pids_max: u64,
}

/// One UID or GID range mapping for an identity-mapping namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    /// Identifier inside the container.
    pub container_id: u32,
    /// Identifier on the host that it maps to.
    pub host_id: u32,
}

/// Snapshot of a container's resource usage.
///
/// Produced on demand from cgroup stat files; never cached by the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Current memory usage in bytes.
    pub memory_current_bytes: u64,
    /// Peak memory usage in bytes.
    pub memory_peak_bytes: u64,
    /// Memory limit in bytes; `None` means unlimited.
    pub memory_limit_bytes: Option<u64>,
    /// Cumulative CPU time consumed, in microseconds.
    pub cpu_usage_usec: u64,
    /// Current number of processes in the container.
    pub pids_current: u64,
    /// Process limit; `None` means unlimited.
    pub pids_limit: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_is_short_hex() {
        let id = ContainerId::generate();
        assert_eq!(id.as_str().len(), crate::constants::CONTAINER_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ContainerId::generate(), ContainerId::generate());
    }

    #[test]
    fn state_display_roundtrip() {
        for state in [
            ContainerState::Created,
            ContainerState::Running,
            ContainerState::Paused,
            ContainerState::Stopped,
            ContainerState::Deleted,
        ] {
            let parsed: ContainerState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!("restarting".parse::<ContainerState>().is_err());
    }

    #[test]
    fn default_limits_are_unlimited() {
        let limits = ResourceLimits::default();
        assert_eq!(limits.memory_bytes, 0);
        assert_eq!(limits.pids_max, 0);
        assert!(limits.memory_swap_bytes.is_none());
    }
}
