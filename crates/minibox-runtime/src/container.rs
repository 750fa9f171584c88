//! Core container struct: configuration plus runtime state.

use std::path::{Path, PathBuf};

use minibox_common::config::ContainerConfig;
use minibox_common::types::{ContainerId, ContainerState};

/// A container instance with its configuration and runtime state.
///
/// Only the [`crate::engine::Engine`] mutates the state field; every
/// transition is persisted to the registry before the operation returns.
#[derive(Debug, Clone)]
pub struct Container {
    /// Unique identifier.
    pub id: ContainerId,
    /// Human-readable name; defaults to the ID.
    pub name: String,
    /// Immutable configuration captured at create time.
    pub config: ContainerConfig,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// PID of the container's init process (if running).
    pub pid: Option<u32>,
    /// Exit code of the init process once known.
    pub exit_code: Option<i32>,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 start timestamp of the most recent start.
    pub started_at: Option<String>,
    /// ISO-8601 stop timestamp of the most recent stop.
    pub stopped_at: Option<String>,
}

impl Container {
    /// Builds a container in the `Created` state, filling identity
    /// defaults.
    ///
    /// A missing ID is generated; the name defaults to the ID and the
    /// hostname to the name.
    #[must_use]
    pub fn from_config(mut config: ContainerConfig) -> Self {
        let id = config
            .id
            .clone()
            .map_or_else(ContainerId::generate, ContainerId::new);
        let name = config.name.clone().unwrap_or_else(|| id.as_str().to_string());
        if config.hostname.is_none() {
            config.hostname = Some(name.clone());
        }

        Self {
            id,
            name,
            config,
            state: ContainerState::Created,
            pid: None,
            exit_code: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: None,
            stopped_at: None,
        }
    }

    /// Returns this container's on-disk state directory under `state_root`.
    ///
    /// Both derived paths are deterministic functions of the ID.
    #[must_use]
    pub fn state_dir(&self, state_root: &Path) -> PathBuf {
        state_root
            .join(minibox_common::constants::CONTAINERS_DIR)
            .join(self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_identity_fields_are_defaulted() {
        let c = Container::from_config(ContainerConfig::default());
        assert_eq!(c.id.as_str().len(), 12);
        assert_eq!(c.name, c.id.as_str());
        assert_eq!(c.config.hostname.as_deref(), Some(c.name.as_str()));
        assert_eq!(c.state, ContainerState::Created);
        assert!(c.pid.is_none());
    }

    #[test]
    fn supplied_identity_fields_are_kept() {
        let config = ContainerConfig {
            id: Some("deadbeef0001".to_string()),
            name: Some("web".to_string()),
            hostname: Some("web-host".to_string()),
            ..Default::default()
        };
        let c = Container::from_config(config);
        assert_eq!(c.id.as_str(), "deadbeef0001");
        assert_eq!(c.name, "web");
        assert_eq!(c.config.hostname.as_deref(), Some("web-host"));
    }

    #[test]
    fn state_dir_is_deterministic_in_id() {
        let config = ContainerConfig {
            id: Some("cafe00000001".to_string()),
            ..Default::default()
        };
        let c = Container::from_config(config);
        assert_eq!(
            c.state_dir(Path::new("/var/lib/minibox")),
            PathBuf::from("/var/lib/minibox/containers/cafe00000001")
        );
    }
}
