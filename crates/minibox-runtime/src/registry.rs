//! Persistent container registry.
//!
//! One directory per container under `<state_root>/containers/<id>`,
//! holding a flat line-oriented record (`id=`, `name=`, `state=`, `pid=`).
//! Records are written synchronously after every state transition, so the
//! next `list()` — possibly in a different process — sees the latest state.
//! Reading tolerates unknown lines and defaults missing fields, keeping the
//! format backward-parseable.

use std::path::PathBuf;

use minibox_common::config::ContainerConfig;
use minibox_common::constants::{CONTAINERS_DIR, STATE_FILE};
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::{ContainerId, ContainerState};

use crate::container::Container;

/// Repository of persisted container records.
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
}

impl Registry {
    /// Creates a registry rooted at `state_root`.
    #[must_use]
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            root: state_root.into(),
        }
    }

    /// Returns the directory holding all container records.
    #[must_use]
    pub fn containers_dir(&self) -> PathBuf {
        self.root.join(CONTAINERS_DIR)
    }

    /// Returns whether a record exists for the given ID.
    #[must_use]
    pub fn exists(&self, id: &ContainerId) -> bool {
        self.record_path(id).exists()
    }

    /// Persists a container's record, creating its directory if needed.
    ///
    /// The record is written to a temporary file and renamed into place so
    /// a concurrent `list()` never observes a torn write.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or record cannot be written.
    pub fn save(&self, container: &Container) -> Result<()> {
        let dir = self.containers_dir().join(container.id.as_str());
        std::fs::create_dir_all(&dir).map_err(|e| MiniboxError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let record = format!(
            "id={}\nname={}\nstate={}\npid={}\n",
            container.id,
            container.name,
            container.state,
            container.pid.unwrap_or(0),
        );

        let tmp = dir.join(format!(".{STATE_FILE}.tmp"));
        let path = dir.join(STATE_FILE);
        std::fs::write(&tmp, record).map_err(|e| MiniboxError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| MiniboxError::Io { path, source: e })?;
        tracing::debug!(id = %container.id, state = %container.state, "record persisted");
        Ok(())
    }

    /// Loads one container record by ID.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::NotFound`] when no record exists.
    pub fn load(&self, id: &ContainerId) -> Result<Container> {
        let path = self.record_path(id);
        let content = std::fs::read_to_string(&path).map_err(|_| MiniboxError::NotFound {
            kind: "container",
            id: id.to_string(),
        })?;
        Ok(parse_record(id.as_str(), &content))
    }

    /// Enumerates all persisted containers by scanning the state root.
    ///
    /// Entries whose record file is missing are skipped; malformed fields
    /// within a record fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error only if the containers directory exists but cannot
    /// be read.
    pub fn list(&self) -> Result<Vec<Container>> {
        let dir = self.containers_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MiniboxError::Io {
                path: dir,
                source: e,
            }),
        };

        let mut containers = Vec::new();
        for entry in entries.flatten() {
            let dir_name = entry.file_name();
            let Some(id) = dir_name.to_str() else {
                continue;
            };
            if id.starts_with('.') {
                continue;
            }
            let record_path = entry.path().join(STATE_FILE);
            match std::fs::read_to_string(&record_path) {
                Ok(content) => containers.push(parse_record(id, &content)),
                Err(e) => {
                    tracing::debug!(id, "skipping unreadable record: {e}");
                }
            }
        }
        Ok(containers)
    }

    /// Removes a container's on-disk record.
    ///
    /// Idempotent: removing an absent record succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn remove(&self, id: &ContainerId) -> Result<()> {
        let dir = self.containers_dir().join(id.as_str());
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MiniboxError::Io {
                path: dir,
                source: e,
            }),
        }
    }

    fn record_path(&self, id: &ContainerId) -> PathBuf {
        self.containers_dir().join(id.as_str()).join(STATE_FILE)
    }
}

/// Parses a line-oriented record into a container.
///
/// Unknown lines are ignored; a missing or unparseable state defaults to
/// `Created`, and a zero PID means none.
fn parse_record(dir_id: &str, content: &str) -> Container {
    let mut id = dir_id.to_string();
    let mut name = String::new();
    let mut state = ContainerState::Created;
    let mut pid = None;

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("id=") {
            if !value.is_empty() {
                id = value.to_string();
            }
        } else if let Some(value) = line.strip_prefix("name=") {
            name = value.to_string();
        } else if let Some(value) = line.strip_prefix("state=") {
            state = value.parse().unwrap_or_default();
        } else if let Some(value) = line.strip_prefix("pid=") {
            pid = value.parse::<u32>().ok().filter(|p| *p > 0);
        }
    }

    let container_id = ContainerId::new(id);
    if name.is_empty() {
        name = container_id.as_str().to_string();
    }

    Container {
        id: container_id,
        name,
        config: ContainerConfig::default(),
        state,
        pid,
        exit_code: None,
        created_at: String::new(),
        started_at: None,
        stopped_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minibox_common::config::ContainerConfig;

    fn temp_registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path());
        (dir, registry)
    }

    fn sample_container(id: &str) -> Container {
        Container::from_config(ContainerConfig {
            id: Some(id.to_string()),
            name: Some(format!("{id}-name")),
            ..Default::default()
        })
    }

    #[test]
    fn save_load_roundtrip() {
        let (_dir, registry) = temp_registry();
        let mut container = sample_container("aaaabbbbcccc");
        container.state = ContainerState::Running;
        container.pid = Some(4242);
        registry.save(&container).unwrap();

        let loaded = registry.load(&container.id).unwrap();
        assert_eq!(loaded.id, container.id);
        assert_eq!(loaded.name, "aaaabbbbcccc-name");
        assert_eq!(loaded.state, ContainerState::Running);
        assert_eq!(loaded.pid, Some(4242));
    }

    #[test]
    fn list_returns_every_saved_record() {
        let (_dir, registry) = temp_registry();
        registry.save(&sample_container("c00000000001")).unwrap();
        registry.save(&sample_container("c00000000002")).unwrap();

        let mut ids: Vec<String> = registry
            .list()
            .unwrap()
            .into_iter()
            .map(|c| c.id.to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["c00000000001", "c00000000002"]);
    }

    #[test]
    fn list_on_missing_state_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("never-created"));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn unknown_lines_and_missing_fields_are_tolerated() {
        let parsed = parse_record(
            "dir000000001",
            "flavor=strawberry\nstate=bogus\nnonsense\npid=notanumber\n",
        );
        assert_eq!(parsed.id.as_str(), "dir000000001");
        assert_eq!(parsed.name, "dir000000001");
        assert_eq!(parsed.state, ContainerState::Created);
        assert!(parsed.pid.is_none());
    }

    #[test]
    fn zero_pid_means_no_process() {
        let parsed = parse_record("dir000000002", "id=dir000000002\nstate=stopped\npid=0\n");
        assert_eq!(parsed.state, ContainerState::Stopped);
        assert!(parsed.pid.is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, registry) = temp_registry();
        let container = sample_container("eeeeffff0000");
        registry.save(&container).unwrap();
        registry.remove(&container.id).unwrap();
        registry.remove(&container.id).unwrap();
        assert!(!registry.exists(&container.id));
    }
}
