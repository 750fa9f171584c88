//! Runtime engine that owns the container state machine.
//!
//! Sequences the isolation layers during create/start, escalates stop from
//! graceful to forced, and unwinds resources in reverse order of
//! acquisition on delete or failure. Each isolation layer owns exactly the
//! resources it created and exposes its own idempotent cleanup, so a
//! failure partway through create/start unwinds via the same calls used
//! for normal deletion.

use std::time::Duration;

use minibox_common::config::{ContainerConfig, RuntimeConfig};
use minibox_common::constants::{DELETE_STOP_TIMEOUT_SECS, STOP_POLL_INTERVAL_MS};
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::{ContainerState, MetricsSnapshot};
use minibox_core::cgroup::CgroupManager;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

use crate::container::Container;
use crate::registry::Registry;

/// The runtime engine coordinating all container operations.
///
/// Containers are single-writer: each container object must only be driven
/// by one logical caller at a time. Distinct containers may be operated on
/// concurrently from independent threads.
pub struct Engine {
    config: RuntimeConfig,
    registry: Registry,
}

impl Engine {
    /// Creates an engine with the default state and cgroup roots.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates an engine with explicit roots, used by tests and embedders.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        let registry = Registry::new(config.state_root.clone());
        Self { config, registry }
    }

    /// Returns the runtime configuration in effect.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Creates a container: identity defaults, state directory, cgroup
    /// subtree, limits, persisted record.
    ///
    /// A failed create leaves no registry entry and no subtree behind.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::AlreadyExists`] for a duplicate ID and
    /// [`MiniboxError::Cgroup`] when the subtree cannot be created (no
    /// accounting is possible without it).
    pub fn create(&self, config: ContainerConfig) -> Result<Container> {
        let container = Container::from_config(config);
        if self.registry.exists(&container.id) {
            return Err(MiniboxError::AlreadyExists {
                id: container.id.to_string(),
            });
        }

        let state_dir = container.state_dir(&self.config.state_root);
        std::fs::create_dir_all(&state_dir).map_err(|e| MiniboxError::Io {
            path: state_dir.clone(),
            source: e,
        })?;

        let cgroup = match CgroupManager::init(&self.config.cgroup_root, container.id.as_str()) {
            Ok(cgroup) => cgroup,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&state_dir);
                return Err(e);
            }
        };
        cgroup.apply_limits(&container.config.limits);

        if let Err(e) = self.registry.save(&container) {
            cgroup.cleanup();
            let _ = std::fs::remove_dir_all(&state_dir);
            return Err(e);
        }

        tracing::info!(id = %container.id, name = %container.name, "container created");
        Ok(container)
    }

    /// Starts a created or stopped container.
    ///
    /// Spawns the init process inside fresh namespaces, records its PID,
    /// attaches it to the cgroup subtree, and persists the Running state.
    /// A failed start leaves the container in its previous state,
    /// retryable.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::InvalidArgument`] if already running and
    /// [`MiniboxError::Filesystem`] when no valid rootfs is configured —
    /// the runtime never runs a container without a jailed root.
    pub fn start(&self, container: &mut Container) -> Result<()> {
        if container.state == ContainerState::Running {
            return Err(MiniboxError::InvalidArgument {
                message: format!("container {} is already running", container.id),
            });
        }
        if container.config.rootfs.as_os_str().is_empty() || !container.config.rootfs.is_dir() {
            return Err(MiniboxError::Filesystem {
                path: container.config.rootfs.clone(),
                message: "rootfs does not exist".to_string(),
            });
        }

        let pid = minibox_core::namespace::spawn_isolated(&container.config)?;
        let pid_raw = u32::try_from(pid.as_raw()).unwrap_or(0);

        let cgroup = CgroupManager::from_existing(&self.config.cgroup_root, container.id.as_str());
        if let Err(e) = cgroup.attach(pid_raw) {
            tracing::warn!(id = %container.id, "init process not attached to cgroup: {e}");
        }

        container.pid = Some(pid_raw);
        container.state = ContainerState::Running;
        container.started_at = Some(chrono::Utc::now().to_rfc3339());
        self.registry.save(container)?;
        tracing::info!(id = %container.id, pid = pid_raw, "container started");
        Ok(())
    }

    /// Stops a running container with graceful-then-forced escalation.
    ///
    /// Sends SIGTERM, polls for exit every 100ms up to `timeout_secs`,
    /// then sends SIGKILL and blocks until the process is reaped. A
    /// container that is not running is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only if the final record write fails; the
    /// operation is safe to retry.
    pub fn stop(&self, container: &mut Container, timeout_secs: u64) -> Result<()> {
        if container.state != ContainerState::Running {
            return Ok(());
        }
        let Some(pid_raw) = container.pid else {
            // Record claims Running but carries no PID; nothing to signal.
            return self.mark_stopped(container, None);
        };
        let pid = Pid::from_raw(i32::try_from(pid_raw).unwrap_or(0));

        tracing::info!(id = %container.id, pid = pid_raw, "stopping container");
        if let Err(e) = kill(pid, Signal::SIGTERM) {
            tracing::debug!(id = %container.id, "SIGTERM not delivered: {e}");
        }

        let polls = timeout_secs * 1000 / STOP_POLL_INTERVAL_MS;
        for _ in 0..polls {
            if let Some(exit_code) = try_reap(pid) {
                return self.mark_stopped(container, exit_code);
            }
            std::thread::sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS));
        }

        tracing::info!(id = %container.id, pid = pid_raw, "grace period expired, killing");
        let _ = kill(pid, Signal::SIGKILL);
        let exit_code = match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => Some(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => Some(128 + signal as i32),
            Ok(_) | Err(_) => None,
        };
        self.mark_stopped(container, exit_code)
    }

    /// Suspends all processes of a running container.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::InvalidArgument`] unless the container is
    /// running, or a cgroup error if the freezer write fails.
    pub fn pause(&self, container: &mut Container) -> Result<()> {
        if container.state != ContainerState::Running {
            return Err(MiniboxError::InvalidArgument {
                message: format!("container {} is not running", container.id),
            });
        }
        self.cgroup_for(container).freeze()?;
        container.state = ContainerState::Paused;
        self.registry.save(container)?;
        tracing::info!(id = %container.id, "container paused");
        Ok(())
    }

    /// Resumes a paused container.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::InvalidArgument`] unless the container is
    /// paused, or a cgroup error if the freezer write fails.
    pub fn resume(&self, container: &mut Container) -> Result<()> {
        if container.state != ContainerState::Paused {
            return Err(MiniboxError::InvalidArgument {
                message: format!("container {} is not paused", container.id),
            });
        }
        self.cgroup_for(container).unfreeze()?;
        container.state = ContainerState::Running;
        self.registry.save(container)?;
        tracing::info!(id = %container.id, "container resumed");
        Ok(())
    }

    /// Deletes a container: stop if running, tear down the cgroup subtree
    /// and residual mounts, remove the on-disk record.
    ///
    /// Idempotent and terminal: residual cleanup failures are logged, not
    /// re-raised, so deletion never blocks the management layer.
    ///
    /// # Errors
    ///
    /// This method currently always succeeds; the `Result` is kept so the
    /// registry backend can surface hard storage faults.
    pub fn delete(&self, container: &mut Container) -> Result<()> {
        if container.state == ContainerState::Running {
            if let Err(e) = self.stop(container, DELETE_STOP_TIMEOUT_SECS) {
                tracing::warn!(id = %container.id, "stop during delete failed: {e}");
            }
        }

        self.cgroup_for(container).cleanup();
        minibox_core::filesystem::cleanup(&container.state_dir(&self.config.state_root));
        if let Err(e) = self.registry.remove(&container.id) {
            tracing::warn!(id = %container.id, "could not remove record: {e}");
        }

        container.state = ContainerState::Deleted;
        container.pid = None;
        tracing::info!(id = %container.id, "container deleted");
        Ok(())
    }

    /// Executes a command inside a running container and returns its exit
    /// code.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Process`] when the container is not
    /// running, and [`MiniboxError::NotFound`] when its init process has
    /// already exited.
    pub fn exec(&self, container: &Container, command: &[String]) -> Result<i32> {
        if container.state != ContainerState::Running {
            return Err(MiniboxError::Process {
                message: format!("container {} is not running", container.id),
            });
        }
        let Some(pid_raw) = container.pid else {
            return Err(MiniboxError::Process {
                message: format!("container {} has no init process", container.id),
            });
        };

        // Harmless liveness probe: signal 0 delivers nothing.
        let pid = Pid::from_raw(i32::try_from(pid_raw).unwrap_or(0));
        if kill(pid, None).is_err() {
            return Err(MiniboxError::NotFound {
                kind: "process",
                id: pid_raw.to_string(),
            });
        }

        crate::exec::exec_in_container(pid_raw, &self.cgroup_for(container), command)
    }

    /// Collects a live metrics snapshot for a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container's cgroup subtree is gone.
    pub fn metrics(&self, container: &Container) -> Result<MetricsSnapshot> {
        crate::metrics::collect(container, &self.config.cgroup_root)
    }

    /// Enumerates all persisted containers.
    ///
    /// This scan is the sole mechanism by which a new invocation discovers
    /// containers created by a prior one.
    ///
    /// # Errors
    ///
    /// Returns an error if the state root cannot be read.
    pub fn list(&self) -> Result<Vec<Container>> {
        self.registry.list()
    }

    /// Finds a container by ID or name.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::NotFound`] when no record matches.
    pub fn get(&self, id_or_name: &str) -> Result<Container> {
        self.list()?
            .into_iter()
            .find(|c| c.id.as_str() == id_or_name || c.name == id_or_name)
            .ok_or_else(|| MiniboxError::NotFound {
                kind: "container",
                id: id_or_name.to_string(),
            })
    }

    fn cgroup_for(&self, container: &Container) -> CgroupManager {
        CgroupManager::from_existing(&self.config.cgroup_root, container.id.as_str())
    }

    fn mark_stopped(&self, container: &mut Container, exit_code: Option<i32>) -> Result<()> {
        container.state = ContainerState::Stopped;
        container.exit_code = exit_code;
        container.pid = None;
        container.stopped_at = Some(chrono::Utc::now().to_rfc3339());
        self.registry.save(container)?;
        tracing::info!(id = %container.id, ?exit_code, "container stopped");
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking reap; `Some` when the process has exited.
///
/// A container rediscovered from the registry is not our child, so ECHILD
/// is resolved with a liveness probe instead of treated as an error.
fn try_reap(pid: Pid) -> Option<Option<i32>> {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::StillAlive) => None,
        Ok(WaitStatus::Exited(_, code)) => Some(Some(code)),
        Ok(WaitStatus::Signaled(_, signal, _)) => Some(Some(128 + signal as i32)),
        Ok(_) => None,
        Err(nix::errno::Errno::ECHILD) => {
            if kill(pid, None).is_err() {
                Some(None)
            } else {
                None
            }
        }
        Err(_) => Some(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_engine() -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig {
            state_root: dir.path().join("state"),
            cgroup_root: dir.path().join("cgroup").join("minibox"),
        };
        (dir, Engine::with_config(config))
    }

    #[test]
    fn create_then_list_returns_exactly_one_created_record() {
        let (_dir, engine) = temp_engine();
        let container = engine.create(ContainerConfig::default()).unwrap();

        let listed = engine.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, container.id);
        assert_eq!(listed[0].state, ContainerState::Created);
    }

    #[test]
    fn create_provisions_state_dir_and_cgroup_subtree() {
        let (_dir, engine) = temp_engine();
        let container = engine.create(ContainerConfig::default()).unwrap();
        assert!(container.state_dir(&engine.config().state_root).is_dir());
        assert!(
            engine
                .config()
                .cgroup_root
                .join(container.id.as_str())
                .is_dir()
        );
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let (_dir, engine) = temp_engine();
        let config = ContainerConfig {
            id: Some("dup000000001".to_string()),
            ..Default::default()
        };
        let _ = engine.create(config.clone()).unwrap();
        assert!(matches!(
            engine.create(config),
            Err(MiniboxError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn start_rejects_running_container() {
        let (_dir, engine) = temp_engine();
        let mut container = engine.create(ContainerConfig::default()).unwrap();
        container.state = ContainerState::Running;
        let err = engine.start(&mut container).unwrap_err();
        assert!(matches!(err, MiniboxError::InvalidArgument { .. }));
        assert_eq!(container.state, ContainerState::Running);
    }

    #[test]
    fn start_without_rootfs_fails_and_stays_created() {
        let (_dir, engine) = temp_engine();
        let config = ContainerConfig {
            rootfs: PathBuf::from("/nonexistent/rootfs"),
            ..Default::default()
        };
        let mut container = engine.create(config).unwrap();
        let err = engine.start(&mut container).unwrap_err();
        assert!(matches!(err, MiniboxError::Filesystem { .. }));
        assert_eq!(container.state, ContainerState::Created);
        assert!(container.pid.is_none());
    }

    #[test]
    fn stop_on_non_running_container_is_a_noop() {
        let (_dir, engine) = temp_engine();
        let mut container = engine.create(ContainerConfig::default()).unwrap();
        engine.stop(&mut container, 1).unwrap();
        assert_eq!(container.state, ContainerState::Created);
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, engine) = temp_engine();
        let mut container = engine.create(ContainerConfig::default()).unwrap();
        engine.delete(&mut container).unwrap();
        engine.delete(&mut container).unwrap();
        assert_eq!(container.state, ContainerState::Deleted);
        assert!(engine.list().unwrap().is_empty());
    }

    #[test]
    fn delete_removes_cgroup_subtree() {
        let (_dir, engine) = temp_engine();
        let mut container = engine.create(ContainerConfig::default()).unwrap();
        let subtree = engine.config().cgroup_root.join(container.id.as_str());
        assert!(subtree.is_dir());
        engine.delete(&mut container).unwrap();
        assert!(!subtree.exists());
    }

    #[test]
    fn exec_into_non_running_container_is_a_process_error() {
        let (_dir, engine) = temp_engine();
        let container = engine.create(ContainerConfig::default()).unwrap();
        let err = engine.exec(&container, &["true".to_string()]).unwrap_err();
        assert!(matches!(err, MiniboxError::Process { .. }));
    }

    #[test]
    fn exec_with_dead_init_pid_is_not_found() {
        let (_dir, engine) = temp_engine();
        let mut container = engine.create(ContainerConfig::default()).unwrap();
        container.state = ContainerState::Running;
        container.pid = Some(u32::try_from(i32::MAX).unwrap());
        let err = engine.exec(&container, &["true".to_string()]).unwrap_err();
        assert!(matches!(err, MiniboxError::NotFound { .. }));
    }

    #[test]
    fn pause_requires_running_state() {
        let (_dir, engine) = temp_engine();
        let mut container = engine.create(ContainerConfig::default()).unwrap();
        assert!(matches!(
            engine.pause(&mut container),
            Err(MiniboxError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn get_resolves_by_id_and_name() {
        let (_dir, engine) = temp_engine();
        let config = ContainerConfig {
            id: Some("abc000000001".to_string()),
            name: Some("worker".to_string()),
            ..Default::default()
        };
        let _ = engine.create(config).unwrap();
        assert_eq!(engine.get("abc000000001").unwrap().name, "worker");
        assert_eq!(engine.get("worker").unwrap().id.as_str(), "abc000000001");
        assert!(matches!(
            engine.get("missing"),
            Err(MiniboxError::NotFound { .. })
        ));
    }
}
