//! Cgroups v2 resource management.
//!
//! Each container owns one leaf subtree under the runtime's cgroup
//! (`/sys/fs/cgroup/minibox/<id>` by default). Leaf creation failure is
//! fatal because no accounting is possible without it; individual limit
//! writes are best-effort hardening and only warn on failure.

pub mod cpu;
pub mod memory;
pub mod pids;

use std::path::{Path, PathBuf};
use std::time::Duration;

use minibox_common::constants::CGROUP_SETTLE_MS;
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::{MetricsSnapshot, ResourceLimits};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

/// Controllers delegated to container subtrees.
const CONTROLLERS: [&str; 4] = ["+cpu", "+memory", "+pids", "+io"];

/// Handle to one container's cgroup subtree.
#[derive(Debug, Clone)]
pub struct CgroupManager {
    /// Path to this container's cgroup directory.
    path: PathBuf,
}

impl CgroupManager {
    /// Creates the runtime hierarchy and this container's leaf subtree.
    ///
    /// `runtime_root` is the runtime's own cgroup under the unified
    /// hierarchy mount. Controller enablement is idempotent: repeating an
    /// enable write for an already-enabled controller is treated as
    /// success, so no locking is needed across containers.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Cgroup`] if the runtime root or the leaf
    /// directory cannot be created.
    pub fn init(runtime_root: &Path, container_id: &str) -> Result<Self> {
        std::fs::create_dir_all(runtime_root).map_err(|e| MiniboxError::Cgroup {
            message: format!("cannot create runtime cgroup {}: {e}", runtime_root.display()),
        })?;

        if let Some(parent) = runtime_root.parent() {
            enable_controllers(&parent.join("cgroup.subtree_control"));
        }
        enable_controllers(&runtime_root.join("cgroup.subtree_control"));

        let path = runtime_root.join(container_id);
        std::fs::create_dir_all(&path).map_err(|e| MiniboxError::Cgroup {
            message: format!("cannot create container cgroup {}: {e}", path.display()),
        })?;
        tracing::info!(path = %path.display(), "cgroup created");
        Ok(Self { path })
    }

    /// Wraps an existing subtree without creating anything.
    ///
    /// Used when rediscovering containers from the registry.
    #[must_use]
    pub fn from_existing(runtime_root: &Path, container_id: &str) -> Self {
        Self {
            path: runtime_root.join(container_id),
        }
    }

    /// Returns the subtree path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies resource limits, best-effort per limit.
    ///
    /// A failed write for one limit logs a warning and continues: partial
    /// resource bounding is strictly better than refusing to run the
    /// workload at all.
    pub fn apply_limits(&self, limits: &ResourceLimits) {
        if limits.memory_bytes > 0 {
            warn_on_err(memory::set_memory_max(&self.path, limits.memory_bytes));
            if let Some(swap) = limits.memory_swap_bytes {
                warn_on_err(memory::set_swap_max(&self.path, swap));
            }
        }
        if limits.cpu_quota_us > 0 {
            let period = if limits.cpu_period_us > 0 {
                limits.cpu_period_us
            } else {
                minibox_common::constants::DEFAULT_CPU_PERIOD_US
            };
            warn_on_err(cpu::set_cpu_max(&self.path, limits.cpu_quota_us, period));
        }
        if limits.cpu_shares > 0 {
            warn_on_err(cpu::set_cpu_weight(
                &self.path,
                cpu::shares_to_weight(limits.cpu_shares),
            ));
        }
        if limits.pids_max > 0 {
            warn_on_err(pids::set_pids_max(&self.path, limits.pids_max));
        }
    }

    /// Moves a process into this subtree.
    ///
    /// Called for the init process immediately after creation and again for
    /// every process injected via exec, so that all of a container's
    /// processes are accounted and bounded.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `cgroup.procs` fails.
    pub fn attach(&self, pid: u32) -> Result<()> {
        let procs = self.path.join("cgroup.procs");
        std::fs::write(&procs, pid.to_string()).map_err(|e| MiniboxError::Cgroup {
            message: format!("cannot attach PID {pid} to {}: {e}", self.path.display()),
        })?;
        tracing::debug!(pid, path = %self.path.display(), "attached process to cgroup");
        Ok(())
    }

    /// Reads a point-in-time usage snapshot from the subtree's stat files.
    ///
    /// The kernel's `max` sentinel in `memory.max` and `pids.max` is
    /// surfaced as `None` rather than a numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::NotFound`] if the subtree no longer exists.
    pub fn read_metrics(&self) -> Result<MetricsSnapshot> {
        if !self.path.exists() {
            return Err(MiniboxError::NotFound {
                kind: "cgroup",
                id: self.path.display().to_string(),
            });
        }

        Ok(MetricsSnapshot {
            memory_current_bytes: read_u64(&self.path.join("memory.current")).unwrap_or(0),
            memory_peak_bytes: read_u64(&self.path.join("memory.peak")).unwrap_or(0),
            memory_limit_bytes: read_limit(&self.path.join("memory.max")),
            cpu_usage_usec: read_cpu_usage_usec(&self.path.join("cpu.stat")).unwrap_or(0),
            pids_current: read_u64(&self.path.join("pids.current")).unwrap_or(0),
            pids_limit: read_limit(&self.path.join("pids.max")),
        })
    }

    /// Suspends all member processes via the cgroup freezer.
    ///
    /// # Errors
    ///
    /// Returns an error if `cgroup.freeze` cannot be written.
    pub fn freeze(&self) -> Result<()> {
        self.write_control("cgroup.freeze", "1")
    }

    /// Resumes previously frozen member processes.
    ///
    /// # Errors
    ///
    /// Returns an error if `cgroup.freeze` cannot be written.
    pub fn unfreeze(&self) -> Result<()> {
        self.write_control("cgroup.freeze", "0")
    }

    /// Terminates every process in the subtree.
    ///
    /// Prefers the one-shot `cgroup.kill` switch; on kernels without it,
    /// reads the membership list and signals each PID individually.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the kill switch nor the membership list
    /// is usable.
    pub fn kill_all(&self) -> Result<()> {
        let kill_file = self.path.join("cgroup.kill");
        if kill_file.exists() {
            return self.write_control("cgroup.kill", "1");
        }

        let procs = self.path.join("cgroup.procs");
        let content = std::fs::read_to_string(&procs).map_err(|e| MiniboxError::Cgroup {
            message: format!("cannot read {}: {e}", procs.display()),
        })?;
        for line in content.lines() {
            if let Ok(pid) = line.trim().parse::<i32>() {
                let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
            }
        }
        Ok(())
    }

    /// Kills all members, waits for them to exit, and removes the subtree.
    ///
    /// Removal failure (members still exiting) is a warning, not an error:
    /// by the time cleanup runs the container has already reached a
    /// terminal state.
    pub fn cleanup(&self) {
        if !self.path.exists() {
            return;
        }
        if let Err(e) = self.kill_all() {
            tracing::warn!(path = %self.path.display(), "kill during cleanup failed: {e}");
        }
        std::thread::sleep(Duration::from_millis(CGROUP_SETTLE_MS));
        match std::fs::remove_dir(&self.path) {
            Ok(()) => tracing::info!(path = %self.path.display(), "cgroup removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "could not remove cgroup: {e}");
            }
        }
    }

    fn write_control(&self, file: &str, value: &str) -> Result<()> {
        let path = self.path.join(file);
        std::fs::write(&path, value).map_err(|e| MiniboxError::Cgroup {
            message: format!("cannot write {value} to {}: {e}", path.display()),
        })
    }
}

/// Enables the delegated controllers in a `cgroup.subtree_control` file.
///
/// Best-effort: the controller may already be enabled, delegation may be
/// restricted, or the kernel may lack a controller.
fn enable_controllers(subtree_control: &Path) {
    for controller in CONTROLLERS {
        if let Err(e) = std::fs::write(subtree_control, controller) {
            tracing::debug!(
                file = %subtree_control.display(),
                controller,
                "could not enable controller: {e}"
            );
        }
    }
}

fn warn_on_err(result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!("could not apply limit: {e}");
    }
}

fn read_u64(path: &Path) -> Option<u64> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Reads a limit file, mapping the kernel's `max` sentinel to `None`.
fn read_limit(path: &Path) -> Option<u64> {
    let content = std::fs::read_to_string(path).ok()?;
    let value = content.trim();
    if value == "max" {
        None
    } else {
        value.parse().ok()
    }
}

/// Extracts the `usage_usec` field from a `cpu.stat` file.
fn read_cpu_usage_usec(path: &Path) -> Option<u64> {
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().find_map(|line| {
        line.strip_prefix("usage_usec ")
            .and_then(|v| v.trim().parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_subtree() -> (tempfile::TempDir, CgroupManager) {
        let root = tempfile::tempdir().unwrap();
        let manager = CgroupManager::init(&root.path().join("minibox"), "abc123").unwrap();
        (root, manager)
    }

    #[test]
    fn init_creates_leaf_directory() {
        let (root, manager) = fake_subtree();
        assert!(manager.path().is_dir());
        assert_eq!(manager.path(), root.path().join("minibox").join("abc123"));
    }

    #[test]
    fn init_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let runtime_root = root.path().join("minibox");
        let first = CgroupManager::init(&runtime_root, "c1").unwrap();
        let second = CgroupManager::init(&runtime_root, "c1").unwrap();
        assert_eq!(first.path(), second.path());
    }

    #[test]
    fn metrics_parse_fabricated_stat_files() {
        let (_root, manager) = fake_subtree();
        fs::write(manager.path().join("memory.current"), "4194304\n").unwrap();
        fs::write(manager.path().join("memory.peak"), "8388608\n").unwrap();
        fs::write(manager.path().join("memory.max"), "67108864\n").unwrap();
        fs::write(
            manager.path().join("cpu.stat"),
            "usage_usec 1523\nuser_usec 1200\nsystem_usec 323\n",
        )
        .unwrap();
        fs::write(manager.path().join("pids.current"), "3\n").unwrap();
        fs::write(manager.path().join("pids.max"), "10\n").unwrap();

        let snapshot = manager.read_metrics().unwrap();
        assert_eq!(snapshot.memory_current_bytes, 4_194_304);
        assert_eq!(snapshot.memory_peak_bytes, 8_388_608);
        assert_eq!(snapshot.memory_limit_bytes, Some(67_108_864));
        assert_eq!(snapshot.cpu_usage_usec, 1523);
        assert_eq!(snapshot.pids_current, 3);
        assert_eq!(snapshot.pids_limit, Some(10));
    }

    #[test]
    fn metrics_treat_max_sentinel_as_unlimited() {
        let (_root, manager) = fake_subtree();
        fs::write(manager.path().join("memory.max"), "max\n").unwrap();
        fs::write(manager.path().join("pids.max"), "max\n").unwrap();

        let snapshot = manager.read_metrics().unwrap();
        assert_eq!(snapshot.memory_limit_bytes, None);
        assert_eq!(snapshot.pids_limit, None);
    }

    #[test]
    fn metrics_on_missing_subtree_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let manager = CgroupManager::from_existing(root.path(), "gone");
        assert!(matches!(
            manager.read_metrics(),
            Err(MiniboxError::NotFound { .. })
        ));
    }

    #[test]
    fn apply_limits_writes_configured_files() {
        let (_root, manager) = fake_subtree();
        let limits = ResourceLimits {
            memory_bytes: 64 * 1024 * 1024,
            memory_swap_bytes: Some(0),
            cpu_quota_us: 50_000,
            cpu_period_us: 0,
            cpu_shares: 0,
            pids_max: 10,
        };
        manager.apply_limits(&limits);

        let mem = fs::read_to_string(manager.path().join("memory.max")).unwrap();
        assert_eq!(mem, "67108864");
        let swap = fs::read_to_string(manager.path().join("memory.swap.max")).unwrap();
        assert_eq!(swap, "0");
        let cpu = fs::read_to_string(manager.path().join("cpu.max")).unwrap();
        assert_eq!(cpu, "50000 100000");
        let pids = fs::read_to_string(manager.path().join("pids.max")).unwrap();
        assert_eq!(pids, "10");
    }

    #[test]
    fn unlimited_axes_write_nothing() {
        let (_root, manager) = fake_subtree();
        manager.apply_limits(&ResourceLimits::default());
        assert!(!manager.path().join("memory.max").exists());
        assert!(!manager.path().join("cpu.max").exists());
        assert!(!manager.path().join("pids.max").exists());
    }

    #[test]
    fn freeze_toggles_control_file() {
        let (_root, manager) = fake_subtree();
        manager.freeze().unwrap();
        assert_eq!(
            fs::read_to_string(manager.path().join("cgroup.freeze")).unwrap(),
            "1"
        );
        manager.unfreeze().unwrap();
        assert_eq!(
            fs::read_to_string(manager.path().join("cgroup.freeze")).unwrap(),
            "0"
        );
    }

    #[test]
    fn kill_all_prefers_kill_switch() {
        let (_root, manager) = fake_subtree();
        fs::write(manager.path().join("cgroup.kill"), "0").unwrap();
        manager.kill_all().unwrap();
        assert_eq!(
            fs::read_to_string(manager.path().join("cgroup.kill")).unwrap(),
            "1"
        );
    }

    #[test]
    fn cleanup_removes_empty_subtree() {
        let (_root, manager) = fake_subtree();
        manager.cleanup();
        assert!(!manager.path().exists());
    }

    #[test]
    fn cleanup_on_missing_subtree_is_harmless() {
        let root = tempfile::tempdir().unwrap();
        let manager = CgroupManager::from_existing(root.path(), "gone");
        manager.cleanup();
    }
}
