//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for minibox state on Linux with root access.
pub const SYSTEM_STATE_DIR: &str = "/var/lib/minibox";

/// Returns the state directory, preferring `/var/lib/minibox` when writable
/// (the privileged case), falling back to `$HOME/.minibox`.
fn resolve_state_dir() -> PathBuf {
    let system_dir = PathBuf::from(SYSTEM_STATE_DIR);
    if std::fs::create_dir_all(&system_dir).is_ok() {
        return system_dir;
    }
    if let Ok(home) = std::env::var("HOME") {
        let user_dir = PathBuf::from(home).join(".minibox");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    system_dir
}

static STATE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved state directory for this session.
pub fn state_dir() -> &'static PathBuf {
    STATE_DIR.get_or_init(resolve_state_dir)
}

/// Cgroups v2 unified hierarchy mount point.
pub const CGROUP_V2_PATH: &str = "/sys/fs/cgroup";

/// Name of the runtime's own cgroup below the unified hierarchy root.
pub const RUNTIME_CGROUP: &str = "minibox";

/// Subdirectory of the state root holding one directory per container.
pub const CONTAINERS_DIR: &str = "containers";

/// File name of the per-container persisted record.
pub const STATE_FILE: &str = "state.txt";

/// Length of a generated container ID in hex characters.
pub const CONTAINER_ID_LEN: usize = 12;

/// Default CPU period when a quota is given without one, in microseconds.
pub const DEFAULT_CPU_PERIOD_US: u64 = 100_000;

/// Grace period applied when `delete` must first stop a running container.
pub const DELETE_STOP_TIMEOUT_SECS: u64 = 10;

/// Interval between exit polls during graceful stop, in milliseconds.
pub const STOP_POLL_INTERVAL_MS: u64 = 100;

/// Settle time after killing cgroup members before subtree removal.
pub const CGROUP_SETTLE_MS: u64 = 100;

/// Exit code reported by a container child whose exec failed.
pub const EXIT_EXEC_FAILED: i32 = 127;

/// Command used when a container or exec request supplies none.
pub const DEFAULT_COMMAND: &str = "/bin/sh";
