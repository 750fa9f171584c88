//! Process count control via cgroups v2.
//!
//! Manages `pids.max`; once the limit is reached, fork inside the
//! container fails while host processes are unaffected.

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};

/// Sets the maximum number of processes for a cgroup.
///
/// # Errors
///
/// Returns an error if writing to `pids.max` fails.
pub fn set_pids_max(cgroup_path: &Path, max: u64) -> Result<()> {
    let file = cgroup_path.join("pids.max");
    std::fs::write(&file, max.to_string()).map_err(|e| MiniboxError::Io {
        path: file,
        source: e,
    })?;
    tracing::debug!(max, "PID limit set");
    Ok(())
}
