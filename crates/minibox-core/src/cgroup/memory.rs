//! Memory resource control via cgroups v2.
//!
//! Manages `memory.max` and `memory.swap.max`.

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};

/// Sets the hard memory limit for a cgroup.
///
/// # Errors
///
/// Returns an error if writing to `memory.max` fails.
pub fn set_memory_max(cgroup_path: &Path, bytes: u64) -> Result<()> {
    let file = cgroup_path.join("memory.max");
    std::fs::write(&file, bytes.to_string()).map_err(|e| MiniboxError::Io {
        path: file,
        source: e,
    })?;
    tracing::debug!(bytes, "memory max limit set");
    Ok(())
}

/// Sets the swap ceiling for a cgroup.
///
/// # Errors
///
/// Returns an error if writing to `memory.swap.max` fails.
pub fn set_swap_max(cgroup_path: &Path, bytes: u64) -> Result<()> {
    let file = cgroup_path.join("memory.swap.max");
    std::fs::write(&file, bytes.to_string()).map_err(|e| MiniboxError::Io {
        path: file,
        source: e,
    })?;
    tracing::debug!(bytes, "swap max limit set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_max_writes_byte_value() {
        let dir = tempfile::tempdir().unwrap();
        set_memory_max(dir.path(), 67_108_864).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("memory.max")).unwrap(),
            "67108864"
        );
    }

    #[test]
    fn swap_can_be_disabled_entirely() {
        let dir = tempfile::tempdir().unwrap();
        set_swap_max(dir.path(), 0).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("memory.swap.max")).unwrap(),
            "0"
        );
    }
}
