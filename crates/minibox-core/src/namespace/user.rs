//! Identity mapping writes for user namespaces.
//!
//! A freshly created user namespace has no UID/GID mappings and therefore
//! no usable identity. The parent, which still holds host privileges,
//! writes single-entry ranges into `/proc/<pid>/uid_map` and `gid_map`
//! before releasing the child. `setgroups` must be denied first for
//! unprivileged namespaces to accept a gid_map.

use std::fs;

use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::IdMapping;
use nix::unistd::Pid;

/// Writes UID and GID mappings for a child's user namespace.
///
/// # Errors
///
/// Returns [`MiniboxError::Namespace`] when either privileged map write is
/// rejected. A failed `setgroups` write is only a warning; the kernel may
/// have denied it already.
pub fn write_id_mappings(pid: Pid, uid_map: IdMapping, gid_map: IdMapping) -> Result<()> {
    let proc_dir = format!("/proc/{}", pid.as_raw());

    if let Err(e) = fs::write(format!("{proc_dir}/setgroups"), "deny") {
        tracing::warn!(pid = pid.as_raw(), "could not deny setgroups: {e}");
    }

    write_map(&format!("{proc_dir}/uid_map"), uid_map)?;
    tracing::info!(
        pid = pid.as_raw(),
        container_uid = uid_map.container_id,
        host_uid = uid_map.host_id,
        "wrote UID mapping"
    );

    write_map(&format!("{proc_dir}/gid_map"), gid_map)?;
    tracing::info!(
        pid = pid.as_raw(),
        container_gid = gid_map.container_id,
        host_gid = gid_map.host_id,
        "wrote GID mapping"
    );

    Ok(())
}

fn write_map(path: &str, mapping: IdMapping) -> Result<()> {
    let entry = format!("{} {} 1\n", mapping.container_id, mapping.host_id);
    fs::write(path, entry).map_err(|e| MiniboxError::Namespace {
        message: format!("identity mapping write to {path} rejected: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_write_to_missing_process_fails() {
        let mapping = IdMapping {
            container_id: 0,
            host_id: 1000,
        };
        let err = write_id_mappings(Pid::from_raw(i32::MAX), mapping, mapping).unwrap_err();
        assert!(matches!(err, MiniboxError::Namespace { .. }));
    }

    #[test]
    fn map_entry_is_single_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uid_map");
        let mapping = IdMapping {
            container_id: 0,
            host_id: 1000,
        };
        write_map(path.to_str().unwrap(), mapping).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "0 1000 1\n");
    }
}
