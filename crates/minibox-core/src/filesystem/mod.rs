//! Container filesystem isolation.
//!
//! Jails the container process to its root filesystem via `pivot_root(2)`
//! and mounts the minimal set of pseudo-filesystems a shell needs. Root
//! isolation is mandatory: a container without a jailed root is a security
//! failure, never a degraded-feature case.

pub mod mount;
pub mod pivot_root;

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};
use nix::mount::MntFlags;

/// Performs full filesystem isolation for the calling process.
///
/// Refuses to proceed when `rootfs` does not exist, swaps the process root
/// with [`pivot_root::isolate_root`], then mounts the essential
/// pseudo-filesystems. Individual essential mounts are best-effort; the
/// pivot itself is not.
///
/// # Errors
///
/// Returns [`MiniboxError::Filesystem`] when the rootfs is missing or the
/// root swap fails.
pub fn setup(rootfs: &Path) -> Result<()> {
    if !rootfs.is_dir() {
        return Err(MiniboxError::Filesystem {
            path: rootfs.to_path_buf(),
            message: "rootfs does not exist".to_string(),
        });
    }

    pivot_root::isolate_root(rootfs)?;
    mount::mount_essentials();

    tracing::info!(rootfs = %rootfs.display(), "filesystem isolation complete");
    Ok(())
}

/// Best-effort cleanup of residual mounts under a container's state
/// directory.
///
/// Detaches a bind mount left at the state directory's rootfs staging path,
/// if any. Never fatal: by cleanup time the container has already reached a
/// terminal state.
pub fn cleanup(state_dir: &Path) {
    let staging = state_dir.join("rootfs");
    if let Err(e) = nix::mount::umount2(&staging, MntFlags::MNT_DETACH) {
        tracing::debug!(path = %staging.display(), "no residual mount detached: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_refuses_missing_rootfs() {
        let err = setup(Path::new("/nonexistent/rootfs")).unwrap_err();
        assert!(matches!(err, MiniboxError::Filesystem { .. }));
    }

    #[test]
    fn setup_refuses_file_as_rootfs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();
        assert!(setup(&file).is_err());
    }

    #[test]
    fn cleanup_tolerates_absent_mounts() {
        let dir = tempfile::tempdir().unwrap();
        cleanup(dir.path());
    }
}
