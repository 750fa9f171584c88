//! Root filesystem switching via `pivot_root(2)`.
//!
//! More secure than `chroot` because it actually replaces the root mount
//! rather than just the process's view of `/`.

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};
use nix::mount::{MntFlags, MsFlags, mount, umount2};

/// Directory inside the new root that briefly holds the old root.
const OLD_ROOT: &str = ".old_root";

/// Atomically swaps the process root filesystem to `rootfs`.
///
/// The mount table is first made recursively private so nothing done here
/// propagates back to the host. The rootfs must then be bind-mounted onto
/// itself because `pivot_root` requires the new root to be a mount point.
/// After the swap, the old root is lazily detached and its transient mount
/// point removed.
///
/// # Errors
///
/// Returns [`MiniboxError::Filesystem`] if any required mount operation or
/// the `pivot_root` call itself fails.
pub fn isolate_root(rootfs: &Path) -> Result<()> {
    let fs_err = |path: &Path, message: String| MiniboxError::Filesystem {
        path: path.to_path_buf(),
        message,
    };

    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| fs_err(Path::new("/"), format!("cannot make mounts private: {e}")))?;

    mount(
        Some(rootfs),
        rootfs,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| fs_err(rootfs, format!("cannot bind mount rootfs: {e}")))?;

    let put_old = rootfs.join(OLD_ROOT);
    std::fs::create_dir_all(&put_old).map_err(|e| MiniboxError::Io {
        path: put_old.clone(),
        source: e,
    })?;

    nix::unistd::pivot_root(rootfs, &put_old).map_err(|e| {
        let _ = std::fs::remove_dir(&put_old);
        fs_err(rootfs, format!("pivot_root failed: {e}"))
    })?;

    nix::unistd::chdir("/")
        .map_err(|e| fs_err(Path::new("/"), format!("chdir into new root failed: {e}")))?;

    let old_root = Path::new("/").join(OLD_ROOT);
    if let Err(e) = umount2(&old_root, MntFlags::MNT_DETACH) {
        tracing::warn!("could not detach old root: {e}");
    }
    if let Err(e) = std::fs::remove_dir(&old_root) {
        tracing::warn!("could not remove old root mount point: {e}");
    }

    tracing::info!(rootfs = %rootfs.display(), "pivot_root complete");
    Ok(())
}
