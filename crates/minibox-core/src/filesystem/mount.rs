//! Essential pseudo-filesystem mounts and device nodes.
//!
//! Runs inside the container's mount namespace after the root swap. Every
//! step is best-effort: an unprivileged runtime cannot mknod, and a rootfs
//! may already ship parts of `/dev`.

use std::os::unix::fs::symlink;
use std::path::Path;

use nix::mount::{MsFlags, mount};
use nix::sys::stat::{Mode, SFlag, makedev, mknod};

/// Minimal device nodes a shell expects, by major/minor number.
const DEVICE_NODES: [(&str, u32, (u64, u64)); 6] = [
    ("/dev/null", 0o666, (1, 3)),
    ("/dev/zero", 0o666, (1, 5)),
    ("/dev/random", 0o666, (1, 8)),
    ("/dev/urandom", 0o666, (1, 9)),
    ("/dev/tty", 0o666, (5, 0)),
    ("/dev/console", 0o600, (5, 1)),
];

/// Standard file descriptor symlinks into procfs.
const STDIO_LINKS: [(&str, &str); 4] = [
    ("/proc/self/fd", "/dev/fd"),
    ("/proc/self/fd/0", "/dev/stdin"),
    ("/proc/self/fd/1", "/dev/stdout"),
    ("/proc/self/fd/2", "/dev/stderr"),
];

/// Mounts the pseudo-filesystems and device nodes a container needs.
///
/// proc, a read-only sysfs, devtmpfs (plain tmpfs when no live device
/// filesystem is available), a private devpts instance, shared-memory and
/// temp tmpfs, the minimal device nodes, and the stdio symlinks.
pub fn mount_essentials() {
    for (dir, mode) in [
        ("/proc", 0o555),
        ("/sys", 0o555),
        ("/dev", 0o755),
        ("/dev/pts", 0o755),
        ("/dev/shm", 0o1777),
        ("/tmp", 0o1777),
    ] {
        make_dir(dir, mode);
    }

    try_mount(
        "proc",
        "/proc",
        "proc",
        MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC | MsFlags::MS_NODEV,
        None,
    );
    try_mount(
        "sysfs",
        "/sys",
        "sysfs",
        MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC | MsFlags::MS_NODEV | MsFlags::MS_RDONLY,
        None,
    );

    let dev_flags = MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC;
    if !try_mount("devtmpfs", "/dev", "devtmpfs", dev_flags, None) {
        let _ = try_mount("tmpfs", "/dev", "tmpfs", dev_flags, Some("mode=755"));
    }

    try_mount(
        "devpts",
        "/dev/pts",
        "devpts",
        MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC,
        Some("newinstance,ptmxmode=0666"),
    );
    try_mount(
        "shm",
        "/dev/shm",
        "tmpfs",
        MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC | MsFlags::MS_NODEV,
        Some("mode=1777"),
    );
    try_mount(
        "tmpfs",
        "/tmp",
        "tmpfs",
        MsFlags::MS_NOSUID | MsFlags::MS_NODEV,
        Some("mode=1777"),
    );

    create_device_nodes();
    create_stdio_links();
}

fn make_dir(path: &str, mode: u32) {
    use std::os::unix::fs::DirBuilderExt;
    let mut builder = std::fs::DirBuilder::new();
    if let Err(e) = builder.recursive(true).mode(mode).create(path) {
        tracing::debug!(path, "could not create directory: {e}");
    }
}

fn try_mount(
    source: &str,
    target: &str,
    fstype: &str,
    flags: MsFlags,
    data: Option<&str>,
) -> bool {
    match mount(Some(source), target, Some(fstype), flags, data) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(target, fstype, "mount failed: {e}");
            false
        }
    }
}

/// Creates the minimal device nodes when the privilege to do so is present.
fn create_device_nodes() {
    for (path, mode, (major, minor)) in DEVICE_NODES {
        let result = mknod(
            Path::new(path),
            SFlag::S_IFCHR,
            Mode::from_bits_truncate(mode),
            makedev(major, minor),
        );
        if let Err(e) = result {
            tracing::debug!(path, "could not create device node: {e}");
        }
    }
}

fn create_stdio_links() {
    for (target, link) in STDIO_LINKS {
        if let Err(e) = symlink(target, link) {
            tracing::debug!(link, "could not create stdio symlink: {e}");
        }
    }
}
