//! Entering namespaces of an already-running process via `setns(2)`.
//!
//! Used only for injecting a command into a running container, never for
//! initial creation. `setns` mutates the calling process's namespace
//! membership, so callers confine it to a freshly forked helper.

use std::fs::File;
use std::path::PathBuf;

use minibox_common::error::{MiniboxError, Result};
use nix::sched::CloneFlags;
use nix::unistd::Pid;

/// One category of kernel namespace, named as under `/proc/<pid>/ns/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    /// Mount table.
    Mount,
    /// Hostname and domain name.
    Uts,
    /// System V IPC and POSIX message queues.
    Ipc,
    /// View of the cgroup hierarchy.
    Cgroup,
    /// Network stack.
    Net,
    /// UID/GID identity mappings.
    User,
    /// Process ID numbering.
    ///
    /// Entering this does not renumber the calling process; only new
    /// children see the namespace's numbering. The exec-into-container
    /// path deliberately never enters it.
    Pid,
}

impl NamespaceKind {
    /// Returns the `/proc/<pid>/ns/` entry name for this namespace.
    #[must_use]
    pub const fn proc_name(self) -> &'static str {
        match self {
            Self::Mount => "mnt",
            Self::Uts => "uts",
            Self::Ipc => "ipc",
            Self::Cgroup => "cgroup",
            Self::Net => "net",
            Self::User => "user",
            Self::Pid => "pid",
        }
    }

    const fn clone_flag(self) -> CloneFlags {
        match self {
            Self::Mount => CloneFlags::CLONE_NEWNS,
            Self::Uts => CloneFlags::CLONE_NEWUTS,
            Self::Ipc => CloneFlags::CLONE_NEWIPC,
            Self::Cgroup => CloneFlags::CLONE_NEWCGROUP,
            Self::Net => CloneFlags::CLONE_NEWNET,
            Self::User => CloneFlags::CLONE_NEWUSER,
            Self::Pid => CloneFlags::CLONE_NEWPID,
        }
    }

    /// Returns the namespace file path for the given process.
    #[must_use]
    pub fn proc_path(self, pid: Pid) -> PathBuf {
        PathBuf::from(format!("/proc/{}/ns/{}", pid.as_raw(), self.proc_name()))
    }
}

/// Switches the calling process into one namespace of the target process.
///
/// # Errors
///
/// Returns [`MiniboxError::NotFound`] when the namespace file no longer
/// resolves (the target has exited), [`MiniboxError::PermissionDenied`]
/// when the caller lacks privilege, and [`MiniboxError::Namespace`] for
/// other `setns` failures.
pub fn enter(pid: Pid, kind: NamespaceKind) -> Result<()> {
    let path = kind.proc_path(pid);
    let file = File::open(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MiniboxError::NotFound {
                kind: "namespace",
                id: path.display().to_string(),
            }
        } else {
            MiniboxError::Io { path, source: e }
        }
    })?;

    nix::sched::setns(&file, kind.clone_flag()).map_err(|e| match e {
        nix::errno::Errno::EPERM => MiniboxError::PermissionDenied {
            message: format!("setns {} of PID {}: {e}", kind.proc_name(), pid.as_raw()),
        },
        other => MiniboxError::Namespace {
            message: format!(
                "setns {} of PID {} failed: {other}",
                kind.proc_name(),
                pid.as_raw()
            ),
        },
    })?;
    tracing::debug!(pid = pid.as_raw(), ns = kind.proc_name(), "entered namespace");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_path_matches_kernel_layout() {
        let path = NamespaceKind::Mount.proc_path(Pid::from_raw(42));
        assert_eq!(path, PathBuf::from("/proc/42/ns/mnt"));
    }

    #[test]
    fn proc_names_cover_all_kinds() {
        let kinds = [
            (NamespaceKind::Mount, "mnt"),
            (NamespaceKind::Uts, "uts"),
            (NamespaceKind::Ipc, "ipc"),
            (NamespaceKind::Cgroup, "cgroup"),
            (NamespaceKind::Net, "net"),
            (NamespaceKind::User, "user"),
            (NamespaceKind::Pid, "pid"),
        ];
        for (kind, name) in kinds {
            assert_eq!(kind.proc_name(), name);
        }
    }

    #[test]
    fn enter_reports_missing_target_as_not_found() {
        // PID numbers above the default pid_max never resolve in /proc.
        let err = enter(Pid::from_raw(i32::MAX), NamespaceKind::Ipc).unwrap_err();
        assert!(matches!(
            err,
            minibox_common::error::MiniboxError::NotFound { .. }
        ));
    }
}
