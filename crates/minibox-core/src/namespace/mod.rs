//! Linux namespace management for container isolation.
//!
//! A container's init process is created with `clone(2)` so that it begins
//! execution inside the new namespaces atomically. When an identity-mapping
//! (user) namespace is requested, the parent and child rendezvous over a
//! pipe: the child blocks until the parent has written the UID/GID maps,
//! because a fresh user namespace carries no privileges until its mappings
//! exist.

pub mod enter;
pub mod user;

use std::ffi::CString;
use std::os::fd::AsRawFd;

use minibox_common::config::ContainerConfig;
use minibox_common::constants::{DEFAULT_COMMAND, EXIT_EXEC_FAILED};
use minibox_common::error::{MiniboxError, Result};
use nix::sched::CloneFlags;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;

pub use enter::{NamespaceKind, enter};

/// Stack size for the cloned init process.
const STACK_SIZE: usize = 1024 * 1024;

/// Computes the namespace flag set for a container configuration.
///
/// PID, mount, UTS, IPC, and cgroup namespaces are always created; network
/// and user namespaces are opt-in.
#[must_use]
pub fn clone_flags(config: &ContainerConfig) -> CloneFlags {
    let mut flags = CloneFlags::CLONE_NEWPID
        | CloneFlags::CLONE_NEWNS
        | CloneFlags::CLONE_NEWUTS
        | CloneFlags::CLONE_NEWIPC
        | CloneFlags::CLONE_NEWCGROUP;
    if config.enable_network {
        flags |= CloneFlags::CLONE_NEWNET;
    }
    if config.enable_user_ns {
        flags |= CloneFlags::CLONE_NEWUSER;
    }
    flags
}

/// Spawns a container init process inside a fresh set of namespaces.
///
/// The child blocks on the sync pipe until this process has written its
/// identity mappings (when a user namespace was requested), then sets the
/// hostname, isolates the filesystem, resets its environment, and execs the
/// configured command. Namespace-creation failure is a hard error and leaves
/// no child behind.
///
/// # Errors
///
/// Returns an error if the pipe or `clone(2)` fails, or if the identity
/// mapping writes are rejected (the child is killed and reaped first).
pub fn spawn_isolated(config: &ContainerConfig) -> Result<Pid> {
    let (reader, writer) = nix::unistd::pipe().map_err(|e| MiniboxError::Process {
        message: format!("failed to create sync pipe: {e}"),
    })?;
    let writer_raw = writer.as_raw_fd();

    let mut stack = vec![0u8; STACK_SIZE];
    let flags = clone_flags(config);

    let child = {
        let cb = Box::new(|| {
            // Close the inherited write end so a dying parent unblocks the
            // read below instead of deadlocking the child.
            // SAFETY: writer_raw is the raw fd of the inherited pipe write
            // end; the parent's own descriptor is unaffected by this close.
            unsafe {
                let _ = libc::close(writer_raw);
            }
            let mut buf = [0u8; 1];
            match nix::unistd::read(&reader, &mut buf) {
                Ok(1) => child_init(config),
                _ => {
                    tracing::error!("sync pipe closed before parent signal");
                    1
                }
            }
        });
        // SAFETY: the callback only touches memory owned by this stack
        // frame, which outlives the child because the parent blocks in
        // waitpid on every failure path and otherwise returns the PID
        // without freeing config.
        unsafe { nix::sched::clone(cb, &mut stack, flags, Some(libc::SIGCHLD)) }.map_err(|e| {
            match e {
                nix::errno::Errno::EPERM => MiniboxError::PermissionDenied {
                    message: format!("namespace creation requires privilege: {e}"),
                },
                other => MiniboxError::Namespace {
                    message: format!("clone failed: {other}"),
                },
            }
        })?
    };

    tracing::info!(pid = child.as_raw(), "created container init process");

    // The parent still holds host privileges here; the just-created user
    // namespace has none until these mappings land.
    if config.enable_user_ns {
        if let Err(e) = user::write_id_mappings(child, config.uid_map, config.gid_map) {
            let _ = kill(child, Signal::SIGKILL);
            let _ = waitpid(child, None);
            return Err(e);
        }
    }

    // One byte releases the child; the write cannot be observed before the
    // mapping writes above are durable.
    nix::unistd::write(&writer, b"x").map_err(|e| {
        let _ = kill(child, Signal::SIGKILL);
        let _ = waitpid(child, None);
        MiniboxError::Process {
            message: format!("failed to signal container init: {e}"),
        }
    })?;

    Ok(child)
}

/// Runs inside the new namespaces after the parent's release signal.
///
/// Returns an exit code instead of erroring: a failure here is fatal to the
/// child only.
fn child_init(config: &ContainerConfig) -> isize {
    if let Some(hostname) = &config.hostname {
        if !hostname.is_empty() {
            if let Err(e) = nix::unistd::sethostname(hostname) {
                tracing::error!(hostname, "failed to set hostname: {e}");
                return 1;
            }
        }
    }

    if !config.rootfs.as_os_str().is_empty() {
        if let Err(e) = crate::filesystem::setup(&config.rootfs) {
            tracing::error!("filesystem isolation failed: {e}");
            return 1;
        }
    }

    match exec_command(&config.command, &config.env) {
        Ok(never) => match never {},
        Err(e) => {
            tracing::error!("failed to exec container command: {e}");
            isize::try_from(EXIT_EXEC_FAILED).unwrap_or(1)
        }
    }
}

/// Replaces the child with the target command under a reset environment.
fn exec_command(command: &[String], extra_env: &[String]) -> Result<std::convert::Infallible> {
    let argv = if command.is_empty() {
        vec![DEFAULT_COMMAND.to_string()]
    } else {
        command.to_vec()
    };

    let mut env = vec![
        "PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin".to_string(),
        "TERM=xterm-256color".to_string(),
        "HOME=/root".to_string(),
    ];
    env.extend(extra_env.iter().filter(|e| e.contains('=')).cloned());

    let c_argv = to_cstrings(&argv)?;
    let c_env = to_cstrings(&env)?;
    nix::unistd::execvpe(&c_argv[0], &c_argv, &c_env).map_err(|e| MiniboxError::Process {
        message: format!("execvpe {} failed: {e}", argv[0]),
    })
}

fn to_cstrings(values: &[String]) -> Result<Vec<CString>> {
    values
        .iter()
        .map(|v| {
            CString::new(v.as_str()).map_err(|_| MiniboxError::InvalidArgument {
                message: format!("embedded NUL in argument: {v:?}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ContainerConfig {
        ContainerConfig::default()
    }

    #[test]
    fn default_flags_cover_mandatory_namespaces() {
        let flags = clone_flags(&base_config());
        assert!(flags.contains(CloneFlags::CLONE_NEWPID));
        assert!(flags.contains(CloneFlags::CLONE_NEWNS));
        assert!(flags.contains(CloneFlags::CLONE_NEWUTS));
        assert!(flags.contains(CloneFlags::CLONE_NEWIPC));
        assert!(flags.contains(CloneFlags::CLONE_NEWCGROUP));
        assert!(!flags.contains(CloneFlags::CLONE_NEWNET));
        assert!(!flags.contains(CloneFlags::CLONE_NEWUSER));
    }

    #[test]
    fn optional_flags_are_opt_in() {
        let mut config = base_config();
        config.enable_network = true;
        config.enable_user_ns = true;
        let flags = clone_flags(&config);
        assert!(flags.contains(CloneFlags::CLONE_NEWNET));
        assert!(flags.contains(CloneFlags::CLONE_NEWUSER));
    }

    #[test]
    fn cstring_conversion_rejects_embedded_nul() {
        let result = to_cstrings(&["ok".to_string(), "bad\0arg".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn cstring_conversion_preserves_order() {
        let argv = to_cstrings(&["/bin/sh".to_string(), "-c".to_string()]).unwrap();
        assert_eq!(argv[0].to_str().unwrap(), "/bin/sh");
        assert_eq!(argv[1].to_str().unwrap(), "-c");
    }
}
