//! Executing additional commands inside a running container.
//!
//! A helper process is forked, enters the target's mount, UTS, IPC, and
//! cgroup namespaces, attaches itself to the container's cgroup subtree,
//! and execs the requested command. The PID namespace is deliberately not
//! entered: `setns` does not renumber the calling process, so the helper
//! stays an ordinary process from the caller's perspective while seeing the
//! container's filesystem and hostname.
//!
//! Entering a user-namespaced target is unresolved: the helper joins only
//! the four namespaces above, so its identity view inside such a container
//! may be invalid.

use std::ffi::CString;

use minibox_common::constants::DEFAULT_COMMAND;
use minibox_common::error::{MiniboxError, Result};
use minibox_core::cgroup::CgroupManager;
use minibox_core::namespace::{NamespaceKind, enter};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid};

/// Namespaces the helper joins, in entry order.
const EXEC_NAMESPACES: [NamespaceKind; 4] = [
    NamespaceKind::Mount,
    NamespaceKind::Uts,
    NamespaceKind::Ipc,
    NamespaceKind::Cgroup,
];

/// Runs `command` inside the namespaces of the process `target_pid`.
///
/// Blocks until the injected command exits and returns its exit code,
/// following the host convention that a signal-terminated process reports
/// `128 + signal`. A non-zero exit code is an operational result for the
/// caller, not a runtime error.
///
/// # Errors
///
/// Returns [`MiniboxError::Process`] if the fork or the wait fails.
pub fn exec_in_container(
    target_pid: u32,
    cgroup: &CgroupManager,
    command: &[String],
) -> Result<i32> {
    let argv = if command.is_empty() {
        vec![DEFAULT_COMMAND.to_string()]
    } else {
        command.to_vec()
    };
    tracing::info!(target_pid, cmd = ?argv, "exec into running container");

    // SAFETY: the child branch only calls async-signal-safe-adjacent
    // operations (setns, file writes, exec) and terminates via exec or
    // process::exit without returning into the caller's stack.
    let fork_result = unsafe { nix::unistd::fork() }.map_err(|e| MiniboxError::Process {
        message: format!("fork for exec failed: {e}"),
    })?;

    match fork_result {
        ForkResult::Child => {
            exec_helper(Pid::from_raw(i32::try_from(target_pid).unwrap_or(0)), cgroup, &argv);
        }
        ForkResult::Parent { child } => wait_for_exit(child),
    }
}

/// Helper process body; never returns.
fn exec_helper(target: Pid, cgroup: &CgroupManager, argv: &[String]) -> ! {
    for kind in EXEC_NAMESPACES {
        if let Err(e) = enter(target, kind) {
            // The command may still work in a partially entered set.
            tracing::warn!(ns = kind.proc_name(), "could not enter namespace: {e}");
        }
    }

    let self_pid = std::process::id();
    if let Err(e) = cgroup.attach(self_pid) {
        tracing::warn!("injected process not attached to cgroup: {e}");
    }

    if let Err(e) = nix::unistd::chdir("/") {
        tracing::warn!("could not chdir into container root: {e}");
    }

    let c_argv: Vec<CString> = argv
        .iter()
        .filter_map(|a| CString::new(a.as_str()).ok())
        .collect();
    if c_argv.len() == argv.len() {
        let _ = nix::unistd::execvp(&c_argv[0], &c_argv);
    }
    tracing::error!(cmd = ?argv, "exec of injected command failed");
    std::process::exit(minibox_common::constants::EXIT_EXEC_FAILED);
}

/// Waits for the helper and maps its wait status to an exit code.
fn wait_for_exit(child: Pid) -> Result<i32> {
    match waitpid(child, None).map_err(|e| MiniboxError::Process {
        message: format!("wait for exec helper failed: {e}"),
    })? {
        WaitStatus::Exited(_, code) => Ok(code),
        WaitStatus::Signaled(_, signal, _) => Ok(128 + signal as i32),
        other => Err(MiniboxError::Process {
            message: format!("unexpected wait status for exec helper: {other:?}"),
        }),
    }
}
