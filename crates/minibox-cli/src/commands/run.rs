//! `minibox run` — Create, start, wait for, and delete a container.

use clap::Args;
use minibox_runtime::engine::Engine;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;

use super::create::CreateArgs;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Container definition flags.
    #[command(flatten)]
    pub spec: CreateArgs,

    /// Command to run as the init process; `/bin/sh` when empty.
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,
}

/// Executes the `run` command.
///
/// The container is deleted after its init process exits, so `run` leaves
/// nothing behind. The process exit code becomes the CLI exit code.
///
/// # Errors
///
/// Returns an error if creation or start fails.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let mut config = args.spec.to_config();
    if !args.command.is_empty() {
        config.command = args.command;
    }

    let engine = Engine::new();
    let mut container = engine.create(config).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Created container: {}", container.id);

    if let Err(e) = engine.start(&mut container) {
        let _ = engine.delete(&mut container);
        return Err(anyhow::anyhow!("{e}"));
    }
    let pid = container.pid.unwrap_or(0);
    println!("Started container (PID {pid})");
    tracing::debug!(pid, "waiting for init process");

    let exit_code = wait_for_init(pid);
    println!("Container exited with code {exit_code}");

    engine
        .delete(&mut container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    std::process::exit(exit_code);
}

/// Blocks until the init process exits; killing signals map to 128+signal.
fn wait_for_init(pid: u32) -> i32 {
    let pid = Pid::from_raw(i32::try_from(pid).unwrap_or(0));
    match waitpid(pid, None) {
        Ok(WaitStatus::Exited(_, code)) => code,
        Ok(WaitStatus::Signaled(_, signal, _)) => 128 + signal as i32,
        Ok(_) | Err(_) => 1,
    }
}
