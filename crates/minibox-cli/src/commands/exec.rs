//! `minibox exec` — Execute a command inside a running container.

use clap::Args;
use minibox_runtime::engine::Engine;

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Container ID or name.
    pub container: String,

    /// Command to execute; an interactive `/bin/sh` when empty.
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,

    /// Shell command form (`/bin/sh -c <CMD>`), instead of a command vector.
    #[arg(long, conflicts_with = "command")]
    pub cmd: Option<String>,
}

/// Executes the `exec` command.
///
/// Joins the target container's namespaces and cgroup, runs the command
/// with inherited stdio, and exits with the command's exit code.
///
/// # Errors
///
/// Returns an error if the container is not running or its init process is
/// gone.
pub fn execute(args: ExecArgs) -> anyhow::Result<()> {
    let command = match args.cmd {
        Some(cmd) => vec!["/bin/sh".to_string(), "-c".to_string(), cmd],
        None => args.command,
    };

    let engine = Engine::new();
    let container = engine
        .get(&args.container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let exit_code = engine
        .exec(&container, &command)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    std::process::exit(exit_code);
}
