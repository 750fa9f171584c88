//! `minibox start` — Start a created or stopped container.

use std::path::PathBuf;

use clap::Args;
use minibox_runtime::engine::Engine;

/// Arguments for the `start` command.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Container ID or name.
    pub container: String,

    /// Path to the root filesystem directory.
    ///
    /// The persisted record carries only identity and state, so the rootfs
    /// must be supplied again when starting a rediscovered container.
    #[arg(long)]
    pub rootfs: PathBuf,

    /// Shell command to run as the init process (`/bin/sh -c <CMD>`).
    #[arg(long)]
    pub cmd: Option<String>,

    /// Environment variable as KEY=VALUE (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
}

/// Executes the `start` command.
///
/// # Errors
///
/// Returns an error if the container is not found or cannot be started.
pub fn execute(args: StartArgs) -> anyhow::Result<()> {
    let engine = Engine::new();
    let mut container = engine
        .get(&args.container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    container.config.rootfs = args.rootfs;
    if let Some(cmd) = args.cmd {
        container.config.command = vec!["/bin/sh".to_string(), "-c".to_string(), cmd];
    }
    container.config.env = args.env;

    engine
        .start(&mut container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!(
        "Started container {} (PID {})",
        container.id,
        container.pid.unwrap_or(0)
    );
    Ok(())
}
