//! `minibox stop` — Stop a running container.

use clap::Args;
use minibox_runtime::engine::Engine;

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Container ID or name.
    pub container: String,

    /// Seconds to wait after SIGTERM before sending SIGKILL.
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if the container is not found or its record cannot be
/// updated.
pub fn execute(args: StopArgs) -> anyhow::Result<()> {
    let engine = Engine::new();
    let mut container = engine
        .get(&args.container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    engine
        .stop(&mut container, args.timeout)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Stopped container {}", container.id);
    Ok(())
}
