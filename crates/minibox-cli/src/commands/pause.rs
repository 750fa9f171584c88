//! `minibox pause` / `minibox resume` — Freeze and thaw containers.

use clap::Args;
use minibox_runtime::engine::Engine;

/// Arguments for the `pause` command.
#[derive(Args, Debug)]
pub struct PauseArgs {
    /// Container ID or name.
    pub container: String,
}

/// Arguments for the `resume` command.
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Container ID or name.
    pub container: String,
}

/// Executes the `pause` command.
///
/// # Errors
///
/// Returns an error if the container is not found or not running.
pub fn execute_pause(args: PauseArgs) -> anyhow::Result<()> {
    let engine = Engine::new();
    let mut container = engine
        .get(&args.container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    engine
        .pause(&mut container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Paused container {}", container.id);
    Ok(())
}

/// Executes the `resume` command.
///
/// # Errors
///
/// Returns an error if the container is not found or not paused.
pub fn execute_resume(args: ResumeArgs) -> anyhow::Result<()> {
    let engine = Engine::new();
    let mut container = engine
        .get(&args.container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    engine
        .resume(&mut container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Resumed container {}", container.id);
    Ok(())
}
