//! `minibox list` — List containers.

use clap::Args;
use minibox_common::types::ContainerState;
use minibox_runtime::engine::Engine;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show only running containers.
    #[arg(short, long)]
    pub running: bool,
}

/// Executes the `list` command.
///
/// # Errors
///
/// Returns an error if the state directory cannot be read.
pub fn execute(args: ListArgs) -> anyhow::Result<()> {
    let engine = Engine::new();
    let containers = engine.list().map_err(|e| anyhow::anyhow!("{e}"))?;

    let filtered: Vec<_> = if args.running {
        containers
            .into_iter()
            .filter(|c| c.state == ContainerState::Running)
            .collect()
    } else {
        containers
    };

    if filtered.is_empty() {
        println!("No containers found.");
        return Ok(());
    }

    println!("{:<14} {:<20} {:<10} {:<8}", "ID", "NAME", "STATE", "PID");
    for c in &filtered {
        println!(
            "{:<14} {:<20} {:<10} {:<8}",
            c.id,
            c.name,
            c.state,
            c.pid.map_or_else(|| "-".to_string(), |p| p.to_string())
        );
    }
    println!("\nTotal: {} containers", filtered.len());
    Ok(())
}
