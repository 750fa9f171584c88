//! `minibox stats` — Show live resource usage for containers.

use clap::Args;
use minibox_runtime::container::Container;
use minibox_runtime::engine::Engine;

use crate::output::format_bytes;

/// Arguments for the `stats` command.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Container ID or name; all containers when omitted.
    pub container: Option<String>,

    /// Emit the snapshot as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `stats` command.
///
/// Containers whose cgroup subtree no longer exists are skipped.
///
/// # Errors
///
/// Returns an error if the state directory cannot be read or a named
/// container is not found.
pub fn execute(args: StatsArgs) -> anyhow::Result<()> {
    let engine = Engine::new();
    let targets: Vec<Container> = match args.container {
        Some(ref id_or_name) => {
            vec![engine.get(id_or_name).map_err(|e| anyhow::anyhow!("{e}"))?]
        }
        None => engine.list().map_err(|e| anyhow::anyhow!("{e}"))?,
    };

    for container in &targets {
        let Ok(snapshot) = engine.metrics(container) else {
            continue;
        };
        if args.json {
            let mut value = serde_json::to_value(&snapshot)?;
            if let Some(object) = value.as_object_mut() {
                let _ = object.insert("id".into(), container.id.as_str().into());
                let _ = object.insert("name".into(), container.name.clone().into());
            }
            println!("{}", serde_json::to_string(&value)?);
        } else {
            println!("Container: {} ({})", container.name, container.id);
            println!(
                "  Memory: {} / {} (peak {})",
                format_bytes(snapshot.memory_current_bytes),
                snapshot
                    .memory_limit_bytes
                    .map_or_else(|| "unlimited".to_string(), format_bytes),
                format_bytes(snapshot.memory_peak_bytes)
            );
            println!("  CPU: {} us", snapshot.cpu_usage_usec);
            println!(
                "  PIDs: {} / {}",
                snapshot.pids_current,
                snapshot
                    .pids_limit
                    .map_or_else(|| "unlimited".to_string(), |v| v.to_string())
            );
            println!();
        }
    }
    Ok(())
}
