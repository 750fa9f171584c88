//! `minibox delete` — Delete a container and its resources.

use clap::Args;
use minibox_runtime::engine::Engine;

/// Arguments for the `delete` command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Container ID or name.
    pub container: String,
}

/// Executes the `delete` command.
///
/// # Errors
///
/// Returns an error only if the container is not found; deletion of an
/// existing container always succeeds.
pub fn execute(args: DeleteArgs) -> anyhow::Result<()> {
    let engine = Engine::new();
    let mut container = engine
        .get(&args.container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    engine
        .delete(&mut container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Deleted container {}", container.id);
    Ok(())
}
