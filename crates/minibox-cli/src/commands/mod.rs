//! CLI command definitions and dispatch.

pub mod create;
pub mod delete;
pub mod exec;
pub mod list;
pub mod pause;
pub mod run;
pub mod start;
pub mod stats;
pub mod stop;

use clap::{Parser, Subcommand};

/// minibox — educational namespace/cgroup container runtime.
#[derive(Parser, Debug)]
#[command(name = "minibox", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a container without starting it.
    Create(create::CreateArgs),
    /// Start a created or stopped container.
    Start(start::StartArgs),
    /// Stop a running container (SIGTERM, then SIGKILL).
    Stop(stop::StopArgs),
    /// Delete a container and its resources.
    Delete(delete::DeleteArgs),
    /// List containers.
    #[command(alias = "ps")]
    List(list::ListArgs),
    /// Show live resource usage for containers.
    Stats(stats::StatsArgs),
    /// Create, start, wait for, and delete a container.
    Run(run::RunArgs),
    /// Execute a command inside a running container.
    Exec(exec::ExecArgs),
    /// Freeze all processes of a running container.
    Pause(pause::PauseArgs),
    /// Resume a paused container.
    Resume(pause::ResumeArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Create(args) => create::execute(args),
        Command::Start(args) => start::execute(args),
        Command::Stop(args) => stop::execute(args),
        Command::Delete(args) => delete::execute(args),
        Command::List(args) => list::execute(args),
        Command::Stats(args) => stats::execute(args),
        Command::Run(args) => run::execute(args),
        Command::Exec(args) => exec::execute(args),
        Command::Pause(args) => pause::execute_pause(args),
        Command::Resume(args) => pause::execute_resume(args),
    }
}
