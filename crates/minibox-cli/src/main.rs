//! # minibox — educational container runtime CLI
//!
//! Daemon-less runtime for Linux namespaces and cgroups v2.
//! Single binary for creating, running, and inspecting containers.

mod commands;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if !nix::unistd::geteuid().is_root() {
        eprintln!("Warning: running without root privileges, isolation features may fail.");
    }

    let cli = Cli::parse();
    commands::execute(cli)
}
