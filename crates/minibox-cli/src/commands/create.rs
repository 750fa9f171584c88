//! `minibox create` — Create a container without starting it.

use std::path::PathBuf;

use clap::Args;
use minibox_common::config::ContainerConfig;
use minibox_common::types::{IdMapping, ResourceLimits};
use minibox_runtime::engine::Engine;

/// Container definition flags, shared between `create` and `run`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Container name (also used as the ID when given).
    #[arg(long)]
    pub name: Option<String>,

    /// Path to the root filesystem directory.
    #[arg(long)]
    pub rootfs: Option<PathBuf>,

    /// Hostname inside the container (defaults to the name).
    #[arg(long)]
    pub hostname: Option<String>,

    /// Memory limit in bytes.
    #[arg(long)]
    pub memory: Option<u64>,

    /// CPU limit as a percentage of one core (0-100).
    #[arg(long)]
    pub cpus: Option<u64>,

    /// Maximum number of processes.
    #[arg(long)]
    pub pids: Option<u64>,

    /// Environment variable as KEY=VALUE (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Shell command to run as the init process (`/bin/sh -c <CMD>`).
    #[arg(long)]
    pub cmd: Option<String>,

    /// Create a network namespace (no interface wiring is done).
    #[arg(long)]
    pub network: bool,

    /// Create a user namespace mapping container root to the current user.
    #[arg(long)]
    pub userns: bool,
}

impl CreateArgs {
    /// Translates the CLI flags into a container configuration.
    #[must_use]
    pub fn to_config(&self) -> ContainerConfig {
        let command = self.cmd.as_ref().map_or_else(Vec::new, |cmd| {
            vec!["/bin/sh".to_string(), "-c".to_string(), cmd.clone()]
        });

        // Percent of one core; cgroup cpu.max takes quota per 100ms period.
        let cpu_quota_us = self.cpus.map_or(0, |percent| percent * 1000);

        ContainerConfig {
            id: self.name.clone(),
            name: self.name.clone(),
            hostname: self.hostname.clone(),
            rootfs: self.rootfs.clone().unwrap_or_default(),
            command,
            env: self.env.clone(),
            limits: ResourceLimits {
                memory_bytes: self.memory.unwrap_or(0),
                cpu_quota_us,
                pids_max: self.pids.unwrap_or(0),
                ..Default::default()
            },
            enable_network: self.network,
            enable_user_ns: self.userns,
            uid_map: IdMapping {
                container_id: 0,
                host_id: nix::unistd::geteuid().as_raw(),
            },
            gid_map: IdMapping {
                container_id: 0,
                host_id: nix::unistd::getegid().as_raw(),
            },
        }
    }
}

/// Executes the `create` command.
///
/// # Errors
///
/// Returns an error if the container cannot be created.
pub fn execute(args: CreateArgs) -> anyhow::Result<()> {
    let engine = Engine::new();
    let container = engine
        .create(args.to_config())
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Created container: {}", container.id);
    Ok(())
}
