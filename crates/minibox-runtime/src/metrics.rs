//! Live resource metrics for containers.
//!
//! Thin read path over the cgroup subtree: every call produces a fresh
//! [`MetricsSnapshot`]; caching and derived analytics belong to external
//! consumers.

use std::path::Path;

use minibox_common::error::Result;
use minibox_common::types::MetricsSnapshot;
use minibox_core::cgroup::CgroupManager;

use crate::container::Container;

/// Collects a point-in-time usage snapshot for the given container.
///
/// # Errors
///
/// Returns an error if the container's cgroup subtree no longer exists.
pub fn collect(container: &Container, cgroup_root: &Path) -> Result<MetricsSnapshot> {
    let manager = CgroupManager::from_existing(cgroup_root, container.id.as_str());
    let snapshot = manager.read_metrics()?;
    tracing::debug!(
        id = %container.id,
        memory = snapshot.memory_current_bytes,
        cpu_usec = snapshot.cpu_usage_usec,
        pids = snapshot.pids_current,
        "metrics collected"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minibox_common::config::ContainerConfig;

    #[test]
    fn collect_reads_from_container_subtree() {
        let root = tempfile::tempdir().unwrap();
        let container = Container::from_config(ContainerConfig {
            id: Some("feed00000001".to_string()),
            ..Default::default()
        });
        let subtree = root.path().join("feed00000001");
        std::fs::create_dir_all(&subtree).unwrap();
        std::fs::write(subtree.join("memory.current"), "1048576\n").unwrap();
        std::fs::write(subtree.join("memory.max"), "max\n").unwrap();
        std::fs::write(subtree.join("cpu.stat"), "usage_usec 777\n").unwrap();
        std::fs::write(subtree.join("pids.current"), "1\n").unwrap();

        let snapshot = collect(&container, root.path()).unwrap();
        assert_eq!(snapshot.memory_current_bytes, 1_048_576);
        assert_eq!(snapshot.memory_limit_bytes, None);
        assert_eq!(snapshot.cpu_usage_usec, 777);
        assert_eq!(snapshot.pids_current, 1);
    }

    #[test]
    fn collect_fails_for_missing_subtree() {
        let root = tempfile::tempdir().unwrap();
        let container = Container::from_config(ContainerConfig::default());
        assert!(collect(&container, root.path()).is_err());
    }
}
