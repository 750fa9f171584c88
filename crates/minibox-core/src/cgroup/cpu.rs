//! CPU resource control via cgroups v2.
//!
//! Manages `cpu.max` and `cpu.weight`.

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};

/// Lowest weight accepted by the cgroup v2 CPU controller.
const MIN_WEIGHT: u64 = 1;
/// Highest weight accepted by the cgroup v2 CPU controller.
const MAX_WEIGHT: u64 = 10_000;

/// Sets the CPU bandwidth limit (max microseconds per period).
///
/// Writes `quota_us period_us` to `cpu.max`, where `quota_us` is the
/// maximum CPU time allowed per `period_us` window.
///
/// # Errors
///
/// Returns an error if writing to `cpu.max` fails.
pub fn set_cpu_max(cgroup_path: &Path, quota_us: u64, period_us: u64) -> Result<()> {
    let file = cgroup_path.join("cpu.max");
    let value = format!("{quota_us} {period_us}");
    std::fs::write(&file, value).map_err(|e| MiniboxError::Io {
        path: file,
        source: e,
    })?;
    tracing::debug!(quota_us, period_us, "CPU max quota set");
    Ok(())
}

/// Sets the relative CPU weight for a cgroup.
///
/// Weight is a value between 1 and 10000 that controls the relative
/// share of CPU time this cgroup receives under contention.
///
/// # Errors
///
/// Returns an error if writing to `cpu.weight` fails.
pub fn set_cpu_weight(cgroup_path: &Path, weight: u64) -> Result<()> {
    let file = cgroup_path.join("cpu.weight");
    std::fs::write(&file, weight.to_string()).map_err(|e| MiniboxError::Io {
        path: file,
        source: e,
    })?;
    tracing::debug!(weight, "CPU weight set");
    Ok(())
}

/// Rescales legacy CPU shares into the cgroup v2 weight range.
///
/// Shares are 2-262144 with a default of 1024; weights are 1-10000 with a
/// default of 100. The mapping is linear so the default lands on the
/// default.
#[must_use]
pub fn shares_to_weight(shares: u64) -> u64 {
    ((shares * 100) / 1024).clamp(MIN_WEIGHT, MAX_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shares_map_to_default_weight() {
        assert_eq!(shares_to_weight(1024), 100);
    }

    #[test]
    fn shares_below_range_clamp_to_minimum() {
        assert_eq!(shares_to_weight(2), 1);
    }

    #[test]
    fn shares_above_range_clamp_to_maximum() {
        assert_eq!(shares_to_weight(262_144), 10_000);
    }

    #[test]
    fn cpu_max_writes_quota_and_period() {
        let dir = tempfile::tempdir().unwrap();
        set_cpu_max(dir.path(), 25_000, 100_000).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("cpu.max")).unwrap(),
            "25000 100000"
        );
    }

    #[test]
    fn cpu_weight_writes_plain_value() {
        let dir = tempfile::tempdir().unwrap();
        set_cpu_weight(dir.path(), 250).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("cpu.weight")).unwrap(),
            "250"
        );
    }
}
