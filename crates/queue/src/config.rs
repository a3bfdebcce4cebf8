// SPDX-License-Identifier: MIT

//! Task queue sizing, resolved from environment variables the way
//! `oj-daemon::env` resolves daemon configuration.

/// Bounded channel capacity, fixed per spec.
pub const CHANNEL_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub channel_capacity: usize,
    pub auto_scale: bool,
}

impl QueueConfig {
    /// Derive min/max workers from logical CPU count, then apply
    /// `QUEUE_WORKERS` / `QUEUE_AUTO_SCALE` overrides.
    pub fn from_env() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let (mut min_workers, mut max_workers) = worker_bounds_for_cpus(cpus);

        if let Some(fixed) = std::env::var("QUEUE_WORKERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            min_workers = fixed;
            max_workers = fixed;
        }

        let auto_scale = std::env::var("QUEUE_AUTO_SCALE")
            .map(|v| v != "false")
            .unwrap_or(true);

        Self {
            min_workers,
            max_workers,
            channel_capacity: CHANNEL_CAPACITY,
            auto_scale,
        }
    }
}

fn worker_bounds_for_cpus(cpus: usize) -> (usize, usize) {
    if cpus <= 2 {
        (1, 2)
    } else if cpus <= 4 {
        (1, 3)
    } else if cpus <= 8 {
        (2, 4)
    } else {
        (2, 6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_table_matches_spec() {
        assert_eq!(worker_bounds_for_cpus(1), (1, 2));
        assert_eq!(worker_bounds_for_cpus(2), (1, 2));
        assert_eq!(worker_bounds_for_cpus(3), (1, 3));
        assert_eq!(worker_bounds_for_cpus(4), (1, 3));
        assert_eq!(worker_bounds_for_cpus(5), (2, 4));
        assert_eq!(worker_bounds_for_cpus(8), (2, 4));
        assert_eq!(worker_bounds_for_cpus(9), (2, 6));
        assert_eq!(worker_bounds_for_cpus(64), (2, 6));
    }

    #[test]
    fn queue_workers_override_fixes_min_and_max() {
        std::env::set_var("QUEUE_WORKERS", "5");
        let cfg = QueueConfig::from_env();
        assert_eq!(cfg.min_workers, 5);
        assert_eq!(cfg.max_workers, 5);
        std::env::remove_var("QUEUE_WORKERS");
    }

    #[test]
    fn queue_auto_scale_false_disables_scaling() {
        std::env::set_var("QUEUE_AUTO_SCALE", "false");
        let cfg = QueueConfig::from_env();
        assert!(!cfg.auto_scale);
        std::env::remove_var("QUEUE_AUTO_SCALE");
    }
}
