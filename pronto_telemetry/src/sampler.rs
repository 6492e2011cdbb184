use sysinfo::System;

/// Reads host CPU and memory utilization for the export pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSampler;

impl ResourceSampler {
    pub fn new() -> Self {
        Self
    }

    /// One-minute load average spread over the logical core count, as a
    /// percentage. Platforms without a load average report zero.
    pub fn cpu_percent(&self) -> f64 {
        let cores = num_cpus::get().max(1);
        let load = System::load_average().one;
        round2(load / cores as f64 * 100.0)
    }

    /// Occupied fraction of physical memory (total minus free), as a
    /// percentage.
    pub fn memory_percent(&self) -> f64 {
        let mut sys = System::new();
        sys.refresh_memory();

        let total = sys.total_memory(); // sysinfo v0.30 returns bytes directly
        if total == 0 {
            return 0.0;
        }
        let occupied = total.saturating_sub(sys.free_memory());

        round2(occupied as f64 / total as f64 * 100.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
