use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::{debug, warn};

use vigil_types::{CpuReading, MemoryReading, MetricsSnapshot, PartitionUsage};

/// 采集一次系统指标快照
///
/// Blocking: CPU usage needs two refreshes separated by the sysinfo minimum
/// interval. Individual readings that cannot be produced degrade to `None`
/// or an empty list instead of failing the whole snapshot.
pub fn collect() -> MetricsSnapshot {
    let mut system = System::new();

    let cpu = collect_cpu(&mut system);
    let memory = collect_memory(&mut system);
    let partitions = collect_partitions();

    debug!(
        "Snapshot collected: cpu={:?} memory={:?} partitions={}",
        cpu.as_ref().map(|c| c.usage_percent),
        memory.as_ref().map(|m| m.used_percent),
        partitions.len()
    );

    MetricsSnapshot {
        cpu,
        memory,
        partitions,
    }
}

fn collect_cpu(system: &mut System) -> Option<CpuReading> {
    // 两次刷新之间需要间隔才能得到有效使用率
    system.refresh_cpu();
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_cpu();

    let cpus = system.cpus();
    if cpus.is_empty() {
        warn!("No CPUs reported, skipping CPU reading");
        return None;
    }

    Some(CpuReading {
        usage_percent: system.global_cpu_info().cpu_usage() as f64,
        physical_cores: system.physical_core_count().unwrap_or(cpus.len()),
        logical_cores: cpus.len(),
    })
}

fn collect_memory(system: &mut System) -> Option<MemoryReading> {
    system.refresh_memory();

    let total = system.total_memory();
    if total == 0 {
        warn!("Total memory reported as 0, skipping memory reading");
        return None;
    }

    let available = system.available_memory();
    let free_percent = (available as f64 / total as f64) * 100.0;

    Some(MemoryReading {
        used_percent: 100.0 - free_percent,
        free_percent,
        total_bytes: total,
        available_bytes: available,
    })
}

fn collect_partitions() -> Vec<PartitionUsage> {
    let disks = Disks::new_with_refreshed_list();
    let mut partitions = Vec::new();

    for disk in disks.list() {
        let device = disk.name().to_string_lossy().to_string();

        // 伪设备不参与评估
        if device.starts_with("/dev/loop") {
            continue;
        }

        let total = disk.total_space();
        if total == 0 {
            continue;
        }

        let available = disk.available_space();
        let used = total.saturating_sub(available);

        partitions.push(PartitionUsage {
            device,
            mountpoint: disk.mount_point().to_string_lossy().to_string(),
            fstype: disk.file_system().to_string_lossy().to_string(),
            used_percent: (used as f64 / total as f64) * 100.0,
            total_bytes: total,
            used_bytes: used,
            free_bytes: available,
        });
    }

    partitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_produces_sane_readings() {
        let snapshot = collect();

        if let Some(cpu) = &snapshot.cpu {
            assert!(cpu.usage_percent >= 0.0);
            assert!(cpu.logical_cores >= 1);
        }

        if let Some(memory) = &snapshot.memory {
            assert!(memory.used_percent >= 0.0 && memory.used_percent <= 100.0);
            assert!((memory.used_percent + memory.free_percent - 100.0).abs() < 0.01);
        }

        for part in &snapshot.partitions {
            assert!(!part.device.starts_with("/dev/loop"));
            assert!(part.used_percent >= 0.0 && part.used_percent <= 100.0);
            assert!(part.total_bytes > 0);
        }
    }
}
