use glob::Pattern;
use tracing::{debug, warn};

use vigil_config::{ExcludeConfig, MetricConfig, MonitorConfig};
use vigil_types::{MetricsSnapshot, PartitionUsage, Severity, Violation};

/// 阈值评估：快照 + 配置 -> 候选违规集合
///
/// Pure; no side effects and no memory of prior cycles. Critical is always
/// checked before warning, so a metric yields at most one severity per cycle.
pub fn evaluate_all(config: &MonitorConfig, snapshot: &MetricsSnapshot) -> Vec<Violation> {
    let mut violations = Vec::new();

    violations.extend(check_disk(config, &snapshot.partitions));

    match &snapshot.cpu {
        Some(cpu) => violations.extend(check_cpu(config, cpu.usage_percent)),
        None => warn!("CPU reading unavailable, skipping cpu evaluation"),
    }

    match &snapshot.memory {
        Some(mem) => violations.extend(check_memory(config, mem.used_percent, mem.free_percent)),
        None => warn!("Memory reading unavailable, skipping memory evaluation"),
    }

    violations
}

fn threshold(metric: &MetricConfig, level: &str) -> f64 {
    metric.thresholds.get(level).copied().unwrap_or(0.0)
}

/// 磁盘阈值检查
pub fn check_disk(config: &MonitorConfig, partitions: &[PartitionUsage]) -> Vec<Violation> {
    let mut violations = Vec::new();

    let Some(metric) = config.metric("disk").filter(|m| m.enabled) else {
        return violations;
    };

    let warning = threshold(metric, "warning");
    let critical = threshold(metric, "critical");

    for part in partitions {
        if is_partition_excluded(part, &metric.exclude) {
            debug!("Partition {} excluded from disk evaluation", part.device);
            continue;
        }

        let percentage = part.used_percent;

        if critical > 0.0 && percentage > critical {
            violations.push(Violation::new(
                "disk",
                Severity::Critical,
                format!(
                    "partition {}, mounted at {} is {:.2}% full (critical threshold: {:.2}%)",
                    part.device, part.mountpoint, percentage, critical
                ),
                percentage,
            ));
        } else if warning > 0.0 && percentage > warning {
            violations.push(Violation::new(
                "disk",
                Severity::Warning,
                format!(
                    "partition {}, mounted at {} is {:.2}% full (warning threshold: {:.2}%)",
                    part.device, part.mountpoint, percentage, warning
                ),
                percentage,
            ));
        }
    }

    violations
}

/// CPU 阈值检查，严格大于语义
pub fn check_cpu(config: &MonitorConfig, cpu_usage: f64) -> Vec<Violation> {
    let mut violations = Vec::new();

    let Some(metric) = config.metric("cpu").filter(|m| m.enabled) else {
        return violations;
    };

    let warning = threshold(metric, "warning");
    let critical = threshold(metric, "critical");

    if critical > 0.0 && cpu_usage > critical {
        violations.push(Violation::new(
            "cpu",
            Severity::Critical,
            format!(
                "cpu usage: {:.2}% (critical threshold: {:.2}%)",
                cpu_usage, critical
            ),
            cpu_usage,
        ));
    } else if warning > 0.0 && cpu_usage > warning {
        violations.push(Violation::new(
            "cpu",
            Severity::Warning,
            format!(
                "cpu usage: {:.2}% (warning threshold: {:.2}%)",
                cpu_usage, warning
            ),
            cpu_usage,
        ));
    }

    violations
}

/// 内存阈值检查
///
/// `min_free` alerts when free% drops strictly below the threshold,
/// `max_used` when used% strictly exceeds it. An unset mode means `min_free`.
pub fn check_memory(config: &MonitorConfig, mem_used: f64, mem_free: f64) -> Vec<Violation> {
    let mut violations = Vec::new();

    let Some(metric) = config.metric("memory").filter(|m| m.enabled) else {
        return violations;
    };

    let mode = if metric.mode.is_empty() {
        "min_free"
    } else {
        metric.mode.as_str()
    };

    let warning = threshold(metric, "warning");
    let critical = threshold(metric, "critical");

    if mode == "min_free" {
        if critical > 0.0 && mem_free < critical {
            violations.push(Violation::new(
                "memory",
                Severity::Critical,
                format!(
                    "free memory: {:.2}% (critical threshold: below {:.2}%)",
                    mem_free, critical
                ),
                mem_free,
            ));
        } else if warning > 0.0 && mem_free < warning {
            violations.push(Violation::new(
                "memory",
                Severity::Warning,
                format!(
                    "free memory: {:.2}% (warning threshold: below {:.2}%)",
                    mem_free, warning
                ),
                mem_free,
            ));
        }
    } else {
        if critical > 0.0 && mem_used > critical {
            violations.push(Violation::new(
                "memory",
                Severity::Critical,
                format!(
                    "memory used: {:.2}% (critical threshold: {:.2}%)",
                    mem_used, critical
                ),
                mem_used,
            ));
        } else if warning > 0.0 && mem_used > warning {
            violations.push(Violation::new(
                "memory",
                Severity::Warning,
                format!(
                    "memory used: {:.2}% (warning threshold: {:.2}%)",
                    mem_used, warning
                ),
                mem_used,
            ));
        }
    }

    violations
}

/// glob 匹配，支持 `*`、`?` 和 `[...]` 字符类
pub fn matches_pattern(pattern: &str, text: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(p) => p.matches(text),
        Err(e) => {
            warn!("Invalid exclusion pattern '{}': {}", pattern, e);
            false
        }
    }
}

/// 分区是否被排除规则命中
///
/// Device, filesystem type and mountpoint are matched independently; any
/// match excludes the partition entirely.
pub fn is_partition_excluded(part: &PartitionUsage, exclude: &ExcludeConfig) -> bool {
    if exclude.devices.iter().any(|p| matches_pattern(p, &part.device)) {
        return true;
    }
    if exclude
        .filesystems
        .iter()
        .any(|p| matches_pattern(p, &part.fstype))
    {
        return true;
    }
    if exclude
        .mountpoints
        .iter()
        .any(|p| matches_pattern(p, &part.mountpoint))
    {
        return true;
    }
    false
}
