use serde::{Deserialize, Serialize};

/// CPU 读数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuReading {
    /// 总使用率（百分比）
    pub usage_percent: f64,
    pub physical_cores: usize,
    pub logical_cores: usize,
}

/// 内存读数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub used_percent: f64,
    pub free_percent: f64,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// 单个磁盘分区的使用情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionUsage {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub used_percent: f64,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

/// 一次评估周期的系统指标快照
///
/// Owned by the caller for the duration of one cycle. A reading that could
/// not be produced is `None`; the evaluator skips that metric instead of
/// aborting the cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cpu: Option<CpuReading>,
    pub memory: Option<MemoryReading>,
    pub partitions: Vec<PartitionUsage>,
}

impl MetricsSnapshot {
    pub fn partition(device: &str, mountpoint: &str, fstype: &str, used_percent: f64) -> PartitionUsage {
        PartitionUsage {
            device: device.to_string(),
            mountpoint: mountpoint.to_string(),
            fstype: fstype.to_string(),
            used_percent,
            total_bytes: 0,
            used_bytes: 0,
            free_bytes: 0,
        }
    }
}
