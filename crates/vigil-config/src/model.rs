use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 单条告警动作配置
///
/// Free-form map with a `type` tag; type-specific fields are validated when
/// the action is constructed by the dispatcher factory.
pub type ActionConfig = serde_json::Map<String, serde_json::Value>;

/// 整体监控配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub metrics: HashMap<String, MetricConfig>,
    #[serde(default)]
    pub alerts: HashMap<String, AlertLevel>,
}

/// 单个指标的阈值策略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    pub enabled: bool,
    /// warning/critical 阈值，0 表示该级别禁用
    pub thresholds: HashMap<String, f64>,
    pub throttle: ThrottleConfig,
    /// 内存指标的评估模式：min_free（默认）或 max_used
    pub mode: String,
    pub unit: String,
    /// 磁盘分区排除规则
    pub exclude: ExcludeConfig,
}

/// 告警节流策略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub min_duration_minutes: f64,
    pub repeat: bool,
    /// 重复告警的最小间隔（如 "30s"、"5m"），为空表示每个周期都告警
    pub repeat_interval: String,
}

/// 磁盘分区排除规则，glob 匹配
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeConfig {
    pub devices: Vec<String>,
    pub filesystems: Vec<String>,
    pub mountpoints: Vec<String>,
}

/// 某个告警级别的动作链
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertLevel {
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

impl MonitorConfig {
    /// 内置默认配置
    pub fn builtin_defaults() -> Self {
        let mut metrics = HashMap::new();
        metrics.insert(
            "disk".to_string(),
            MetricConfig {
                enabled: true,
                thresholds: thresholds(80.0, 90.0),
                unit: "percentage".to_string(),
                ..Default::default()
            },
        );
        metrics.insert(
            "cpu".to_string(),
            MetricConfig {
                enabled: true,
                thresholds: thresholds(70.0, 90.0),
                unit: "percentage".to_string(),
                ..Default::default()
            },
        );
        metrics.insert(
            "memory".to_string(),
            MetricConfig {
                enabled: true,
                thresholds: thresholds(20.0, 5.0),
                mode: "min_free".to_string(),
                unit: "percentage".to_string(),
                ..Default::default()
            },
        );

        let mut alerts = HashMap::new();
        alerts.insert("warning".to_string(), logger_chain("warning"));
        alerts.insert("critical".to_string(), logger_chain("critical"));

        Self { metrics, alerts }
    }

    /// 浅合并：用户配置的顶层指标/告警键整体覆盖默认项
    ///
    /// A user override of one metric replaces that metric's whole policy.
    /// Sub-fields are never deep-merged; existing deployments rely on this.
    pub fn merge_over_defaults(overrides: MonitorConfig) -> Self {
        let mut merged = Self::builtin_defaults();
        for (name, metric) in overrides.metrics {
            merged.metrics.insert(name, metric);
        }
        for (level, alert) in overrides.alerts {
            merged.alerts.insert(level, alert);
        }
        merged
    }

    pub fn metric(&self, name: &str) -> Option<&MetricConfig> {
        self.metrics.get(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.metrics.get(name).map(|m| m.enabled).unwrap_or(false)
    }

    pub fn throttle(&self, name: &str) -> ThrottleConfig {
        self.metrics
            .get(name)
            .map(|m| m.throttle.clone())
            .unwrap_or_default()
    }

    /// 某个级别配置的动作链，未配置时为空
    pub fn actions(&self, level: &str) -> &[ActionConfig] {
        self.alerts
            .get(level)
            .map(|a| a.actions.as_slice())
            .unwrap_or(&[])
    }
}

fn thresholds(warning: f64, critical: f64) -> HashMap<String, f64> {
    let mut map = HashMap::new();
    map.insert("warning".to_string(), warning);
    map.insert("critical".to_string(), critical);
    map
}

fn logger_chain(level: &str) -> AlertLevel {
    let mut action = ActionConfig::new();
    action.insert("type".to_string(), "logger".into());
    action.insert("level".to_string(), level.into());
    AlertLevel {
        actions: vec![action],
    }
}
