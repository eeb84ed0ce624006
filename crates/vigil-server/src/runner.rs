use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use vigil_config::MonitorConfig;
use vigil_monitor::{run_cycle, unix_now, CycleOutcome, StateStore};
use vigil_types::{MetricsSnapshot, Status};

/// 评估周期执行器，CLI 和 HTTP 模式共用
///
/// The store lives behind a mutex: evaluate -> decide -> reconcile -> persist
/// is a critical section, so two concurrent cycles can never both observe
/// `has_alerted = false` or interleave writes to the state file. Dispatch
/// runs after the lock is released; action I/O never blocks state mutation.
pub struct Runner {
    config: Arc<MonitorConfig>,
    store: Arc<Mutex<StateStore>>,
}

impl Runner {
    pub fn new(config: MonitorConfig, store: StateStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// 跑一次完整检查：采集、评估、派发
    pub async fn check(&self) -> Result<Status> {
        let snapshot = tokio::task::spawn_blocking(vigil_stats::collect)
            .await
            .context("snapshot collection task failed")?;

        self.check_snapshot(&snapshot).await
    }

    /// 对给定快照跑一次检查
    pub async fn check_snapshot(&self, snapshot: &MetricsSnapshot) -> Result<Status> {
        let outcome = self.evaluate(snapshot).await?;

        let mut status = Status::ok();
        for violation in &outcome.criticals {
            status.add_critical(&violation.metric, &violation.message);
        }
        for violation in &outcome.warnings {
            status.add_warning(&violation.metric, &violation.message);
        }

        if !outcome.is_empty() {
            info!(
                "Dispatching {} warnings, {} criticals",
                outcome.warnings.len(),
                outcome.criticals.len()
            );
        }

        // 状态已提交并持久化，派发失败不会重置节流
        vigil_notify::dispatch(&outcome.warnings, &outcome.criticals, &self.config)
            .await
            .context("failed to process violations")?;

        Ok(status)
    }

    async fn evaluate(&self, snapshot: &MetricsSnapshot) -> Result<CycleOutcome> {
        let mut store = self.store.lock().await;
        let outcome = run_cycle(&self.config, snapshot, &mut store, unix_now())?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::tempdir;
    use vigil_config::{ActionConfig, AlertLevel, MetricConfig};

    fn disk_only_config(warning: f64, critical: f64) -> MonitorConfig {
        let mut thresholds = HashMap::new();
        thresholds.insert("warning".to_string(), warning);
        thresholds.insert("critical".to_string(), critical);

        let mut config = MonitorConfig::default();
        config.metrics.insert(
            "disk".to_string(),
            MetricConfig {
                enabled: true,
                thresholds,
                ..Default::default()
            },
        );

        let stdout: ActionConfig = json!({"type": "stdout"}).as_object().unwrap().clone();
        config.alerts.insert(
            "warning".to_string(),
            AlertLevel {
                actions: vec![stdout.clone()],
            },
        );
        config.alerts.insert(
            "critical".to_string(),
            AlertLevel {
                actions: vec![stdout],
            },
        );
        config
    }

    fn snapshot(used_percent: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            cpu: None,
            memory: None,
            partitions: vec![MetricsSnapshot::partition(
                "/dev/sda1",
                "/",
                "ext4",
                used_percent,
            )],
        }
    }

    #[tokio::test]
    async fn test_check_reports_warning_then_suppresses() {
        let dir = tempdir().unwrap();
        let store = StateStore::empty(dir.path().join("state.json"));
        let runner = Runner::new(disk_only_config(80.0, 90.0), store);

        let status = runner.check_snapshot(&snapshot(85.0)).await.unwrap();
        assert_eq!(status.status, "WARN");
        assert_eq!(status.info.len(), 1);
        assert!(status.info[0].starts_with("disk:"));

        // 已告警且不重复：第二轮回到 OK
        let status = runner.check_snapshot(&snapshot(85.0)).await.unwrap();
        assert_eq!(status.status, "OK");
        assert!(status.info.is_empty());
    }

    #[tokio::test]
    async fn test_check_critical_status() {
        let dir = tempdir().unwrap();
        let store = StateStore::empty(dir.path().join("state.json"));
        let runner = Runner::new(disk_only_config(80.0, 90.0), store);

        let status = runner.check_snapshot(&snapshot(95.0)).await.unwrap();
        assert_eq!(status.status, "CRITICAL");
    }

    #[tokio::test]
    async fn test_check_ok_when_below_thresholds() {
        let dir = tempdir().unwrap();
        let store = StateStore::empty(dir.path().join("state.json"));
        let runner = Runner::new(disk_only_config(80.0, 90.0), store);

        let status = runner.check_snapshot(&snapshot(40.0)).await.unwrap();
        assert_eq!(status.status, "OK");
    }

    #[tokio::test]
    async fn test_concurrent_checks_alert_once() {
        let dir = tempdir().unwrap();
        let store = StateStore::empty(dir.path().join("state.json"));
        let runner = Arc::new(Runner::new(disk_only_config(80.0, 90.0), store));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let runner = runner.clone();
            handles.push(tokio::spawn(async move {
                runner.check_snapshot(&snapshot(85.0)).await.unwrap()
            }));
        }

        let mut warned = 0;
        for handle in handles {
            let status = handle.await.unwrap();
            if status.status == "WARN" {
                warned += 1;
            }
        }

        // 互斥锁保证只有一个并发周期观察到 has_alerted=false
        assert_eq!(warned, 1);
    }
}
