use std::collections::HashSet;
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::state::StateStore;
use vigil_config::{MonitorConfig, ThrottleConfig};
use vigil_types::Violation;

/// 节流决策：候选违规 -> 实际需要告警的违规
///
/// State mutations stay in memory; the caller persists the store once the
/// whole batch is decided. An unparsable `repeat_interval` is a configuration
/// error returned to the caller, never silently ignored.
pub fn decide(
    candidates: &[Violation],
    store: &mut StateStore,
    config: &MonitorConfig,
    now: f64,
) -> Result<Vec<Violation>> {
    let mut accepted = Vec::new();

    for violation in candidates {
        let throttle = config.throttle(&violation.metric);

        if should_alert(violation, store, &throttle, now)? {
            store
                .get_or_create(&violation.metric, violation.severity, now)
                .mark_alerted(now);
            accepted.push(violation.clone());
        }
    }

    Ok(accepted)
}

fn should_alert(
    violation: &Violation,
    store: &mut StateStore,
    throttle: &ThrottleConfig,
    now: f64,
) -> Result<bool> {
    let state = store.get_or_create(&violation.metric, violation.severity, now);
    let duration = state.duration_minutes(now);

    // 持续时间不足，尚不触发，也不标记已告警
    if duration < throttle.min_duration_minutes {
        debug!(
            "Throttle: {}/{} duration {:.1}m < min {:.1}m, skipping alert",
            violation.metric, violation.severity, duration, throttle.min_duration_minutes
        );
        return Ok(false);
    }

    if !state.has_alerted {
        return Ok(true);
    }

    if !throttle.repeat {
        debug!(
            "Throttle: {}/{} already alerted and repeat=false, skipping",
            violation.metric, violation.severity
        );
        return Ok(false);
    }

    // repeat_interval 为空表示每个周期都重复
    if throttle.repeat_interval.is_empty() {
        return Ok(true);
    }

    let interval = humantime::parse_duration(&throttle.repeat_interval).map_err(|e| {
        MonitorError::Config(format!(
            "invalid repeat_interval '{}' for metric {}: {}",
            throttle.repeat_interval, violation.metric, e
        ))
    })?;

    let last_alert = state.last_alert_time.unwrap_or(state.first_detected_time);
    let elapsed = now - last_alert;
    if elapsed < interval.as_secs_f64() {
        debug!(
            "Throttle: {}/{} repeat interval not reached ({:.0}s < {:.0}s)",
            violation.metric,
            violation.severity,
            elapsed,
            interval.as_secs_f64()
        );
        return Ok(false);
    }

    Ok(true)
}

/// 对账：清除已解除违规的状态
///
/// Every stored key absent from the current candidate set is a resolved
/// violation; this runs regardless of dispatch outcome so state never leaks
/// across episodes. Idempotent.
pub fn reconcile(candidates: &[Violation], store: &mut StateStore) {
    let current: HashSet<String> = candidates.iter().map(|v| v.state_key()).collect();

    let resolved: Vec<(String, vigil_types::Severity)> = store
        .entries()
        .filter(|(key, _)| !current.contains(*key))
        .map(|(_, state)| (state.metric.clone(), state.level))
        .collect();

    for (metric, level) in resolved {
        store.clear(&metric, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;
    use vigil_config::MetricConfig;
    use vigil_types::Severity;

    fn store() -> StateStore {
        let dir = tempdir().unwrap();
        StateStore::empty(dir.path().join("state.json"))
    }

    fn config_with_throttle(metric: &str, throttle: ThrottleConfig) -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.metrics.insert(
            metric.to_string(),
            MetricConfig {
                enabled: true,
                thresholds: HashMap::new(),
                throttle,
                ..Default::default()
            },
        );
        config
    }

    fn cpu_warning() -> Violation {
        Violation::new("cpu", Severity::Warning, "cpu usage: 85.00%", 85.0)
    }

    #[test]
    fn test_first_observation_alerts_immediately() {
        let config = config_with_throttle("cpu", ThrottleConfig::default());
        let mut store = store();
        let now = 1_700_000_000.0;

        let accepted = decide(&[cpu_warning()], &mut store, &config, now).unwrap();
        assert_eq!(accepted.len(), 1);

        let state = store.get("cpu", Severity::Warning).unwrap();
        assert!(state.has_alerted);
        assert_eq!(state.last_alert_time, Some(now));
        assert_eq!(state.first_detected_time, now);
    }

    #[test]
    fn test_min_duration_suppresses_until_elapsed() {
        let config = config_with_throttle(
            "cpu",
            ThrottleConfig {
                min_duration_minutes: 5.0,
                ..Default::default()
            },
        );
        let mut store = store();
        let start = 1_700_000_000.0;

        // 1 分钟：抑制，不标记已告警
        let accepted = decide(&[cpu_warning()], &mut store, &config, start).unwrap();
        assert!(accepted.is_empty());
        let accepted = decide(&[cpu_warning()], &mut store, &config, start + 60.0).unwrap();
        assert!(accepted.is_empty());
        assert!(!store.get("cpu", Severity::Warning).unwrap().has_alerted);

        // 6 分钟：恰好接受一次
        let accepted = decide(&[cpu_warning()], &mut store, &config, start + 360.0).unwrap();
        assert_eq!(accepted.len(), 1);

        // 再来一轮：repeat=false，不再接受
        let accepted = decide(&[cpu_warning()], &mut store, &config, start + 420.0).unwrap();
        assert!(accepted.is_empty());
    }

    #[test]
    fn test_no_repeat_alerts_once() {
        let config = config_with_throttle("cpu", ThrottleConfig::default());
        let mut store = store();
        let now = 1_700_000_000.0;

        assert_eq!(decide(&[cpu_warning()], &mut store, &config, now).unwrap().len(), 1);
        assert!(decide(&[cpu_warning()], &mut store, &config, now + 60.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_repeat_with_interval() {
        let config = config_with_throttle(
            "cpu",
            ThrottleConfig {
                repeat: true,
                repeat_interval: "1m".to_string(),
                ..Default::default()
            },
        );
        let mut store = store();
        let start = 1_700_000_000.0;

        assert_eq!(decide(&[cpu_warning()], &mut store, &config, start).unwrap().len(), 1);

        // 30 秒后：间隔未到，抑制
        let accepted = decide(&[cpu_warning()], &mut store, &config, start + 30.0).unwrap();
        assert!(accepted.is_empty());
        assert_eq!(
            store.get("cpu", Severity::Warning).unwrap().last_alert_time,
            Some(start)
        );

        // 61 秒后：接受，last_alert_time 前移
        let accepted = decide(&[cpu_warning()], &mut store, &config, start + 61.0).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(
            store.get("cpu", Severity::Warning).unwrap().last_alert_time,
            Some(start + 61.0)
        );
    }

    #[test]
    fn test_repeat_with_empty_interval_is_unconditional() {
        let config = config_with_throttle(
            "cpu",
            ThrottleConfig {
                repeat: true,
                ..Default::default()
            },
        );
        let mut store = store();
        let start = 1_700_000_000.0;

        for i in 0..3 {
            let accepted =
                decide(&[cpu_warning()], &mut store, &config, start + i as f64).unwrap();
            assert_eq!(accepted.len(), 1, "cycle {}", i);
        }
    }

    #[test]
    fn test_unparsable_interval_is_config_error() {
        let config = config_with_throttle(
            "cpu",
            ThrottleConfig {
                repeat: true,
                repeat_interval: "fortnightly".to_string(),
                ..Default::default()
            },
        );
        let mut store = store();
        let start = 1_700_000_000.0;

        // 首次告警不需要解析间隔
        assert_eq!(decide(&[cpu_warning()], &mut store, &config, start).unwrap().len(), 1);

        // 重复时解析失败必须上报
        let err = decide(&[cpu_warning()], &mut store, &config, start + 60.0).unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
        assert!(err.to_string().contains("fortnightly"));
    }

    #[test]
    fn test_first_detected_time_is_stable_across_cycles() {
        let config = config_with_throttle(
            "cpu",
            ThrottleConfig {
                min_duration_minutes: 10.0,
                ..Default::default()
            },
        );
        let mut store = store();
        let start = 1_700_000_000.0;

        decide(&[cpu_warning()], &mut store, &config, start).unwrap();
        decide(&[cpu_warning()], &mut store, &config, start + 120.0).unwrap();

        assert_eq!(
            store.get("cpu", Severity::Warning).unwrap().first_detected_time,
            start
        );
    }

    #[test]
    fn test_reconcile_clears_resolved_only() {
        let mut store = store();
        store.get_or_create("cpu", Severity::Warning, 0.0).mark_alerted(0.0);
        store.get_or_create("memory", Severity::Critical, 0.0).mark_alerted(0.0);
        store.get_or_create("disk", Severity::Warning, 0.0).mark_alerted(0.0);

        let candidates = vec![cpu_warning()];
        reconcile(&candidates, &mut store);

        assert!(store.contains("cpu", Severity::Warning));
        assert!(!store.contains("memory", Severity::Critical));
        assert!(!store.contains("disk", Severity::Warning));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut store = store();
        store.get_or_create("cpu", Severity::Warning, 0.0);
        store.get_or_create("memory", Severity::Critical, 0.0);

        let candidates = vec![cpu_warning()];
        reconcile(&candidates, &mut store);
        let after_first: Vec<String> = store.keys().cloned().collect();

        reconcile(&candidates, &mut store);
        let after_second: Vec<String> = store.keys().cloned().collect();

        assert_eq!(after_first, after_second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_same_metric_different_severity_tracked_separately() {
        let config = config_with_throttle("disk", ThrottleConfig::default());
        let mut store = store();
        let now = 1_700_000_000.0;

        let warning = Violation::new("disk", Severity::Warning, "85%", 85.0);
        let critical = Violation::new("disk", Severity::Critical, "95%", 95.0);

        let accepted = decide(
            &[warning.clone(), critical.clone()],
            &mut store,
            &config,
            now,
        )
        .unwrap();
        assert_eq!(accepted.len(), 2);
        assert!(store.contains("disk", Severity::Warning));
        assert!(store.contains("disk", Severity::Critical));

        // warning 解除后只清掉 warning 的状态
        reconcile(&[critical], &mut store);
        assert!(!store.contains("disk", Severity::Warning));
        assert!(store.contains("disk", Severity::Critical));
    }
}
