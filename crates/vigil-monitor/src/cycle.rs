use tracing::info;

use crate::error::Result;
use crate::state::StateStore;
use crate::{thresholds, throttle};
use vigil_config::MonitorConfig;
use vigil_types::{MetricsSnapshot, Severity, Violation};

/// 一次评估周期的产出
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    pub warnings: Vec<Violation>,
    pub criticals: Vec<Violation>,
}

impl CycleOutcome {
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.criticals.is_empty()
    }
}

/// 运行一次完整评估周期：评估 -> 节流 -> 对账 -> 持久化
///
/// Evaluation and throttling failures abort before any dispatch can happen.
/// The store is persisted before the outcome is returned, so a crash between
/// dispatch and the next cycle cannot lose repeat-suppression state. The
/// caller runs the dispatcher on the returned outcome afterwards; dispatch
/// failures never re-arm the throttle.
pub fn run_cycle(
    config: &MonitorConfig,
    snapshot: &MetricsSnapshot,
    store: &mut StateStore,
    now: f64,
) -> Result<CycleOutcome> {
    let candidates = thresholds::evaluate_all(config, snapshot);

    let accepted = throttle::decide(&candidates, store, config, now)?;

    // 已解除的违规必须清除，即使后续派发失败
    throttle::reconcile(&candidates, store);

    store.persist()?;

    let mut outcome = CycleOutcome::default();
    for violation in accepted {
        match violation.severity {
            Severity::Warning => outcome.warnings.push(violation),
            Severity::Critical => outcome.criticals.push(violation),
        }
    }

    info!(
        "Threshold check: {} warnings, {} critical (throttled from {} total)",
        outcome.warnings.len(),
        outcome.criticals.len(),
        candidates.len()
    );

    Ok(outcome)
}
