use tracing::{error, info};

use crate::action::NotifyError;
use crate::providers::create_action;
use vigil_config::MonitorConfig;
use vigil_types::Violation;

/// 派发已接受的违规到配置的动作链
///
/// Criticals are processed first. Every action in a chain executes once per
/// violation of that severity. A failing construction or execution is
/// recorded but the remaining actions and violations still run; the first
/// error is returned at the end. Dispatch failures are never retried by the
/// throttle engine.
pub async fn dispatch(
    warnings: &[Violation],
    criticals: &[Violation],
    config: &MonitorConfig,
) -> Result<(), NotifyError> {
    let mut first_error: Option<NotifyError> = None;

    if !criticals.is_empty() {
        info!("Processing {} critical violations", criticals.len());
        run_chain(criticals, config.actions("critical"), &mut first_error).await;
    }

    if !warnings.is_empty() {
        info!("Processing {} warning violations", warnings.len());
        run_chain(warnings, config.actions("warning"), &mut first_error).await;
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn run_chain(
    violations: &[Violation],
    actions: &[vigil_config::ActionConfig],
    first_error: &mut Option<NotifyError>,
) {
    for action_config in actions {
        let action = match create_action(action_config) {
            Ok(action) => action,
            Err(e) => {
                // 单个动作构造失败不阻断动作链的其余部分
                error!("Failed to create alert action: {}", e);
                first_error.get_or_insert(e);
                continue;
            }
        };

        for violation in violations {
            if let Err(e) = action.execute(violation).await {
                error!("Failed to execute {} alert: {}", action.name(), e);
                first_error.get_or_insert(e);
            }
        }
    }
}
