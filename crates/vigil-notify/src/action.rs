use async_trait::async_trait;

use vigil_types::Violation;

/// 告警动作接口
///
/// One capability: deliver a single violation through one channel. Actions
/// are constructed per dispatch by the factory and never persisted.
#[async_trait]
pub trait AlertAction: Send + Sync {
    async fn execute(&self, violation: &Violation) -> Result<(), NotifyError>;
    fn name(&self) -> &str;
}

/// 告警投递错误
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Syslog error: {0}")]
    Syslog(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 统一的告警文本格式：`[SEVERITY] metric: message`
pub fn format_violation(violation: &Violation) -> String {
    format!(
        "[{}] {}: {}",
        violation.severity.as_str().to_uppercase(),
        violation.metric,
        violation.message
    )
}
