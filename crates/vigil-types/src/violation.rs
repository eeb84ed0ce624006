use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 告警级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("invalid severity '{0}', expected 'warning' or 'critical'")]
pub struct SeverityParseError(pub String);

impl FromStr for Severity {
    type Err = SeverityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(SeverityParseError(other.to_string())),
        }
    }
}

/// 阈值违规
///
/// Produced by the threshold evaluator, consumed by the throttle engine and
/// the alert dispatcher within one evaluation cycle. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub metric: String,
    #[serde(rename = "level")]
    pub severity: Severity,
    pub message: String,
    pub value: f64,
}

impl Violation {
    pub fn new(
        metric: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            metric: metric.into(),
            severity,
            message: message.into(),
            value,
        }
    }

    /// 状态键，与持久化格式保持一致
    pub fn state_key(&self) -> String {
        format!("{}_{}", self.metric, self.severity)
    }
}
