use async_trait::async_trait;
use serde_json::json;
use std::process::Stdio;
use std::time::Duration;
use syslog::{Facility, Formatter3164};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::action::{format_violation, AlertAction, NotifyError};
use vigil_config::ActionConfig;
use vigil_types::Violation;

const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

fn get_str<'a>(config: &'a ActionConfig, key: &str) -> Option<&'a str> {
    config.get(key).and_then(|v| v.as_str())
}

fn get_f64(config: &ActionConfig, key: &str) -> Option<f64> {
    config.get(key).and_then(|v| v.as_f64())
}

fn get_timeout(config: &ActionConfig, default: Duration) -> Result<Duration, NotifyError> {
    match get_f64(config, "timeout") {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
        Some(secs) => Err(NotifyError::Config(format!(
            "invalid 'timeout' value {}: must be a non-negative number of seconds",
            secs
        ))),
        None => Ok(default),
    }
}

/// 根据配置的 type 标签构造告警动作
///
/// Construction-time validation: unknown types and missing required fields
/// are errors here, before any violation is delivered.
pub fn create_action(config: &ActionConfig) -> Result<Box<dyn AlertAction>, NotifyError> {
    let action_type = get_str(config, "type")
        .ok_or_else(|| NotifyError::Config("alert action missing 'type' field".to_string()))?;

    match action_type {
        "logger" => Ok(Box::new(LoggerAction::new(config))),
        "syslog" => Ok(Box::new(SyslogAction::new(config)?)),
        "webhook" => Ok(Box::new(WebhookAction::new(config)?)),
        "script" => Ok(Box::new(ScriptAction::new(config)?)),
        "stdout" => Ok(Box::new(StdoutAction)),
        other => Err(NotifyError::Config(format!(
            "unknown alert action type: {}",
            other
        ))),
    }
}

/// logger(1) 动作：调用系统 logger 命令
#[derive(Debug)]
pub struct LoggerAction {
    pub tag: String,
    pub id: String,
}

impl LoggerAction {
    pub fn new(config: &ActionConfig) -> Self {
        Self {
            tag: get_str(config, "tag").unwrap_or("ALERT").to_string(),
            id: get_str(config, "id").unwrap_or("451").to_string(),
        }
    }
}

#[async_trait]
impl AlertAction for LoggerAction {
    async fn execute(&self, violation: &Violation) -> Result<(), NotifyError> {
        let message = format_violation(violation);

        let status = Command::new("logger")
            .args(["-e", "-t", self.tag.as_str()])
            .arg(format!("--id={}", self.id))
            .args(["-s", message.as_str()])
            .status()
            .await
            .map_err(|e| NotifyError::CommandFailed(format!("failed to run logger: {}", e)))?;

        if !status.success() {
            return Err(NotifyError::CommandFailed(format!(
                "logger exited with {}",
                status
            )));
        }

        info!("Logger alert sent: {}", message);
        Ok(())
    }

    fn name(&self) -> &str {
        "logger"
    }
}

/// syslog 优先级，构造时校验名称
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyslogPriority {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

fn parse_facility(name: &str) -> Result<Facility, NotifyError> {
    let facility = match name {
        "user" => Facility::LOG_USER,
        "mail" => Facility::LOG_MAIL,
        "daemon" => Facility::LOG_DAEMON,
        "auth" => Facility::LOG_AUTH,
        "syslog" => Facility::LOG_SYSLOG,
        "lpr" => Facility::LOG_LPR,
        "news" => Facility::LOG_NEWS,
        "uucp" => Facility::LOG_UUCP,
        "cron" => Facility::LOG_CRON,
        "local0" => Facility::LOG_LOCAL0,
        "local1" => Facility::LOG_LOCAL1,
        "local2" => Facility::LOG_LOCAL2,
        "local3" => Facility::LOG_LOCAL3,
        "local4" => Facility::LOG_LOCAL4,
        "local5" => Facility::LOG_LOCAL5,
        "local6" => Facility::LOG_LOCAL6,
        "local7" => Facility::LOG_LOCAL7,
        other => {
            return Err(NotifyError::Config(format!(
                "invalid syslog facility '{}'",
                other
            )))
        }
    };
    Ok(facility)
}

fn parse_priority(name: &str) -> Result<SyslogPriority, NotifyError> {
    let priority = match name {
        "emergency" => SyslogPriority::Emergency,
        "alert" => SyslogPriority::Alert,
        "critical" => SyslogPriority::Critical,
        "error" => SyslogPriority::Error,
        "warning" => SyslogPriority::Warning,
        "notice" => SyslogPriority::Notice,
        "info" => SyslogPriority::Info,
        "debug" => SyslogPriority::Debug,
        other => {
            return Err(NotifyError::Config(format!(
                "invalid syslog priority '{}'",
                other
            )))
        }
    };
    Ok(priority)
}

/// syslog 动作：每次投递打开一条连接，写一条消息后关闭
#[derive(Debug)]
pub struct SyslogAction {
    pub tag: String,
    pub facility: Facility,
    pub priority: SyslogPriority,
}

impl SyslogAction {
    pub fn new(config: &ActionConfig) -> Result<Self, NotifyError> {
        let tag = get_str(config, "tag").unwrap_or("vigil-monitor").to_string();

        let facility = match get_str(config, "facility") {
            Some(name) => parse_facility(name)?,
            None => Facility::LOG_LOCAL0,
        };

        let priority = match get_str(config, "priority") {
            Some(name) => parse_priority(name)?,
            None => SyslogPriority::Warning,
        };

        Ok(Self {
            tag,
            facility,
            priority,
        })
    }
}

#[async_trait]
impl AlertAction for SyslogAction {
    async fn execute(&self, violation: &Violation) -> Result<(), NotifyError> {
        let message = format_violation(violation);
        let tag = self.tag.clone();
        let facility = self.facility;
        let priority = self.priority;

        // syslog 写入是阻塞调用，移出异步执行器
        let log_message = message.clone();
        tokio::task::spawn_blocking(move || -> Result<(), NotifyError> {
            let formatter = Formatter3164 {
                facility,
                hostname: None,
                process: tag,
                pid: std::process::id(),
            };

            let mut writer = syslog::unix(formatter)
                .map_err(|e| NotifyError::Syslog(format!("failed to connect to syslog: {}", e)))?;

            let result = match priority {
                SyslogPriority::Emergency => writer.emerg(log_message),
                SyslogPriority::Alert => writer.alert(log_message),
                SyslogPriority::Critical => writer.crit(log_message),
                SyslogPriority::Error => writer.err(log_message),
                SyslogPriority::Warning => writer.warning(log_message),
                SyslogPriority::Notice => writer.notice(log_message),
                SyslogPriority::Info => writer.info(log_message),
                SyslogPriority::Debug => writer.debug(log_message),
            };
            result.map_err(|e| NotifyError::Syslog(format!("failed to send syslog alert: {}", e)))
        })
        .await
        .map_err(|e| NotifyError::Internal(e.to_string()))??;

        info!("Syslog alert sent: {}", message);
        Ok(())
    }

    fn name(&self) -> &str {
        "syslog"
    }
}

/// webhook 动作：HTTP POST，带超时与顺序重试
#[derive(Debug)]
pub struct WebhookAction {
    pub url: String,
    pub timeout: Duration,
    pub retry: usize,
    client: reqwest::Client,
}

impl WebhookAction {
    pub fn new(config: &ActionConfig) -> Result<Self, NotifyError> {
        let url = get_str(config, "url")
            .ok_or_else(|| NotifyError::Config("webhook action requires 'url' field".to_string()))?
            .to_string();

        let timeout = get_timeout(config, DEFAULT_WEBHOOK_TIMEOUT)?;

        let retry = get_f64(config, "retry").map(|r| r as usize).unwrap_or(1).max(1);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            url,
            timeout,
            retry,
            client,
        })
    }
}

#[async_trait]
impl AlertAction for WebhookAction {
    async fn execute(&self, violation: &Violation) -> Result<(), NotifyError> {
        let payload = json!({
            "metric": violation.metric,
            "level": violation.severity,
            "message": violation.message,
            "value": violation.value,
        });

        let mut last_error = NotifyError::Http("no attempts made".to_string());

        for attempt in 1..=self.retry {
            match self.client.post(&self.url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("Webhook alert sent to {}", self.url);
                    return Ok(());
                }
                Ok(resp) => {
                    last_error =
                        NotifyError::Http(format!("webhook returned status {}", resp.status()));
                    warn!(
                        "Webhook alert failed (attempt {}/{}): {}",
                        attempt, self.retry, last_error
                    );
                }
                Err(e) => {
                    last_error = NotifyError::Http(e.to_string());
                    warn!(
                        "Webhook alert failed (attempt {}/{}): {}",
                        attempt, self.retry, last_error
                    );
                }
            }
        }

        Err(NotifyError::Http(format!(
            "failed to send webhook alert after {} attempts: {}",
            self.retry, last_error
        )))
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

/// 脚本动作：执行外部程序，硬超时
#[derive(Debug)]
pub struct ScriptAction {
    pub path: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ScriptAction {
    pub fn new(config: &ActionConfig) -> Result<Self, NotifyError> {
        let path = get_str(config, "path")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                NotifyError::Config("script action requires 'path' field".to_string())
            })?
            .to_string();

        let args = config
            .get("args")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let timeout = get_timeout(config, DEFAULT_SCRIPT_TIMEOUT)?;

        Ok(Self {
            path,
            args,
            timeout,
        })
    }
}

#[async_trait]
impl AlertAction for ScriptAction {
    async fn execute(&self, violation: &Violation) -> Result<(), NotifyError> {
        let mut child = Command::new(&self.path)
            .args(&self.args)
            .arg(&violation.metric)
            .arg(violation.severity.as_str())
            .arg(&violation.message)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                NotifyError::CommandFailed(format!("failed to spawn {}: {}", self.path, e))
            })?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                info!("Script alert executed: {}", self.path);
                Ok(())
            }
            Ok(Ok(status)) => Err(NotifyError::CommandFailed(format!(
                "script {} exited with {}",
                self.path, status
            ))),
            Ok(Err(e)) => Err(NotifyError::CommandFailed(format!(
                "failed to wait for {}: {}",
                self.path, e
            ))),
            Err(_) => {
                // 超时：终止进程，与非零退出区分
                let _ = child.start_kill();
                debug!("Script {} killed after timeout", self.path);
                Err(NotifyError::Timeout(format!(
                    "script alert timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    fn name(&self) -> &str {
        "script"
    }
}

/// stdout 动作：直接打印
#[derive(Debug)]
pub struct StdoutAction;

#[async_trait]
impl AlertAction for StdoutAction {
    async fn execute(&self, violation: &Violation) -> Result<(), NotifyError> {
        println!("{}", format_violation(violation));
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}
