use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use tracing::info;

use crate::model::{AlertLevel, MetricConfig, MonitorConfig};

const VALID_ACTION_TYPES: [&str; 5] = ["logger", "syslog", "webhook", "script", "stdout"];

/// 加载配置文件，缺失时回退到内置默认值
///
/// User-supplied top-level metric/alert keys replace the default entry
/// wholesale (shallow merge). Parse and validation failures are errors, a
/// missing file is not.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MonitorConfig> {
    let path = path.as_ref();
    info!("Loading config from {}", path.display());

    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(MonitorConfig::builtin_defaults());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("error reading config file {}", path.display()))
        }
    };

    let overrides: MonitorConfig = serde_yaml::from_str(&data)
        .with_context(|| format!("error parsing config file {}", path.display()))?;

    let config = MonitorConfig::merge_over_defaults(overrides);
    validate(&config).context("config validation failed")?;

    info!("Config loaded and validated successfully");
    Ok(config)
}

/// 校验合并后的配置
pub fn validate(config: &MonitorConfig) -> Result<()> {
    for (name, metric) in &config.metrics {
        validate_metric(name, metric)?;
    }
    for (level, alert) in &config.alerts {
        validate_alert_level(level, alert)?;
    }
    Ok(())
}

fn validate_metric(name: &str, metric: &MetricConfig) -> Result<()> {
    for (level, value) in &metric.thresholds {
        if *value < 0.0 {
            bail!("metric {} threshold {} must be >= 0", name, level);
        }
    }

    if metric.throttle.min_duration_minutes < 0.0 {
        bail!("metric {} 'min_duration_minutes' must be >= 0", name);
    }

    if name == "memory" && !metric.mode.is_empty() && metric.mode != "min_free" && metric.mode != "max_used" {
        bail!("memory metric 'mode' must be 'min_free' or 'max_used'");
    }

    Ok(())
}

fn validate_alert_level(level: &str, alert: &AlertLevel) -> Result<()> {
    if level != "warning" && level != "critical" {
        bail!("invalid alert level '{}'", level);
    }

    for (i, action) in alert.actions.iter().enumerate() {
        let action_type = action
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("alert action {} for level '{}' missing 'type' field", i, level))?;

        if !VALID_ACTION_TYPES.contains(&action_type) {
            bail!("alert action type '{}' not supported", action_type);
        }

        if action_type == "webhook" && !action.contains_key("url") {
            bail!("alert action 'webhook' missing required 'url' field");
        }
        if action_type == "script" && !action.contains_key("path") {
            bail!("alert action 'script' missing required 'path' field");
        }

        if let Some(timeout) = action.get("timeout") {
            match timeout.as_f64() {
                Some(secs) if secs.is_finite() && secs >= 0.0 => {}
                _ => bail!(
                    "alert action {} for level '{}': 'timeout' must be a non-negative number",
                    i,
                    level
                ),
            }
        }
    }

    Ok(())
}
