use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::error::{MonitorError, Result};
use vigil_types::Severity;

/// 当前 unix 时间（秒，浮点）
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// 单个指标违规的持久化状态
///
/// Field names and the unix-seconds float encoding are a compatibility
/// surface shared with existing deployments; do not change them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationState {
    pub metric: String,
    pub level: Severity,
    pub first_detected_time: f64,
    pub last_alert_time: Option<f64>,
    pub has_alerted: bool,
}

impl ViolationState {
    pub fn new(metric: impl Into<String>, level: Severity, now: f64) -> Self {
        Self {
            metric: metric.into(),
            level,
            first_detected_time: now,
            last_alert_time: None,
            has_alerted: false,
        }
    }

    /// 首次检测以来经过的分钟数
    pub fn duration_minutes(&self, now: f64) -> f64 {
        (now - self.first_detected_time) / 60.0
    }

    /// 记录一次已发送的告警
    pub fn mark_alerted(&mut self, now: f64) {
        self.has_alerted = true;
        self.last_alert_time = Some(now);
    }
}

fn state_key(metric: &str, level: Severity) -> String {
    format!("{}_{}", metric, level)
}

/// 违规状态存储
///
/// Owns the in-memory map and the backing file. Mutations stay in memory
/// until `persist` is called; the throttle engine persists once per cycle.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    states: HashMap<String, ViolationState>,
}

impl StateStore {
    /// 创建空存储，不读文件
    pub fn empty<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            states: HashMap::new(),
        }
    }

    /// 从状态文件加载
    ///
    /// A missing file yields an empty store; unreadable or unparsable
    /// content is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("State file not found: {}", path.display());
                return Ok(Self::empty(path));
            }
            Err(e) => {
                return Err(MonitorError::State(format!(
                    "failed to read state file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let states: HashMap<String, ViolationState> = serde_json::from_str(&data)
            .map_err(|e| {
                MonitorError::State(format!(
                    "failed to parse state file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        info!(
            "State loaded from {}: {} entries",
            path.display(),
            states.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            states,
        })
    }

    /// 获取已有状态或以 now 为首次检测时间创建
    pub fn get_or_create(&mut self, metric: &str, level: Severity, now: f64) -> &mut ViolationState {
        let key = state_key(metric, level);
        self.states
            .entry(key)
            .or_insert_with(|| ViolationState::new(metric, level, now))
    }

    pub fn get(&self, metric: &str, level: Severity) -> Option<&ViolationState> {
        self.states.get(&state_key(metric, level))
    }

    pub fn contains(&self, metric: &str, level: Severity) -> bool {
        self.states.contains_key(&state_key(metric, level))
    }

    /// 清除单个状态（违规已解除）
    pub fn clear(&mut self, metric: &str, level: Severity) -> bool {
        let key = state_key(metric, level);
        if self.states.remove(&key).is_some() {
            debug!("Clearing state for {}/{}", metric, level);
            true
        } else {
            false
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.states.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &ViolationState)> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 原子持久化：写临时文件后 rename 覆盖
    ///
    /// A partial write never corrupts previously durable state.
    pub fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let data = serde_json::to_string_pretty(&self.states)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data).map_err(|e| {
            MonitorError::State(format!(
                "failed to write state file {}: {}",
                tmp.display(),
                e
            ))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            MonitorError::State(format!(
                "failed to replace state file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("State saved to {}", self.path.display());
        Ok(())
    }
}
