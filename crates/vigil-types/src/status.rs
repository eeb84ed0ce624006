use serde::{Deserialize, Serialize};

/// 整体系统状态响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub status: String,
    pub info: Vec<String>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
            info: Vec::new(),
        }
    }

    /// 追加一条警告，不会把状态降级为 CRITICAL
    pub fn add_warning(&mut self, category: &str, msg: &str) {
        if self.status == "OK" {
            self.status = "WARN".to_string();
        }
        self.info.push(format!("{}: {}", category, msg));
    }

    /// 追加一条严重告警并把状态置为 CRITICAL
    pub fn add_critical(&mut self, category: &str, msg: &str) {
        self.status = "CRITICAL".to_string();
        self.info.push(format!("{}: {}", category, msg));
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            r#"{"status": "ERROR", "info": ["Failed to marshal status"]}"#.to_string()
        })
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let mut status = Status::ok();
        assert_eq!(status.status, "OK");

        status.add_warning("disk", "partition /dev/sda1 is 85.00% full");
        assert_eq!(status.status, "WARN");

        status.add_critical("memory", "free memory: 3.00%");
        assert_eq!(status.status, "CRITICAL");

        // 再加警告不会降级
        status.add_warning("cpu", "cpu usage: 75.00%");
        assert_eq!(status.status, "CRITICAL");
        assert_eq!(status.info.len(), 3);
    }

    #[test]
    fn test_status_to_json() {
        let mut status = Status::ok();
        status.add_warning("cpu", "high");
        let json: Status = serde_json::from_str(&status.to_json()).unwrap();
        assert_eq!(json.status, "WARN");
        assert_eq!(json.info, vec!["cpu: high"]);
    }
}
