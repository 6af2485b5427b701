//! 命令历史记录模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单条命令历史
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub command: String,
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
}

impl HistoryEntry {
    pub fn new(command: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timestamp: Utc::now(),
            device_id: device_id.into(),
        }
    }
}
