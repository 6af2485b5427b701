//! 会话模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device_model::{Credentials, DeviceTarget};

/// 一次交互式会话
///
/// 绑定单个远程设备和一组凭证。包含明文密码，只在进程内流转。
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub device: DeviceTarget,
    pub credentials: Credentials,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(device: DeviceTarget, credentials: Credentials) -> Self {
        Self {
            device,
            credentials,
            started_at: Utc::now(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// 会话是否已超过有效期
    pub fn is_expired(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.started_at >= ttl
    }

    /// 提示符，如 `admin@core-sw1:~$`
    pub fn prompt(&self) -> String {
        format!("{}@{}:~$", self.credentials.username, self.device.name)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            device_id: self.device.id.clone(),
            device_name: self.device.name.clone(),
            device_ip: self.device.ip.clone(),
            device_type: self.device.device_type.clone(),
            username: self.credentials.username.clone(),
            port: self.credentials.port,
            started_at: self.started_at,
        }
    }
}

/// 会话摘要（不含密码，可用于事件负载）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub device_id: String,
    pub device_name: String,
    pub device_ip: String,
    pub device_type: String,
    pub username: String,
    pub port: u16,
    pub started_at: DateTime<Utc>,
}
