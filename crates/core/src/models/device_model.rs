//! 设备与凭证模型
//!
//! 设备目标（由后端编号）和 SSH 凭证。凭证不实现 `Serialize`，
//! 因此无法被直接写入事件负载；需要展示时使用 [`RedactedCredentials`]。

use serde::{Deserialize, Serialize};

/// 默认 SSH 端口
pub const DEFAULT_SSH_PORT: u16 = 22;

/// 远程设备目标
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceTarget {
    /// 后端设备 ID
    pub id: String,
    /// 设备名称
    pub name: String,
    /// 设备 IP
    pub ip: String,
    /// 设备类型（cisco_ios / mikrotik / ubuntu / windows ...）
    pub device_type: String,
}

impl DeviceTarget {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        ip: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ip: ip.into(),
            device_type: device_type.into(),
        }
    }
}

/// SSH 凭证
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub port: u16,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, port: u16) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            port,
        }
    }

    /// 校验凭证
    ///
    /// 在任何网络请求之前调用，返回所有问题拼接后的描述。
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push("用户名不能为空");
        }
        if self.password.trim().is_empty() {
            errors.push("密码不能为空");
        }
        if self.port == 0 {
            errors.push("端口必须在 1-65535 之间");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }

    /// 脱敏视图
    pub fn redacted(&self) -> RedactedCredentials {
        RedactedCredentials {
            username: self.username.clone(),
            port: self.port,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("port", &self.port)
            .finish()
    }
}

/// 脱敏凭证（可安全序列化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedCredentials {
    pub username: String,
    pub port: u16,
}

/// 批量操作中的单个目标
#[derive(Debug, Clone)]
pub struct TargetCredentials {
    pub target: DeviceTarget,
    pub credentials: Credentials,
}

impl TargetCredentials {
    pub fn new(target: DeviceTarget, credentials: Credentials) -> Self {
        Self {
            target,
            credentials,
        }
    }
}
