//! 远程命令传输层
//!
//! 会话引擎不直接建立 SSH 连接，而是把命令交给一个远程命令后端执行。
//! 本模块定义后端的抽象接口 [`Transport`]，以及基于 HTTP 的实现 [`HttpTransport`]。
//!
//! ## 模块结构
//! - `mod.rs` - `Transport` trait 与 `TransportError`
//! - `http.rs` - reqwest 实现及响应解析

mod http;

pub use http::{HttpTransport, HttpTransportConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

use std::time::Duration;

use async_trait::async_trait;
use netterm_core::models::{
    BatchOutput, CommandOutput, ConnectionTestOutput, Credentials, DeviceTarget, HealthOutput,
};
use thiserror::Error;

/// 后端无法连上设备时 `detail` 的固定前缀
pub const CONNECTION_FAILED_PREFIX: &str = "Connection failed";

/// 传输层错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// 无法连接到后端
    #[error("网络错误: {0}")]
    Network(String),

    /// 请求超时
    #[error("请求超时")]
    Timeout,

    /// 后端返回非 2xx
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// 后端明确拒绝（如状态字段不是 completed）
    #[error("后端拒绝请求: {0}")]
    Rejected(String),

    /// 响应格式不符合预期
    #[error("响应解析失败: {0}")]
    Decode(String),
}

impl TransportError {
    /// 是否为连接层面的失败（后端不可达，或后端无法连上设备）
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Http { status, detail } => {
                *status == 400 && detail.starts_with(CONNECTION_FAILED_PREFIX)
            }
            _ => false,
        }
    }
}

impl serde::Serialize for TransportError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// 远程命令后端
///
/// 实现者负责与设备交互；调用方负责校验输入、发出事件和记录历史。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 执行单条命令
    async fn execute_command(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
        command: &str,
    ) -> TransportResult<CommandOutput>;

    /// 在同一连接上顺序执行多条命令，命令之间间隔 `delay`
    async fn execute_commands(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
        commands: &[String],
        delay: Duration,
    ) -> TransportResult<BatchOutput>;

    /// 测试连接
    async fn test_connection(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
    ) -> TransportResult<ConnectionTestOutput>;

    /// 健康检查
    async fn health_check(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
    ) -> TransportResult<HealthOutput>;

    /// 设备支持的快捷命令，保持后端返回的顺序
    async fn list_available_commands(&self, target: &DeviceTarget)
        -> TransportResult<Vec<String>>;
}
