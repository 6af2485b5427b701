//! 终端模块错误类型
//!
//! 定义会话状态机、命令调度器和持久化层的错误类型。
//!
//! ## 功能
//! - 会话状态错误（未就绪、忙碌、已关闭、失效）
//! - 命令执行错误（空命令、传输失败、超时）
//! - 数据库错误
//! - 序列化支持

use netterm_infra::TransportError;
use thiserror::Error;

/// 命令执行错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// 命令为空
    #[error("命令不能为空")]
    EmptyCommand,

    /// 输入无效（凭证、命令列表等），在发起任何网络请求之前拒绝
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 传输层失败
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// 目标在限定时间内未返回
    #[error("执行超时（{0} ms）")]
    Timeout(u64),
}

impl ExecutionError {
    /// 是否为连接层面的失败
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connection_error(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}

impl serde::Serialize for ExecutionError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// 终端错误类型
#[derive(Debug, Error)]
pub enum TerminalError {
    /// 命令执行失败
    #[error("命令执行失败: {0}")]
    Execution(#[from] ExecutionError),

    /// 没有可用的会话记录
    #[error("会话无效: {0}")]
    SessionInvalid(String),

    /// 会话已关闭
    #[error("会话已关闭")]
    SessionClosed,

    /// 已有命令在执行
    #[error("已有命令正在执行")]
    SessionBusy,

    /// 会话尚未初始化
    #[error("会话尚未初始化")]
    NotReady,

    /// 数据库错误
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl From<TerminalError> for String {
    fn from(err: TerminalError) -> Self {
        err.to_string()
    }
}

impl serde::Serialize for TerminalError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
