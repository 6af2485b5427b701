//! 终端事件定义
//!
//! 会话状态机与命令调度器通过事件总线发出的事件名与负载。
//! 负载只携带 `SessionSummary` 或设备 ID，不包含密码。

use chrono::{DateTime, Utc};
use netterm_core::models::{
    BatchResult, CommandExecution, HealthReport, SequentialReport, SessionSummary,
};
use serde::{Deserialize, Serialize};

use super::builtin::BuiltinOutcome;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Ready,
    Executing,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Ready => write!(f, "ready"),
            Self::Executing => write!(f, "executing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartedPayload {
    pub session: SessionSummary,
    pub welcome: String,
    pub quick_commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMissingPayload {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClosedPayload {
    pub device_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecutingPayload {
    pub device_id: String,
    pub command: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandCompletedPayload {
    pub device_id: String,
    pub command: String,
    pub execution: CommandExecution,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedPayload {
    pub device_id: String,
    pub command: String,
    pub error: String,
    pub connection_error: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRejectedPayload {
    pub device_id: Option<String>,
    pub command: String,
    pub state: SessionState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltinExecutedPayload {
    pub device_id: String,
    #[serde(flatten)]
    pub outcome: BuiltinOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSuccessPayload {
    pub device_id: String,
    pub message: String,
    pub total_tests: usize,
    pub successful_tests: usize,
}

/// connectionError / healthCheckFailed 等只需设备和错误的负载
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceErrorPayload {
    pub device_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiCommandExecutingPayload {
    pub device_id: String,
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiCommandFailedPayload {
    pub device_id: String,
    pub commands: Vec<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiCommandCompletedPayload {
    pub device_id: String,
    pub report: SequentialReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckExecutingPayload {
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckCompletedPayload {
    pub device_id: String,
    pub report: HealthReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCompletedPayload {
    pub result: BatchResult,
}

/// 事件名称常量
pub mod event_names {
    pub const SESSION_STARTED: &str = "sessionStarted";
    pub const SESSION_MISSING: &str = "sessionMissing";
    pub const SESSION_CLOSED: &str = "sessionClosed";

    pub const COMMAND_EXECUTING: &str = "commandExecuting";
    pub const COMMAND_COMPLETED: &str = "commandCompleted";
    pub const COMMAND_FAILED: &str = "commandFailed";
    pub const COMMAND_REJECTED: &str = "commandRejected";
    pub const BUILTIN_EXECUTED: &str = "builtinExecuted";

    pub const CONNECTION_SUCCESS: &str = "connectionSuccess";
    pub const CONNECTION_ERROR: &str = "connectionError";

    pub const MULTI_COMMAND_EXECUTING: &str = "multiCommandExecuting";
    pub const MULTI_COMMAND_COMPLETED: &str = "multiCommandCompleted";
    pub const MULTI_COMMAND_FAILED: &str = "multiCommandFailed";

    pub const HEALTH_CHECK_EXECUTING: &str = "healthCheckExecuting";
    pub const HEALTH_CHECK_COMPLETED: &str = "healthCheckCompleted";
    pub const HEALTH_CHECK_FAILED: &str = "healthCheckFailed";

    pub const BATCH_COMMAND_COMPLETED: &str = "batchCommandCompleted";
    pub const BATCH_HEALTH_CHECK_COMPLETED: &str = "batchHealthCheckCompleted";

    pub const MAINTENANCE_COMPLETED: &str = "maintenanceCompleted";

    pub use crate::event_bus::LISTENER_ERROR;
}
