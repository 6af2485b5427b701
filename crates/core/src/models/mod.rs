//! 数据模型
//!
//! 设备、凭证、会话、历史记录、命令执行、批量结果和健康检查的纯数据类型。

pub mod batch_model;
pub mod device_model;
pub mod execution_model;
pub mod health_model;
pub mod history_model;
pub mod session_model;

pub use batch_model::{BatchResult, BatchTotals, TargetDetail, TargetOutcome, TargetReport};
pub use device_model::{Credentials, DeviceTarget, RedactedCredentials, TargetCredentials};
pub use execution_model::{
    BatchOutput, CommandExecution, CommandOutput, CommandResultItem, ExecutionState, ExitInfo,
    SequentialReport,
};
pub use health_model::{ConnectionTestOutput, HealthOutput, HealthReport, HealthStatus};
pub use history_model::HistoryEntry;
pub use session_model::{Session, SessionSummary};
