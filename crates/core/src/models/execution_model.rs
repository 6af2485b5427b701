//! 命令执行模型
//!
//! 包含传输层返回的原始结果（`CommandOutput`、`BatchOutput`）以及
//! 调度器对外暴露的执行记录（`CommandExecution`、`SequentialReport`）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 命令执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    #[default]
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 远程命令的退出信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitInfo {
    /// 远程命令自身是否成功（与传输是否成功无关）
    pub success: bool,
    pub exit_code: Option<i32>,
}

/// 传输层返回的单条命令结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    /// 后端测得的执行耗时（秒）
    pub execution_time_secs: f64,
}

/// 多命令执行中的单条结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandResultItem {
    pub command: String,
    pub success: bool,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// 传输层返回的多命令结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<CommandResultItem>,
    pub total_execution_time_secs: f64,
}

/// 一次命令调度的执行记录
///
/// 只在一次调度期间存在，不持久化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecution {
    pub command: String,
    pub state: ExecutionState,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_info: Option<ExitInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl CommandExecution {
    pub fn queued(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            state: ExecutionState::Queued,
            started_at: Utc::now(),
            stdout: None,
            stderr: None,
            exit_info: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.state = ExecutionState::Running;
        self.started_at = Utc::now();
    }

    /// 以传输结果完成
    pub fn succeed(&mut self, output: CommandOutput) {
        self.state = ExecutionState::Succeeded;
        self.stdout = Some(output.stdout);
        self.stderr = Some(output.stderr);
        self.exit_info = Some(ExitInfo {
            success: output.success,
            exit_code: None,
        });
        self.duration_ms = Some(self.elapsed_ms());
    }

    pub fn fail(&mut self, stderr: impl Into<String>) {
        self.state = ExecutionState::Failed;
        self.stderr = Some(stderr.into());
        self.duration_ms = Some(self.elapsed_ms());
    }

    fn elapsed_ms(&self) -> u64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// 单设备多命令顺序执行报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialReport {
    pub target_id: String,
    pub commands: Vec<String>,
    pub results: Vec<CommandResultItem>,
    pub total_execution_time_secs: f64,
    pub executed_at: DateTime<Utc>,
}

impl SequentialReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}
