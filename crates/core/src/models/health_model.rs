//! 健康检查与连接测试模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::execution_model::CommandResultItem;

/// 设备健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// 按健康分数判定状态：>= 80 健康，>= 50 降级，其余不健康
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Healthy
        } else if score >= 50.0 {
            Self::Degraded
        } else {
            Self::Unhealthy
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "healthy" => Ok(Self::Healthy),
            "degraded" => Ok(Self::Degraded),
            "unhealthy" => Ok(Self::Unhealthy),
            _ => Err(format!("Invalid health status: {s}")),
        }
    }
}

/// 传输层返回的健康检查结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthOutput {
    pub status: HealthStatus,
    pub health_score: f64,
    pub commands_executed: usize,
    pub successful_commands: usize,
    pub details: Vec<CommandResultItem>,
    /// 后端无法建立连接时的错误说明
    pub error: Option<String>,
}

/// 调度器对外暴露的健康报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub device_id: String,
    pub status: HealthStatus,
    pub health_score: f64,
    pub commands_executed: usize,
    pub successful_commands: usize,
    pub details: Vec<CommandResultItem>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn from_output(device_id: impl Into<String>, output: HealthOutput) -> Self {
        Self {
            device_id: device_id.into(),
            status: output.status,
            health_score: output.health_score,
            commands_executed: output.commands_executed,
            successful_commands: output.successful_commands,
            details: output.details,
            checked_at: Utc::now(),
        }
    }

    pub fn failed_commands(&self) -> usize {
        self.commands_executed
            .saturating_sub(self.successful_commands)
    }
}

/// 传输层返回的连接测试结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTestOutput {
    pub success: bool,
    pub message: String,
    pub total_tests: usize,
    pub successful_tests: usize,
}
