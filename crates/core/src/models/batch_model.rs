//! 多目标批量执行结果

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::execution_model::CommandExecution;
use super::health_model::HealthReport;

/// 单个目标的结果类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOutcome {
    Success,
    Failure,
}

/// 单个目标的结果详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TargetDetail {
    Execution { execution: CommandExecution },
    Health { report: HealthReport },
    Error { message: String },
}

/// 单个目标的报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    pub target_id: String,
    pub outcome: TargetOutcome,
    pub detail: TargetDetail,
}

impl TargetReport {
    pub fn success(target_id: impl Into<String>, detail: TargetDetail) -> Self {
        Self {
            target_id: target_id.into(),
            outcome: TargetOutcome::Success,
            detail,
        }
    }

    pub fn failure(target_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            outcome: TargetOutcome::Failure,
            detail: TargetDetail::Error {
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == TargetOutcome::Success
    }
}

/// 汇总计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchTotals {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// 批量执行结果
///
/// 每次批量调用构造一次，构造后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    per_target: Vec<TargetReport>,
    totals: BatchTotals,
    command: String,
    executed_at: DateTime<Utc>,
}

impl BatchResult {
    pub fn new(command: impl Into<String>, per_target: Vec<TargetReport>) -> Self {
        let succeeded = per_target.iter().filter(|r| r.is_success()).count();
        let totals = BatchTotals {
            attempted: per_target.len(),
            succeeded,
            failed: per_target.len() - succeeded,
        };
        Self {
            per_target,
            totals,
            command: command.into(),
            executed_at: Utc::now(),
        }
    }

    pub fn per_target(&self) -> &[TargetReport] {
        &self.per_target
    }

    pub fn totals(&self) -> BatchTotals {
        self.totals
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn executed_at(&self) -> DateTime<Utc> {
        self.executed_at
    }

    /// 所有目标都成功
    pub fn all_succeeded(&self) -> bool {
        self.totals.failed == 0
    }

    pub fn get(&self, target_id: &str) -> Option<&TargetReport> {
        self.per_target.iter().find(|r| r.target_id == target_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_computed_once() {
        let result = BatchResult::new(
            "show clock",
            vec![
                TargetReport::success(
                    "1",
                    TargetDetail::Execution {
                        execution: CommandExecution::queued("show clock"),
                    },
                ),
                TargetReport::failure("2", "timeout"),
                TargetReport::success(
                    "3",
                    TargetDetail::Execution {
                        execution: CommandExecution::queued("show clock"),
                    },
                ),
            ],
        );

        assert_eq!(
            result.totals(),
            BatchTotals {
                attempted: 3,
                succeeded: 2,
                failed: 1
            }
        );
        assert!(!result.all_succeeded());
        assert_eq!(result.get("2").unwrap().outcome, TargetOutcome::Failure);
    }

    #[test]
    fn test_empty_batch() {
        let result = BatchResult::new("noop", vec![]);
        assert_eq!(result.totals(), BatchTotals::default());
        assert!(result.all_succeeded());
    }

    #[test]
    fn test_failure_detail_serialize() {
        let json = serde_json::to_value(TargetReport::failure("9", "boom")).unwrap();
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["detail"]["kind"], "error");
        assert_eq!(json["detail"]["message"], "boom");
    }
}
