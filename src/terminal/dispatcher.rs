//! 命令调度器
//!
//! 把一条或多条命令翻译为传输层调用，归一化结果并通过事件总线发出生命周期事件。
//!
//! ## 功能
//! - 单目标单命令：`commandExecuting` → `commandCompleted` | `commandFailed`
//! - 单目标多命令：`multiCommandExecuting` → `multiCommandCompleted` | `multiCommandFailed`
//! - 多目标并发执行与健康检查，部分失败不影响其他目标
//! - 连接测试、可用命令查询
//!
//! 所有传输层错误都在这一层转换为 `ExecutionError`，不会向上抛出为未处理故障。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use netterm_core::models::{
    BatchResult, CommandExecution, ConnectionTestOutput, Credentials, DeviceTarget, HealthReport,
    SequentialReport, TargetCredentials, TargetDetail, TargetReport,
};
use netterm_infra::{Transport, TransportError};
use serde::Serialize;

use super::error::ExecutionError;
use super::events::{
    event_names, BatchCompletedPayload, CommandCompletedPayload, CommandExecutingPayload,
    CommandFailedPayload, ConnectionSuccessPayload, DeviceErrorPayload,
    HealthCheckCompletedPayload, HealthCheckExecutingPayload, MultiCommandCompletedPayload,
    MultiCommandExecutingPayload, MultiCommandFailedPayload,
};
use super::persistence::SessionPersistence;
use crate::event_bus::{EmitOptions, EventBus};

/// 调度器发出事件时使用的 source
pub const DISPATCHER_SOURCE: &str = "dispatcher";

/// 批量健康检查结果中的命令名
pub const HEALTH_CHECK_COMMAND: &str = "health-check";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// 多目标执行时单个目标的超时
    pub target_timeout: Duration,
    /// 多命令执行时的命令间隔
    pub inter_command_delay: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            target_timeout: Duration::from_secs(60),
            inter_command_delay: Duration::from_millis(1000),
        }
    }
}

/// 命令调度器
///
/// 持有传输层、持久化层和事件总线的句柄；可以在多个会话之间共享。
#[derive(Clone)]
pub struct CommandDispatcher {
    transport: Arc<dyn Transport>,
    persistence: Arc<dyn SessionPersistence>,
    bus: EventBus,
    config: DispatcherConfig,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        persistence: Arc<dyn SessionPersistence>,
        bus: EventBus,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            transport,
            persistence,
            bus,
            config,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> DispatcherConfig {
        self.config
    }

    fn publish<T: Serialize>(&self, event_name: &str, payload: &T) {
        self.bus
            .publish_with(event_name, payload, EmitOptions::source(DISPATCHER_SOURCE));
    }

    fn publish_connection_error(&self, device_id: &str, error: &ExecutionError) {
        self.publish(
            event_names::CONNECTION_ERROR,
            &DeviceErrorPayload {
                device_id: device_id.to_string(),
                error: error.to_string(),
            },
        );
    }

    fn publish_command_failed(&self, device_id: &str, command: &str, error: &ExecutionError) {
        let connection_error = error.is_connection_error();
        self.publish(
            event_names::COMMAND_FAILED,
            &CommandFailedPayload {
                device_id: device_id.to_string(),
                command: command.to_string(),
                error: error.to_string(),
                connection_error,
            },
        );
        if connection_error {
            self.publish_connection_error(device_id, error);
        }
    }

    fn record_history(&self, device_id: &str, command: &str) {
        if let Err(e) = self.persistence.append_history(device_id, command) {
            tracing::warn!("[Dispatcher] 写入历史失败: device={} error={}", device_id, e);
        }
    }

    // ------------------------------------------------------------------------
    // 单目标
    // ------------------------------------------------------------------------

    /// 在单个目标上执行一条命令
    ///
    /// # 参数
    /// - `target`: 目标设备
    /// - `credentials`: 凭证，在发起请求前校验
    /// - `command`: 命令，首尾空白会被去掉
    ///
    /// # 返回
    /// 成功时返回执行记录（远程命令自身的成败记录在 `exit_info` 中）；
    /// 无论成败都恰好发出一个 `commandCompleted` 或 `commandFailed`
    pub async fn execute_one(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
        command: &str,
    ) -> Result<CommandExecution, ExecutionError> {
        self.execute_one_then(target, credentials, command, || {})
            .await
    }

    /// 同 [`Self::execute_one`]，`on_settled` 在终态事件发出之前调用一次
    ///
    /// 终端会话借此在监听器收到 `commandCompleted` / `commandFailed` 之前回到 `Ready`。
    pub async fn execute_one_then<F>(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
        command: &str,
        on_settled: F,
    ) -> Result<CommandExecution, ExecutionError>
    where
        F: FnOnce() + Send,
    {
        let command = command.trim();
        if command.is_empty() {
            let err = ExecutionError::EmptyCommand;
            on_settled();
            self.publish_command_failed(&target.id, command, &err);
            return Err(err);
        }
        if let Err(reason) = credentials.validate() {
            let err = ExecutionError::InvalidInput(reason);
            on_settled();
            self.publish_command_failed(&target.id, command, &err);
            return Err(err);
        }

        let mut execution = CommandExecution::queued(command);
        execution.start();
        self.publish(
            event_names::COMMAND_EXECUTING,
            &CommandExecutingPayload {
                device_id: target.id.clone(),
                command: command.to_string(),
                started_at: execution.started_at,
            },
        );
        tracing::info!(
            "[Dispatcher] 执行命令: device={} command={}",
            target.id,
            command
        );

        match self
            .transport
            .execute_command(target, credentials, command)
            .await
        {
            Ok(output) => {
                execution.succeed(output);
                self.record_history(&target.id, command);
                tracing::debug!(
                    "[Dispatcher] 命令完成: device={} duration_ms={:?}",
                    target.id,
                    execution.duration_ms
                );
                on_settled();
                self.publish(
                    event_names::COMMAND_COMPLETED,
                    &CommandCompletedPayload {
                        device_id: target.id.clone(),
                        command: command.to_string(),
                        execution: execution.clone(),
                    },
                );
                Ok(execution)
            }
            Err(e) => {
                let err = ExecutionError::from(e);
                tracing::warn!(
                    "[Dispatcher] 命令失败: device={} command={} error={}",
                    target.id,
                    command,
                    err
                );
                on_settled();
                self.publish_command_failed(&target.id, command, &err);
                Err(err)
            }
        }
    }

    /// 在单个目标上按顺序执行多条命令
    ///
    /// 命令间隔使用配置中的 `inter_command_delay`；某条命令失败是否中止后续命令由后端决定，
    /// 这里只转发后端返回的逐条结果。
    pub async fn execute_many(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
        commands: &[String],
    ) -> Result<SequentialReport, ExecutionError> {
        self.execute_many_with_delay(target, credentials, commands, self.config.inter_command_delay)
            .await
    }

    pub async fn execute_many_with_delay(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
        commands: &[String],
        inter_command_delay: Duration,
    ) -> Result<SequentialReport, ExecutionError> {
        let commands: Vec<String> = commands.iter().map(|c| c.trim().to_string()).collect();

        let validation = if commands.is_empty() {
            Err(ExecutionError::InvalidInput("命令列表不能为空".to_string()))
        } else if commands.iter().any(String::is_empty) {
            Err(ExecutionError::InvalidInput("命令列表中包含空命令".to_string()))
        } else {
            credentials.validate().map_err(ExecutionError::InvalidInput)
        };
        if let Err(err) = validation {
            self.publish_multi_failed(&target.id, &commands, &err);
            return Err(err);
        }

        self.publish(
            event_names::MULTI_COMMAND_EXECUTING,
            &MultiCommandExecutingPayload {
                device_id: target.id.clone(),
                commands: commands.clone(),
            },
        );
        tracing::info!(
            "[Dispatcher] 顺序执行 {} 条命令: device={}",
            commands.len(),
            target.id
        );

        match self
            .transport
            .execute_commands(target, credentials, &commands, inter_command_delay)
            .await
        {
            Ok(output) => {
                for item in output.results.iter().filter(|r| r.success) {
                    self.record_history(&target.id, &item.command);
                }
                let report = SequentialReport {
                    target_id: target.id.clone(),
                    commands,
                    results: output.results,
                    total_execution_time_secs: output.total_execution_time_secs,
                    executed_at: Utc::now(),
                };
                self.publish(
                    event_names::MULTI_COMMAND_COMPLETED,
                    &MultiCommandCompletedPayload {
                        device_id: target.id.clone(),
                        report: report.clone(),
                    },
                );
                Ok(report)
            }
            Err(e) => {
                let err = ExecutionError::from(e);
                tracing::warn!("[Dispatcher] 多命令执行失败: device={} error={}", target.id, err);
                self.publish_multi_failed(&target.id, &commands, &err);
                Err(err)
            }
        }
    }

    fn publish_multi_failed(&self, device_id: &str, commands: &[String], error: &ExecutionError) {
        self.publish(
            event_names::MULTI_COMMAND_FAILED,
            &MultiCommandFailedPayload {
                device_id: device_id.to_string(),
                commands: commands.to_vec(),
                error: error.to_string(),
            },
        );
        if error.is_connection_error() {
            self.publish_connection_error(device_id, error);
        }
    }

    /// 健康检查
    ///
    /// 后端返回的 `error` 字段不算调用失败，报告状态会反映出来。
    pub async fn health_check(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
    ) -> Result<HealthReport, ExecutionError> {
        if let Err(reason) = credentials.validate() {
            let err = ExecutionError::InvalidInput(reason);
            self.publish_health_failed(&target.id, &err);
            return Err(err);
        }

        self.publish(
            event_names::HEALTH_CHECK_EXECUTING,
            &HealthCheckExecutingPayload {
                device_id: target.id.clone(),
            },
        );

        match self.transport.health_check(target, credentials).await {
            Ok(output) => {
                if let Some(error) = &output.error {
                    tracing::warn!(
                        "[Dispatcher] 健康检查返回错误: device={} error={}",
                        target.id,
                        error
                    );
                }
                let report = HealthReport::from_output(target.id.clone(), output);
                tracing::info!(
                    "[Dispatcher] 健康检查完成: device={} status={:?} score={}",
                    target.id,
                    report.status,
                    report.health_score
                );
                self.publish(
                    event_names::HEALTH_CHECK_COMPLETED,
                    &HealthCheckCompletedPayload {
                        device_id: target.id.clone(),
                        report: report.clone(),
                    },
                );
                Ok(report)
            }
            Err(e) => {
                let err = ExecutionError::from(e);
                tracing::warn!("[Dispatcher] 健康检查失败: device={} error={}", target.id, err);
                self.publish_health_failed(&target.id, &err);
                Err(err)
            }
        }
    }

    fn publish_health_failed(&self, device_id: &str, error: &ExecutionError) {
        self.publish(
            event_names::HEALTH_CHECK_FAILED,
            &DeviceErrorPayload {
                device_id: device_id.to_string(),
                error: error.to_string(),
            },
        );
        if error.is_connection_error() {
            self.publish_connection_error(device_id, error);
        }
    }

    /// 测试连接
    ///
    /// 先校验凭证（用户名、密码非空，端口非零），再请求后端。
    /// 后端报告失败时返回 `TransportError::Rejected`。
    pub async fn test_connection(
        &self,
        target: &DeviceTarget,
        credentials: &Credentials,
    ) -> Result<ConnectionTestOutput, ExecutionError> {
        let result = match credentials.validate() {
            Err(reason) => Err(ExecutionError::InvalidInput(reason)),
            Ok(()) => match self.transport.test_connection(target, credentials).await {
                Ok(output) if output.success => Ok(output),
                Ok(output) => Err(ExecutionError::Transport(TransportError::Rejected(
                    output.message,
                ))),
                Err(e) => Err(ExecutionError::from(e)),
            },
        };

        match &result {
            Ok(output) => {
                tracing::info!(
                    "[Dispatcher] 连接测试成功: device={} {}/{}",
                    target.id,
                    output.successful_tests,
                    output.total_tests
                );
                self.publish(
                    event_names::CONNECTION_SUCCESS,
                    &ConnectionSuccessPayload {
                        device_id: target.id.clone(),
                        message: output.message.clone(),
                        total_tests: output.total_tests,
                        successful_tests: output.successful_tests,
                    },
                );
            }
            Err(err) => {
                tracing::warn!("[Dispatcher] 连接测试失败: device={} error={}", target.id, err);
                self.publish_connection_error(&target.id, err);
            }
        }
        result
    }

    /// 查询目标支持的命令列表，保持后端给出的顺序
    pub async fn available_commands(
        &self,
        target: &DeviceTarget,
    ) -> Result<Vec<String>, ExecutionError> {
        let commands = self.transport.list_available_commands(target).await?;
        tracing::debug!(
            "[Dispatcher] 获取到 {} 条可用命令: device={}",
            commands.len(),
            target.id
        );
        Ok(commands)
    }

    // ------------------------------------------------------------------------
    // 多目标
    // ------------------------------------------------------------------------

    /// 在多个目标上并发执行同一条命令
    ///
    /// 每个目标单独受 `target_timeout` 限制；超时或出错记为该目标的 `Failure`，
    /// 整体调用不会失败。
    pub async fn execute_across_targets(
        &self,
        targets: &[TargetCredentials],
        command: &str,
    ) -> BatchResult {
        let command = command.trim();
        let timeout = self.config.target_timeout;
        tracing::info!(
            "[Dispatcher] 批量执行: targets={} command={}",
            targets.len(),
            command
        );

        let runs = targets.iter().map(|tc| async move {
            let id = tc.target.id.clone();
            match tokio::time::timeout(
                timeout,
                self.execute_one(&tc.target, &tc.credentials, command),
            )
            .await
            {
                Ok(Ok(execution)) => TargetReport::success(id, TargetDetail::Execution { execution }),
                Ok(Err(e)) => TargetReport::failure(id, e.to_string()),
                Err(_) => {
                    let err = ExecutionError::Timeout(timeout.as_millis() as u64);
                    self.publish_command_failed(&id, command, &err);
                    TargetReport::failure(id, err.to_string())
                }
            }
        });
        let result = BatchResult::new(command, join_all(runs).await);

        let totals = result.totals();
        tracing::info!(
            "[Dispatcher] 批量执行完成: attempted={} succeeded={} failed={}",
            totals.attempted,
            totals.succeeded,
            totals.failed
        );
        self.publish(
            event_names::BATCH_COMMAND_COMPLETED,
            &BatchCompletedPayload {
                result: result.clone(),
            },
        );
        result
    }

    /// 在多个目标上并发执行健康检查，失败规则同 [`Self::execute_across_targets`]
    pub async fn health_check_across_targets(&self, targets: &[TargetCredentials]) -> BatchResult {
        let timeout = self.config.target_timeout;
        tracing::info!("[Dispatcher] 批量健康检查: targets={}", targets.len());

        let runs = targets.iter().map(|tc| async move {
            let id = tc.target.id.clone();
            match tokio::time::timeout(timeout, self.health_check(&tc.target, &tc.credentials))
                .await
            {
                Ok(Ok(report)) => TargetReport::success(id, TargetDetail::Health { report }),
                Ok(Err(e)) => TargetReport::failure(id, e.to_string()),
                Err(_) => {
                    let err = ExecutionError::Timeout(timeout.as_millis() as u64);
                    self.publish_health_failed(&id, &err);
                    TargetReport::failure(id, err.to_string())
                }
            }
        });
        let result = BatchResult::new(HEALTH_CHECK_COMMAND, join_all(runs).await);

        self.publish(
            event_names::BATCH_HEALTH_CHECK_COMPLETED,
            &BatchCompletedPayload {
                result: result.clone(),
            },
        );
        result
    }
}
