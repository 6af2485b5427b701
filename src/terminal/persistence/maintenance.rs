//! 持久化数据的定期清理
//!
//! 启动后立即清理一次，之后按固定间隔重复，每次完成发出 `maintenanceCompleted`。
//! 生命周期由 `MaintenanceHandle` 持有，丢弃句柄即停止。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{MaintenanceReport, SessionPersistence};
use crate::event_bus::{EmitOptions, EventBus};
use crate::terminal::error::TerminalError;
use crate::terminal::events::event_names;

const MAINTENANCE_SOURCE: &str = "maintenance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceConfig {
    pub interval: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
        }
    }
}

pub struct MaintenanceScheduler;

impl MaintenanceScheduler {
    /// 在当前 tokio 运行时上启动清理任务
    pub fn start(
        persistence: Arc<dyn SessionPersistence>,
        bus: EventBus,
        config: MaintenanceConfig,
    ) -> MaintenanceHandle {
        let token = CancellationToken::new();
        let child = token.child_token();
        let period = config.interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!("[Maintenance] 清理任务已启动: interval={:?}", period);

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        match run_once(persistence.clone()).await {
                            Ok(report) => {
                                if report.expired_sessions > 0 || report.purged_history > 0 {
                                    tracing::info!(
                                        "[Maintenance] 清理完成: expired_sessions={} purged_history={}",
                                        report.expired_sessions,
                                        report.purged_history
                                    );
                                }
                                bus.publish_with(
                                    event_names::MAINTENANCE_COMPLETED,
                                    &report,
                                    EmitOptions::source(MAINTENANCE_SOURCE),
                                );
                            }
                            Err(e) => tracing::warn!("[Maintenance] 清理失败: {}", e),
                        }
                    }
                }
            }

            tracing::info!("[Maintenance] 清理任务已停止");
        });

        MaintenanceHandle {
            token,
            task: Some(task),
        }
    }
}

async fn run_once(
    persistence: Arc<dyn SessionPersistence>,
) -> Result<MaintenanceReport, TerminalError> {
    tokio::task::spawn_blocking(move || persistence.run_maintenance(Utc::now()))
        .await
        .map_err(|e| TerminalError::Internal(format!("清理任务异常退出: {}", e)))?
}

/// 清理任务句柄
pub struct MaintenanceHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MaintenanceHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// 停止任务并等待其退出
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("[Maintenance] 等待清理任务退出失败: {}", e);
            }
        }
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
