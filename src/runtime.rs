//! 运行时装配
//!
//! 按配置构造事件总线、传输层、持久化层和调度器，并管理后台清理任务的启停。
//! 所有组件都是显式构造、注入的实例，进程内没有全局单例。

use std::sync::Arc;
use std::time::Instant;

use netterm_core::models::{Credentials, DeviceTarget, Session};
use netterm_infra::{HttpTransport, Transport};
use serde::{Deserialize, Serialize};

use crate::config::NettermConfig;
use crate::database;
use crate::event_bus::EventBus;
use crate::terminal::dispatcher::CommandDispatcher;
use crate::terminal::error::TerminalError;
use crate::terminal::persistence::{
    MaintenanceHandle, MaintenanceScheduler, SessionPersistence, SqliteSessionStore,
};
use crate::terminal::session::TerminalSession;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStatus {
    pub running: bool,
    pub maintenance_running: bool,
    pub uptime_secs: u64,
    pub event_history_size: usize,
    pub total_listeners: usize,
}

pub struct TerminalRuntime {
    config: NettermConfig,
    bus: EventBus,
    persistence: Arc<dyn SessionPersistence>,
    dispatcher: CommandDispatcher,
    maintenance: Option<MaintenanceHandle>,
    start_time: Option<Instant>,
}

impl TerminalRuntime {
    /// 按配置构造：HTTP 传输层 + SQLite 持久化
    pub fn new(config: NettermConfig) -> Result<Self, TerminalError> {
        let transport = HttpTransport::new(config.transport_config())
            .map_err(|e| TerminalError::Config(format!("创建传输层失败: {}", e)))?;

        let db = match config.database_path() {
            Some(path) => database::open(&path)?,
            None => {
                tracing::warn!("[Runtime] 无法确定数据库路径，使用内存数据库");
                database::open_in_memory()?
            }
        };
        let store = SqliteSessionStore::open(db, config.store_limits())?;

        Ok(Self::with_parts(config, Arc::new(transport), Arc::new(store)))
    }

    /// 使用给定的传输层和持久化层构造
    pub fn with_parts(
        config: NettermConfig,
        transport: Arc<dyn Transport>,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Self {
        let bus = EventBus::new(config.event_bus_config());
        let dispatcher = CommandDispatcher::new(
            transport,
            persistence.clone(),
            bus.clone(),
            config.dispatcher_config(),
        );
        Self {
            config,
            bus,
            persistence,
            dispatcher,
            maintenance: None,
            start_time: None,
        }
    }

    pub fn config(&self) -> &NettermConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn persistence(&self) -> Arc<dyn SessionPersistence> {
        self.persistence.clone()
    }

    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }

    /// 启动后台清理任务；需要在 tokio 运行时内调用，重复调用无效果
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        if self.config.maintenance.enabled {
            self.maintenance = Some(MaintenanceScheduler::start(
                self.persistence.clone(),
                self.bus.clone(),
                self.config.maintenance_config(),
            ));
        }
        self.start_time = Some(Instant::now());
        tracing::info!("[Runtime] 已启动");
    }

    pub async fn stop(&mut self) {
        if let Some(handle) = self.maintenance.take() {
            handle.stop().await;
        }
        self.start_time = None;
        tracing::info!("[Runtime] 已停止");
    }

    pub fn status(&self) -> RuntimeStatus {
        let stats = self.bus.stats();
        RuntimeStatus {
            running: self.is_running(),
            maintenance_running: self
                .maintenance
                .as_ref()
                .is_some_and(MaintenanceHandle::is_running),
            uptime_secs: self
                .start_time
                .map(|t| t.elapsed().as_secs())
                .unwrap_or(0),
            event_history_size: stats.history_size,
            total_listeners: stats.total_listeners,
        }
    }

    /// 测试连接，成功后保存为当前会话
    pub async fn connect(
        &self,
        target: DeviceTarget,
        credentials: Credentials,
    ) -> Result<Session, TerminalError> {
        self.dispatcher
            .test_connection(&target, &credentials)
            .await?;
        let session = Session::new(target, credentials);
        self.persistence.save_session(&session)?;
        tracing::info!("[Runtime] 已保存会话: device={}", session.device_id());
        Ok(session)
    }

    /// 新建一个终端会话（尚未初始化）
    pub fn open_terminal(&self) -> TerminalSession {
        TerminalSession::new(
            self.dispatcher.clone(),
            self.persistence.clone(),
            self.config.terminal_settings(),
        )
    }
}
