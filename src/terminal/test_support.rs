//! 终端测试辅助：脚本化传输层与常用构造

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netterm_core::models::{
    BatchOutput, CommandOutput, CommandResultItem, ConnectionTestOutput, Credentials,
    DeviceTarget, HealthOutput, HealthStatus, Session,
};
use netterm_infra::{Transport, TransportError, TransportResult};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::dispatcher::{CommandDispatcher, DispatcherConfig};
use super::persistence::{MemorySessionStore, SessionPersistence, StoreLimits};
use super::session::{TerminalSession, TerminalSettings};
use crate::event_bus::EventBus;

/// 按目标 ID 脚本化的传输层
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    failures: Mutex<HashMap<String, TransportError>>,
    hanging: Mutex<HashSet<String>>,
    available: Mutex<Option<Vec<String>>>,
    gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_target(self, target_id: &str, error: TransportError) -> Self {
        self.failures.lock().insert(target_id.to_string(), error);
        self
    }

    /// 该目标的调用永远不返回
    pub(crate) fn hang_target(self, target_id: &str) -> Self {
        self.hanging.lock().insert(target_id.to_string());
        self
    }

    pub(crate) fn with_available(self, commands: &[&str]) -> Self {
        *self.available.lock() = Some(commands.iter().map(|c| c.to_string()).collect());
        self
    }

    /// 执行命令前等待 `gate` 放行
    pub(crate) fn with_gate(self, gate: Arc<Notify>) -> Self {
        *self.gate.lock() = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn enter(&self, call: String, target: &DeviceTarget) -> TransportResult<()> {
        self.calls.lock().push(call);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let hang = self.hanging.lock().contains(&target.id);
        if hang {
            std::future::pending::<()>().await;
        }
        let failure = self.failures.lock().get(&target.id).cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute_command(
        &self,
        target: &DeviceTarget,
        _credentials: &Credentials,
        command: &str,
    ) -> TransportResult<CommandOutput> {
        self.enter(format!("execute:{}:{}", target.id, command), target)
            .await?;
        Ok(CommandOutput {
            stdout: format!("{} output from {}", command, target.name),
            stderr: String::new(),
            success: true,
            execution_time_secs: 0.05,
        })
    }

    async fn execute_commands(
        &self,
        target: &DeviceTarget,
        _credentials: &Credentials,
        commands: &[String],
        _inter_command_delay: Duration,
    ) -> TransportResult<BatchOutput> {
        self.enter(format!("execute-multiple:{}", target.id), target)
            .await?;
        let results = commands
            .iter()
            .map(|command| CommandResultItem {
                command: command.clone(),
                success: !command.starts_with("bad"),
                stdout: format!("{} ok", command),
                stderr: String::new(),
            })
            .collect();
        Ok(BatchOutput {
            results,
            total_execution_time_secs: 0.2,
        })
    }

    async fn test_connection(
        &self,
        target: &DeviceTarget,
        _credentials: &Credentials,
    ) -> TransportResult<ConnectionTestOutput> {
        self.enter(format!("test:{}", target.id), target).await?;
        Ok(ConnectionTestOutput {
            success: true,
            message: "Connection successful".to_string(),
            total_tests: 3,
            successful_tests: 3,
        })
    }

    async fn health_check(
        &self,
        target: &DeviceTarget,
        _credentials: &Credentials,
    ) -> TransportResult<HealthOutput> {
        self.enter(format!("health:{}", target.id), target).await?;
        Ok(HealthOutput {
            status: HealthStatus::Healthy,
            health_score: 100.0,
            commands_executed: 2,
            successful_commands: 2,
            details: Vec::new(),
            error: None,
        })
    }

    async fn list_available_commands(&self, target: &DeviceTarget) -> TransportResult<Vec<String>> {
        self.calls.lock().push(format!("available:{}", target.id));
        self.available
            .lock()
            .clone()
            .ok_or_else(|| TransportError::Network("available commands unavailable".to_string()))
    }
}

pub(crate) fn target(id: &str) -> DeviceTarget {
    DeviceTarget::new(id, format!("device-{}", id), format!("10.0.0.{}", id), "cisco_ios")
}

pub(crate) fn credentials() -> Credentials {
    Credentials::new("admin", "s3cret-pw", 22)
}

pub(crate) fn stored_session() -> Session {
    Session::new(target("1"), credentials())
}

pub(crate) struct Harness {
    pub bus: EventBus,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemorySessionStore>,
    pub dispatcher: CommandDispatcher,
}

impl Harness {
    pub(crate) fn new(transport: ScriptedTransport, store: MemorySessionStore) -> Self {
        Self::with_config(transport, store, DispatcherConfig::default())
    }

    pub(crate) fn with_config(
        transport: ScriptedTransport,
        store: MemorySessionStore,
        config: DispatcherConfig,
    ) -> Self {
        let bus = EventBus::default();
        let transport = Arc::new(transport);
        let store = Arc::new(store);
        let dispatcher = CommandDispatcher::new(
            transport.clone(),
            store.clone() as Arc<dyn SessionPersistence>,
            bus.clone(),
            config,
        );
        Self {
            bus,
            transport,
            store,
            dispatcher,
        }
    }

    /// 带一条有效会话记录的环境
    pub(crate) fn with_session(transport: ScriptedTransport) -> Self {
        Self::new(
            transport,
            MemorySessionStore::with_session(stored_session(), StoreLimits::default()),
        )
    }

    pub(crate) fn terminal(&self) -> TerminalSession {
        TerminalSession::new(
            self.dispatcher.clone(),
            self.store.clone(),
            TerminalSettings::default(),
        )
    }

    /// 总线历史中的事件名
    pub(crate) fn event_names(&self) -> Vec<String> {
        self.bus
            .history(None, None)
            .into_iter()
            .map(|e| e.name)
            .collect()
    }
}
