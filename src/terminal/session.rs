//! 终端会话状态机
//!
//! 一个 `TerminalSession` 对应一台设备上的一次交互式会话：
//! 会话身份、命令历史、历史游标以及是否有命令正在执行。
//!
//! ## 状态
//! `Uninitialized → Ready → Executing → Ready → ... → Closed`
//!
//! ## 提交命令的解析顺序
//! 1. 空输入直接忽略，不改变状态也不发事件
//! 2. 内置命令（clear、help、history、exit、whoami、pwd），只读写本地状态
//! 3. 其余命令交给 `CommandDispatcher`
//!
//! 内部锁从不跨 `.await` 持有，也不在持锁时发出事件，监听器可以安全地回查会话状态。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use netterm_core::models::{
    CommandExecution, HistoryEntry, RedactedCredentials, Session, SessionSummary,
};
use parking_lot::Mutex;
use serde::Serialize;

use super::builtin::{welcome_banner, BuiltinCommand, BuiltinOutcome};
use super::dispatcher::CommandDispatcher;
use super::error::{ExecutionError, TerminalError};
use super::events::{
    event_names, BuiltinExecutedPayload, CommandRejectedPayload, SessionClosedPayload,
    SessionMissingPayload, SessionStartedPayload, SessionState,
};
use super::history::{HistoryCursor, HistoryIndex, DEFAULT_HISTORY_CAPACITY};
use super::persistence::SessionPersistence;
use crate::event_bus::{EmitOptions, EventBus};

/// 会话发出事件时使用的 source
pub const TERMINAL_SOURCE: &str = "terminal";

/// 断开原因
pub const REASON_USER_EXIT: &str = "exit";
pub const REASON_DISCONNECT: &str = "disconnect";

/// 终端设置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalSettings {
    /// 内存历史容量
    pub history_capacity: usize,
    /// 按设备类型的默认快捷命令（获取可用命令失败时使用）
    pub default_commands: HashMap<String, Vec<String>>,
    /// 未知设备类型的快捷命令
    pub fallback_commands: Vec<String>,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            default_commands: default_device_commands(),
            fallback_commands: strings(&["help", "whoami", "pwd"]),
        }
    }
}

impl TerminalSettings {
    pub fn default_commands_for(&self, device_type: &str) -> Vec<String> {
        self.default_commands
            .get(device_type)
            .cloned()
            .unwrap_or_else(|| self.fallback_commands.clone())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 内置的按设备类型默认命令
pub fn default_device_commands() -> HashMap<String, Vec<String>> {
    HashMap::from([
        (
            "cisco_ios".to_string(),
            strings(&["show version", "show ip int brief", "show running-config"]),
        ),
        (
            "mikrotik".to_string(),
            strings(&[
                "/system resource print",
                "/interface print",
                "/ip address print",
            ]),
        ),
        (
            "ubuntu".to_string(),
            strings(&["ls -la", "ps aux", "df -h", "free -m"]),
        ),
        (
            "windows".to_string(),
            strings(&["dir", "ipconfig", "tasklist"]),
        ),
    ])
}

/// 提交命令的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 空输入
    Ignored,
    /// 内置命令在本地完成
    Builtin(BuiltinOutcome),
    /// 远程命令调度成功
    Completed(CommandExecution),
    /// 远程命令失败；会话仍回到 `Ready`
    Failed(ExecutionError),
}

/// Tab 补全结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    None,
    /// 唯一匹配，直接填入
    Single(String),
    /// 多个匹配，只列出不填入
    Multiple(Vec<String>),
}

/// 会话快照（凭证已脱敏）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalSnapshot {
    pub state: SessionState,
    pub session: Option<SessionSummary>,
    pub credentials: Option<RedactedCredentials>,
    pub history_len: usize,
    pub cursor_position: usize,
    pub quick_commands: Vec<String>,
}

struct SessionInner {
    state: SessionState,
    session: Option<Session>,
    history: HistoryIndex,
    cursor: HistoryCursor,
    quick_commands: Vec<String>,
}

/// 远程命令执行期间的状态守卫
///
/// 正常路径下调度器在发出终态事件前调用 `settle` 回到 `Ready`；
/// future 被丢弃时由 Drop 还原。只还原一次，之后新提交的命令不受影响。
struct ExecutingGuard<'a> {
    inner: &'a Mutex<SessionInner>,
    armed: AtomicBool,
}

impl<'a> ExecutingGuard<'a> {
    fn new(inner: &'a Mutex<SessionInner>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(true),
        }
    }

    fn settle(&self) {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Executing {
            inner.state = SessionState::Ready;
        }
    }
}

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        self.settle();
    }
}

/// 终端会话
pub struct TerminalSession {
    dispatcher: CommandDispatcher,
    persistence: Arc<dyn SessionPersistence>,
    bus: EventBus,
    settings: TerminalSettings,
    inner: Mutex<SessionInner>,
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TerminalSession {
    pub fn new(
        dispatcher: CommandDispatcher,
        persistence: Arc<dyn SessionPersistence>,
        settings: TerminalSettings,
    ) -> Self {
        let bus = dispatcher.bus().clone();
        let history = HistoryIndex::new(settings.history_capacity);
        Self {
            dispatcher,
            persistence,
            bus,
            inner: Mutex::new(SessionInner {
                state: SessionState::Uninitialized,
                session: None,
                cursor: HistoryCursor::at_end(&history),
                history,
                quick_commands: Vec::new(),
            }),
            settings,
        }
    }

    fn publish<T: Serialize>(&self, event_name: &str, payload: &T) {
        self.bus
            .publish_with(event_name, payload, EmitOptions::source(TERMINAL_SOURCE));
    }

    // ------------------------------------------------------------------------
    // 生命周期
    // ------------------------------------------------------------------------

    /// 从持久化层加载会话并进入 `Ready`
    ///
    /// 没有可用会话记录（不存在、已过期、凭证无效或读取失败）时进入 `Closed`，
    /// 发出 `sessionMissing` 并返回 `SessionInvalid`。
    pub async fn initialize(&self) -> Result<SessionSummary, TerminalError> {
        {
            let inner = self.inner.lock();
            match inner.state {
                SessionState::Uninitialized => {}
                SessionState::Closed => return Err(TerminalError::SessionClosed),
                SessionState::Ready | SessionState::Executing => {
                    return inner
                        .session
                        .as_ref()
                        .map(Session::summary)
                        .ok_or(TerminalError::NotReady);
                }
            }
        }

        let session = match self.persistence.load_session() {
            Ok(Some(session)) => match session.credentials.validate() {
                Ok(()) => session,
                Err(reason) => return Err(self.invalidate(format!("会话凭证无效: {}", reason))),
            },
            Ok(None) => return Err(self.invalidate("没有可用的会话记录".to_string())),
            Err(e) => {
                tracing::error!("[Terminal] 读取会话失败: {}", e);
                return Err(self.invalidate(format!("读取会话失败: {}", e)));
            }
        };

        let history = match self.persistence.load_history(session.device_id()) {
            Ok(entries) => HistoryIndex::with_entries(self.settings.history_capacity, entries),
            Err(e) => {
                tracing::warn!("[Terminal] 读取历史失败，使用空历史: {}", e);
                HistoryIndex::new(self.settings.history_capacity)
            }
        };

        let quick_commands = match self.dispatcher.available_commands(&session.device).await {
            Ok(commands) if !commands.is_empty() => commands,
            Ok(_) => self.settings.default_commands_for(&session.device.device_type),
            Err(e) => {
                tracing::warn!(
                    "[Terminal] 获取可用命令失败，使用默认命令: device={} error={}",
                    session.device.id,
                    e
                );
                self.settings.default_commands_for(&session.device.device_type)
            }
        };

        let summary = session.summary();
        let welcome = welcome_banner(&session);
        {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Uninitialized {
                return match inner.state {
                    SessionState::Closed => Err(TerminalError::SessionClosed),
                    _ => inner
                        .session
                        .as_ref()
                        .map(Session::summary)
                        .ok_or(TerminalError::NotReady),
                };
            }
            inner.cursor = HistoryCursor::at_end(&history);
            inner.history = history;
            inner.quick_commands = quick_commands.clone();
            inner.session = Some(session);
            inner.state = SessionState::Ready;
        }

        tracing::info!(
            "[Terminal] 会话就绪: device={} user={}",
            summary.device_id,
            summary.username
        );
        self.publish(
            event_names::SESSION_STARTED,
            &SessionStartedPayload {
                session: summary.clone(),
                welcome,
                quick_commands,
            },
        );
        Ok(summary)
    }

    fn invalidate(&self, reason: String) -> TerminalError {
        self.inner.lock().state = SessionState::Closed;
        tracing::warn!("[Terminal] 会话不可用: {}", reason);
        self.publish(
            event_names::SESSION_MISSING,
            &SessionMissingPayload {
                reason: reason.clone(),
            },
        );
        TerminalError::SessionInvalid(reason)
    }

    /// 断开会话并清除持久化的会话记录
    ///
    /// # 返回
    /// 本次调用是否真正关闭了会话；重复调用返回 `false`
    pub fn disconnect(&self, reason: &str) -> bool {
        let session = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Closed {
                return false;
            }
            inner.state = SessionState::Closed;
            inner.session.take()
        };

        if let Err(e) = self.persistence.clear_session() {
            tracing::warn!("[Terminal] 清除会话记录失败: {}", e);
        }

        let device_id = session.as_ref().map(|s| s.device_id().to_string());
        tracing::info!(
            "[Terminal] 会话已断开: device={} reason={}",
            device_id.as_deref().unwrap_or("-"),
            reason
        );
        self.publish(
            event_names::SESSION_CLOSED,
            &SessionClosedPayload {
                device_id,
                reason: reason.to_string(),
            },
        );
        true
    }

    // ------------------------------------------------------------------------
    // 命令提交
    // ------------------------------------------------------------------------

    /// 提交一行输入
    ///
    /// # 返回
    /// - `Ok(SubmitOutcome)`: 空输入、内置命令或远程命令的结果（远程失败也是 `Ok`）
    /// - `Err(SessionBusy)`: 已有命令在执行，同时发出 `commandRejected`
    /// - `Err(NotReady)` / `Err(SessionClosed)`: 会话不可用
    pub async fn submit(&self, input: &str) -> Result<SubmitOutcome, TerminalError> {
        let command = input.trim();

        let session = {
            let mut inner = self.inner.lock();
            let state = inner.state;
            match state {
                SessionState::Uninitialized => return Err(TerminalError::NotReady),
                SessionState::Closed => return Err(TerminalError::SessionClosed),
                SessionState::Ready | SessionState::Executing => {}
            }

            if command.is_empty() {
                return Ok(SubmitOutcome::Ignored);
            }

            match state {
                SessionState::Executing => {
                    let device_id = inner.session.as_ref().map(|s| s.device_id().to_string());
                    drop(inner);
                    tracing::debug!("[Terminal] 拒绝提交，已有命令在执行: {}", command);
                    self.publish(
                        event_names::COMMAND_REJECTED,
                        &CommandRejectedPayload {
                            device_id,
                            command: command.to_string(),
                            state: SessionState::Executing,
                        },
                    );
                    return Err(TerminalError::SessionBusy);
                }
                _ => {}
            }

            let session = inner.session.clone().ok_or(TerminalError::NotReady)?;
            let SessionInner {
                history, cursor, ..
            } = &mut *inner;
            history.append(command, session.device_id());
            cursor.reset(history);

            if let Some(builtin) = BuiltinCommand::parse(command) {
                let outcome = builtin.run(&session, history);
                drop(inner);
                return Ok(self.finish_builtin(&session, outcome));
            }

            inner.state = SessionState::Executing;
            session
        };

        let guard = ExecutingGuard::new(&self.inner);
        let outcome = match self
            .dispatcher
            .execute_one_then(&session.device, &session.credentials, command, || {
                guard.settle()
            })
            .await
        {
            Ok(execution) => SubmitOutcome::Completed(execution),
            Err(e) => SubmitOutcome::Failed(e),
        };
        Ok(outcome)
    }

    fn finish_builtin(&self, session: &Session, outcome: BuiltinOutcome) -> SubmitOutcome {
        tracing::debug!("[Terminal] 内置命令: {:?}", outcome.builtin);
        self.publish(
            event_names::BUILTIN_EXECUTED,
            &BuiltinExecutedPayload {
                device_id: session.device_id().to_string(),
                outcome: outcome.clone(),
            },
        );
        if outcome.disconnect {
            self.disconnect(REASON_USER_EXIT);
        }
        SubmitOutcome::Builtin(outcome)
    }

    // ------------------------------------------------------------------------
    // 历史与补全
    // ------------------------------------------------------------------------

    /// 上键：取上一条历史
    pub fn recall_previous(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        let SessionInner {
            history, cursor, ..
        } = &mut *inner;
        cursor.previous(history)
    }

    /// 下键：取下一条历史；越过最新一条后返回空输入
    pub fn recall_next(&self) -> String {
        let mut inner = self.inner.lock();
        let SessionInner {
            history, cursor, ..
        } = &mut *inner;
        cursor.next(history)
    }

    /// Tab 补全
    ///
    /// 候选只来自快捷命令（按已知顺序），历史不参与；前缀区分大小写。
    pub fn complete(&self, partial: &str) -> Completion {
        if partial.trim().is_empty() {
            return Completion::None;
        }

        let mut matches: Vec<String> = self
            .inner
            .lock()
            .quick_commands
            .iter()
            .filter(|c| c.starts_with(partial))
            .cloned()
            .collect();

        match matches.len() {
            0 => Completion::None,
            1 => Completion::Single(matches.remove(0)),
            _ => Completion::Multiple(matches),
        }
    }

    // ------------------------------------------------------------------------
    // 查询
    // ------------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        self.inner.lock().session.as_ref().map(Session::summary)
    }

    /// 提示符；会话不可用时为 `None`
    pub fn prompt(&self) -> Option<String> {
        self.inner.lock().session.as_ref().map(Session::prompt)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().history.all()
    }

    pub fn recent_history(&self, n: usize) -> Vec<HistoryEntry> {
        self.inner.lock().history.most_recent(n)
    }

    pub fn quick_commands(&self) -> Vec<String> {
        self.inner.lock().quick_commands.clone()
    }

    pub fn state_snapshot(&self) -> TerminalSnapshot {
        let inner = self.inner.lock();
        TerminalSnapshot {
            state: inner.state,
            session: inner.session.as_ref().map(Session::summary),
            credentials: inner.session.as_ref().map(|s| s.credentials.redacted()),
            history_len: inner.history.len(),
            cursor_position: inner.cursor.position(),
            quick_commands: inner.quick_commands.clone(),
        }
    }
}
