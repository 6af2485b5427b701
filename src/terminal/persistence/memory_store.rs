//! 内存会话存储
//!
//! 与 SQLite 实现语义一致，进程退出后数据丢失。

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use netterm_core::models::{HistoryEntry, Session};
use parking_lot::Mutex;

use super::{MaintenanceReport, SessionPersistence, StoreLimits};
use crate::terminal::error::TerminalError;

#[derive(Default)]
struct MemoryState {
    session: Option<Session>,
    history: HashMap<String, VecDeque<HistoryEntry>>,
}

pub struct MemorySessionStore {
    state: Mutex<MemoryState>,
    limits: StoreLimits,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

impl MemorySessionStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            limits,
        }
    }

    /// 以已有会话创建
    pub fn with_session(session: Session, limits: StoreLimits) -> Self {
        let store = Self::new(limits);
        store.state.lock().session = Some(session);
        store
    }
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> Result<Option<Session>, TerminalError> {
        let mut state = self.state.lock();
        let expired = state
            .session
            .as_ref()
            .is_some_and(|s| s.is_expired(self.limits.session_ttl(), Utc::now()));
        if expired {
            tracing::info!("[SessionStore] 内存会话已过期，删除");
            state.session = None;
        }
        Ok(state.session.clone())
    }

    fn save_session(&self, session: &Session) -> Result<(), TerminalError> {
        self.state.lock().session = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> Result<(), TerminalError> {
        self.state.lock().session = None;
        Ok(())
    }

    fn append_history(&self, device_id: &str, command: &str) -> Result<(), TerminalError> {
        let mut state = self.state.lock();
        let entries = state.history.entry(device_id.to_string()).or_default();

        if entries.back().is_some_and(|e| e.command == command) {
            return Ok(());
        }

        entries.push_back(HistoryEntry::new(command, device_id));
        while entries.len() > self.limits.history_capacity {
            entries.pop_front();
        }
        Ok(())
    }

    fn load_history(&self, device_id: &str) -> Result<Vec<HistoryEntry>, TerminalError> {
        Ok(self
            .state
            .lock()
            .history
            .get(device_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn clear_history(&self, device_id: &str) -> Result<usize, TerminalError> {
        Ok(self
            .state
            .lock()
            .history
            .remove(device_id)
            .map(|entries| entries.len())
            .unwrap_or(0))
    }

    fn run_maintenance(&self, now: DateTime<Utc>) -> Result<MaintenanceReport, TerminalError> {
        let mut state = self.state.lock();

        let mut expired_sessions = 0;
        if state
            .session
            .as_ref()
            .is_some_and(|s| s.is_expired(self.limits.session_ttl(), now))
        {
            state.session = None;
            expired_sessions = 1;
        }

        let cutoff = now - self.limits.history_retention();
        let mut purged_history = 0;
        for entries in state.history.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.timestamp >= cutoff);
            purged_history += before - entries.len();
        }
        state.history.retain(|_, entries| !entries.is_empty());

        Ok(MaintenanceReport {
            expired_sessions,
            purged_history,
            ran_at: now,
        })
    }
}
