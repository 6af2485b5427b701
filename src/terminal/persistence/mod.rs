//! 终端持久化模块
//!
//! 保存当前 SSH 会话和每台设备的命令历史。
//!
//! ## 模块结构
//! - `session_store` - SQLite 实现
//! - `memory_store` - 内存实现（测试和无盘场景）
//! - `maintenance` - 定期清理过期数据的后台任务
//!
//! ## 约定
//! - 同一时刻只有一条活动会话记录
//! - 密码以 base64 混淆存储，不落明文
//! - 历史按设备分组，相邻重复不追加，超出容量时淘汰最旧记录

pub mod maintenance;
pub mod memory_store;
pub mod session_store;

pub use maintenance::{MaintenanceConfig, MaintenanceHandle, MaintenanceScheduler};
pub use memory_store::MemorySessionStore;
pub use session_store::SqliteSessionStore;

use chrono::{DateTime, Utc};
use netterm_core::models::{HistoryEntry, Session};
use serde::{Deserialize, Serialize};

use crate::terminal::error::TerminalError;

/// 持久化限额
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    /// 每台设备保留的历史条数
    pub history_capacity: usize,
    /// 会话有效期（小时）
    pub session_ttl_hours: i64,
    /// 历史保留天数
    pub history_retention_days: i64,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            session_ttl_hours: 24,
            history_retention_days: 30,
        }
    }
}

impl StoreLimits {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn history_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.history_retention_days)
    }
}

/// 一次清理的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub expired_sessions: usize,
    pub purged_history: usize,
    pub ran_at: DateTime<Utc>,
}

/// 会话与历史的持久化接口
pub trait SessionPersistence: Send + Sync {
    /// 读取当前会话；过期记录会被删除并返回 `None`
    fn load_session(&self) -> Result<Option<Session>, TerminalError>;

    fn save_session(&self, session: &Session) -> Result<(), TerminalError>;

    fn clear_session(&self) -> Result<(), TerminalError>;

    /// 追加一条历史；与该设备最近一条相同时跳过
    fn append_history(&self, device_id: &str, command: &str) -> Result<(), TerminalError>;

    /// 按时间正序返回设备历史
    fn load_history(&self, device_id: &str) -> Result<Vec<HistoryEntry>, TerminalError>;

    fn clear_history(&self, device_id: &str) -> Result<usize, TerminalError>;

    /// 删除过期会话和超出保留期的历史
    fn run_maintenance(&self, now: DateTime<Utc>) -> Result<MaintenanceReport, TerminalError>;
}
