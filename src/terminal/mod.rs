//! 终端核心模块
//!
//! 一次交互式远程命令会话：输入解析、内置命令、远程调度、历史导航与补全。
//! 所有结果都通过事件总线发出，界面只订阅事件，不直接修改会话状态。
//!
//! ## 模块结构
//! - `error` - 错误类型定义
//! - `events` - 事件名与负载
//! - `history` - 有界历史与导航游标
//! - `builtin` - 内置命令
//! - `dispatcher` - 命令调度器
//! - `session` - 会话状态机
//! - `persistence` - 会话与历史持久化、定期清理
//!
//! ## 使用示例
//! ```ignore
//! use netterm_lib::terminal::{CommandDispatcher, TerminalSession, TerminalSettings};
//!
//! let session = TerminalSession::new(dispatcher, persistence, TerminalSettings::default());
//! session.initialize().await?;
//! session.submit("show version").await?;
//! ```

pub mod builtin;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod history;
pub mod persistence;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

// 重新导出常用类型
pub use builtin::{BuiltinCommand, BuiltinOutcome};
pub use dispatcher::{CommandDispatcher, DispatcherConfig};
pub use error::{ExecutionError, TerminalError};
pub use events::{event_names, SessionState};
pub use history::{HistoryCursor, HistoryIndex, DEFAULT_HISTORY_CAPACITY};
pub use persistence::{
    MaintenanceHandle, MaintenanceReport, MaintenanceScheduler, MemorySessionStore,
    SessionPersistence, SqliteSessionStore, StoreLimits,
};
pub use session::{Completion, SubmitOutcome, TerminalSession, TerminalSettings, TerminalSnapshot};
