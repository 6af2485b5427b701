//! netterm 核心库
//!
//! 事件驱动的远程命令终端：事件总线、终端会话状态机、命令调度器，
//! 以及配置、日志、持久化等周边设施。
//!
//! ## 模块结构
//! - `event_bus` - 进程内发布/订阅
//! - `terminal` - 会话状态机、命令调度、历史与补全、持久化
//! - `config` - YAML 配置
//! - `logging` - tracing 初始化
//! - `database` - SQLite 连接
//! - `runtime` - 组件装配与后台任务生命周期

pub mod config;
pub mod database;
pub mod event_bus;
pub mod logging;
pub mod runtime;
pub mod terminal;

pub use config::{load_config, ConfigError, NettermConfig};
pub use event_bus::{Event, EventBus, EventBusConfig, Listener};
pub use runtime::{RuntimeStatus, TerminalRuntime};
pub use terminal::{
    CommandDispatcher, Completion, ExecutionError, SessionState, SubmitOutcome, TerminalError,
    TerminalSession,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
