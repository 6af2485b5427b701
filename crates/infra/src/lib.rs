//! 基础设施模块
//!
//! 包含独立的基础设施组件，不依赖会话业务逻辑：
//! - transport: 远程命令后端的传输抽象与 HTTP 实现

pub mod transport;

// 重新导出常用类型
pub use transport::{
    HttpTransport, HttpTransportConfig, Transport, TransportError, TransportResult,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
