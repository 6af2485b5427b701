//! 数据库连接
//!
//! 整个进程共享一个 SQLite 连接，由 `Mutex` 串行化访问。

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::terminal::error::TerminalError;

/// 共享数据库连接
pub type DbConnection = Arc<Mutex<Connection>>;

/// 默认数据库路径: ~/.netterm/netterm.db
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|home| home.join(".netterm").join("netterm.db"))
}

/// 打开（必要时创建）数据库文件
pub fn open(path: &Path) -> Result<DbConnection, TerminalError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| TerminalError::DatabaseError(format!("创建数据库目录失败: {}", e)))?;
    }

    let conn = Connection::open(path)
        .map_err(|e| TerminalError::DatabaseError(format!("打开数据库失败: {}", e)))?;

    tracing::info!("[Database] 已打开数据库: {}", path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

/// 内存数据库，用于测试
pub fn open_in_memory() -> Result<DbConnection, TerminalError> {
    let conn = Connection::open_in_memory()
        .map_err(|e| TerminalError::DatabaseError(format!("打开内存数据库失败: {}", e)))?;
    Ok(Arc::new(Mutex::new(conn)))
}
