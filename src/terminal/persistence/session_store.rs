//! 会话存储（SQLite）
//!
//! ## 功能
//! - 单条活动会话记录（`ssh_session`，固定主键）
//! - 按设备分组的命令历史（`command_history`）
//! - 过期会话与旧历史清理

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use netterm_core::models::{Credentials, DeviceTarget, HistoryEntry, Session};
use rusqlite::{params, Connection, OptionalExtension};

use super::{MaintenanceReport, SessionPersistence, StoreLimits};
use crate::database::DbConnection;
use crate::terminal::error::TerminalError;

const ACTIVE_SESSION_KEY: i64 = 1;

/// SQLite 会话存储
pub struct SqliteSessionStore {
    db: DbConnection,
    limits: StoreLimits,
}

impl SqliteSessionStore {
    pub fn new(db: DbConnection, limits: StoreLimits) -> Self {
        Self { db, limits }
    }

    /// 创建存储并初始化表
    pub fn open(db: DbConnection, limits: StoreLimits) -> Result<Self, TerminalError> {
        let store = Self::new(db, limits);
        store.init_tables()?;
        Ok(store)
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, TerminalError> {
        self.db
            .lock()
            .map_err(|e| TerminalError::DatabaseError(format!("无法获取数据库锁: {}", e)))
    }

    /// 初始化数据库表
    pub fn init_tables(&self) -> Result<(), TerminalError> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ssh_session (
                id INTEGER PRIMARY KEY,
                device_id TEXT NOT NULL,
                device_name TEXT NOT NULL,
                device_ip TEXT NOT NULL,
                device_type TEXT NOT NULL,
                username TEXT NOT NULL,
                password TEXT NOT NULL,
                port INTEGER NOT NULL,
                started_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| TerminalError::DatabaseError(format!("创建表失败: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS command_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                command TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| TerminalError::DatabaseError(format!("创建表失败: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_command_history_device_id ON command_history(device_id)",
            [],
        )
        .map_err(|e| TerminalError::DatabaseError(format!("创建索引失败: {}", e)))?;

        tracing::debug!("[SessionStore] 数据库表初始化完成");
        Ok(())
    }

    /// 历史总条数（所有设备）
    pub fn history_count(&self) -> Result<usize, TerminalError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM command_history", [], |row| row.get(0))
            .map_err(|e| TerminalError::DatabaseError(format!("查询历史数量失败: {}", e)))?;
        Ok(count as usize)
    }
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, TerminalError> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| TerminalError::DatabaseError(format!("无效的时间戳: {}", millis)))
}

fn decode_password(encoded: &str) -> Result<String, TerminalError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| TerminalError::DatabaseError(format!("Base64 解码失败: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| TerminalError::DatabaseError(format!("密码编码无效: {}", e)))
}

struct SessionRow {
    device_id: String,
    device_name: String,
    device_ip: String,
    device_type: String,
    username: String,
    password: String,
    port: i64,
    started_at: i64,
}

impl SessionRow {
    fn into_session(self) -> Result<Session, TerminalError> {
        let port = u16::try_from(self.port)
            .map_err(|_| TerminalError::DatabaseError(format!("无效的端口: {}", self.port)))?;
        Ok(Session {
            device: DeviceTarget::new(
                self.device_id,
                self.device_name,
                self.device_ip,
                self.device_type,
            ),
            credentials: Credentials::new(self.username, decode_password(&self.password)?, port),
            started_at: millis_to_datetime(self.started_at)?,
        })
    }
}

impl SessionPersistence for SqliteSessionStore {
    fn load_session(&self) -> Result<Option<Session>, TerminalError> {
        let row = {
            let conn = self.conn()?;
            conn.query_row(
                "SELECT device_id, device_name, device_ip, device_type, username, password, port, started_at
                 FROM ssh_session WHERE id = ?1",
                params![ACTIVE_SESSION_KEY],
                |row| {
                    Ok(SessionRow {
                        device_id: row.get(0)?,
                        device_name: row.get(1)?,
                        device_ip: row.get(2)?,
                        device_type: row.get(3)?,
                        username: row.get(4)?,
                        password: row.get(5)?,
                        port: row.get(6)?,
                        started_at: row.get(7)?,
                    })
                },
            )
            .optional()
            .map_err(|e| TerminalError::DatabaseError(format!("查询会话失败: {}", e)))?
        };

        let Some(row) = row else {
            return Ok(None);
        };

        let session = row.into_session()?;
        if session.is_expired(self.limits.session_ttl(), Utc::now()) {
            tracing::info!("[SessionStore] 会话已过期，删除: {}", session.device_id());
            self.clear_session()?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    fn save_session(&self, session: &Session) -> Result<(), TerminalError> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT OR REPLACE INTO ssh_session
             (id, device_id, device_name, device_ip, device_type, username, password, port, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                ACTIVE_SESSION_KEY,
                session.device.id,
                session.device.name,
                session.device.ip,
                session.device.device_type,
                session.credentials.username,
                BASE64.encode(session.credentials.password.as_bytes()),
                session.credentials.port as i64,
                session.started_at.timestamp_millis(),
            ],
        )
        .map_err(|e| TerminalError::DatabaseError(format!("保存会话失败: {}", e)))?;

        tracing::debug!("[SessionStore] 保存会话: {}", session.device_id());
        Ok(())
    }

    fn clear_session(&self) -> Result<(), TerminalError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM ssh_session WHERE id = ?1",
            params![ACTIVE_SESSION_KEY],
        )
        .map_err(|e| TerminalError::DatabaseError(format!("删除会话失败: {}", e)))?;

        tracing::debug!("[SessionStore] 清除会话");
        Ok(())
    }

    fn append_history(&self, device_id: &str, command: &str) -> Result<(), TerminalError> {
        let conn = self.conn()?;

        let last: Option<String> = conn
            .query_row(
                "SELECT command FROM command_history WHERE device_id = ?1 ORDER BY id DESC LIMIT 1",
                params![device_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TerminalError::DatabaseError(format!("查询历史失败: {}", e)))?;

        if last.as_deref() == Some(command) {
            return Ok(());
        }

        conn.execute(
            "INSERT INTO command_history (device_id, command, timestamp) VALUES (?1, ?2, ?3)",
            params![device_id, command, Utc::now().timestamp_millis()],
        )
        .map_err(|e| TerminalError::DatabaseError(format!("写入历史失败: {}", e)))?;

        conn.execute(
            "DELETE FROM command_history WHERE device_id = ?1 AND id NOT IN (
                SELECT id FROM command_history WHERE device_id = ?1 ORDER BY id DESC LIMIT ?2
             )",
            params![device_id, self.limits.history_capacity as i64],
        )
        .map_err(|e| TerminalError::DatabaseError(format!("裁剪历史失败: {}", e)))?;

        Ok(())
    }

    fn load_history(&self, device_id: &str) -> Result<Vec<HistoryEntry>, TerminalError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT command, timestamp FROM command_history WHERE device_id = ?1 ORDER BY id ASC",
            )
            .map_err(|e| TerminalError::DatabaseError(format!("准备查询失败: {}", e)))?;

        let rows = stmt
            .query_map(params![device_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| TerminalError::DatabaseError(format!("查询历史失败: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TerminalError::DatabaseError(format!("读取历史失败: {}", e)))?;

        rows.into_iter()
            .map(|(command, timestamp)| {
                Ok(HistoryEntry {
                    command,
                    timestamp: millis_to_datetime(timestamp)?,
                    device_id: device_id.to_string(),
                })
            })
            .collect()
    }

    fn clear_history(&self, device_id: &str) -> Result<usize, TerminalError> {
        let conn = self.conn()?;
        let count = conn
            .execute(
                "DELETE FROM command_history WHERE device_id = ?1",
                params![device_id],
            )
            .map_err(|e| TerminalError::DatabaseError(format!("删除历史失败: {}", e)))?;

        tracing::debug!("[SessionStore] 删除设备 {} 的 {} 条历史", device_id, count);
        Ok(count)
    }

    fn run_maintenance(&self, now: DateTime<Utc>) -> Result<MaintenanceReport, TerminalError> {
        let conn = self.conn()?;

        let session_cutoff = (now - self.limits.session_ttl()).timestamp_millis();
        let expired_sessions = conn
            .execute(
                "DELETE FROM ssh_session WHERE started_at <= ?1",
                params![session_cutoff],
            )
            .map_err(|e| TerminalError::DatabaseError(format!("清理会话失败: {}", e)))?;

        let history_cutoff = (now - self.limits.history_retention()).timestamp_millis();
        let purged_history = conn
            .execute(
                "DELETE FROM command_history WHERE timestamp < ?1",
                params![history_cutoff],
            )
            .map_err(|e| TerminalError::DatabaseError(format!("清理历史失败: {}", e)))?;

        if expired_sessions > 0 || purged_history > 0 {
            tracing::info!(
                "[SessionStore] 清理了 {} 个过期会话, {} 条旧历史",
                expired_sessions,
                purged_history
            );
        }

        Ok(MaintenanceReport {
            expired_sessions,
            purged_history,
            ran_at: now,
        })
    }
}
