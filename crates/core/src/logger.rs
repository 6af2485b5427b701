//! 日志管理模块
//!
//! 内存中的有界日志环，可选写入滚动日志文件。写入前统一脱敏，
//! 保证密码和令牌不会以明文进入任何跨会话日志。
use chrono::{Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LogStoreConfig {
    pub max_logs: usize,
    pub retention_days: u32,
    pub max_file_size: u64,
    pub enable_file_logging: bool,
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            max_logs: 1000,
            retention_days: 7,
            max_file_size: 10 * 1024 * 1024,
            enable_file_logging: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

pub struct LogStore {
    logs: VecDeque<LogEntry>,
    config: LogStoreConfig,
    log_file_path: Option<PathBuf>,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::with_config(LogStoreConfig::default(), Self::default_log_path())
    }
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 默认日志文件路径: ~/.netterm/logs/netterm.log
    pub fn default_log_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".netterm").join("logs").join("netterm.log"))
    }

    pub fn with_config(config: LogStoreConfig, log_file_path: Option<PathBuf>) -> Self {
        if config.enable_file_logging {
            if let Some(dir) = log_file_path.as_deref().and_then(Path::parent) {
                let _ = fs::create_dir_all(dir);
            }
        }

        Self {
            logs: VecDeque::with_capacity(config.max_logs.min(1024)),
            config,
            log_file_path,
        }
    }

    pub fn add(&mut self, level: &str, target: &str, message: &str) {
        let sanitized = sanitize_log_message(message);
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            target: target.to_string(),
            message: sanitized.clone(),
        };

        self.logs.push_back(entry);

        if self.config.enable_file_logging {
            if let Some(path) = self.log_file_path.clone() {
                self.rotate_log_file_if_needed(&path);
                let local_time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                let log_line = format!(
                    "{} [{}] {}: {}\n",
                    local_time,
                    level.to_uppercase(),
                    target,
                    sanitized
                );

                if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
                    let _ = file.write_all(log_line.as_bytes());
                }
            }
        }

        while self.logs.len() > self.config.max_logs {
            self.logs.pop_front();
        }
    }

    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.logs.iter().cloned().collect()
    }

    /// 最近 n 条，按时间正序
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        let skip = self.logs.len().saturating_sub(n);
        self.logs.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn clear(&mut self) {
        self.logs.clear();
    }

    pub fn get_log_file_path(&self) -> Option<String> {
        self.log_file_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    fn rotate_log_file_if_needed(&self, path: &Path) {
        let Ok(metadata) = fs::metadata(path) else {
            return;
        };

        if metadata.len() <= self.config.max_file_size {
            return;
        }

        let suffix = Local::now().format("%Y%m%d-%H%M%S");
        let rotated = path.with_file_name(format!(
            "{}.{}",
            path.file_name().unwrap_or_default().to_string_lossy(),
            suffix
        ));

        let _ = fs::rename(path, &rotated);
        self.prune_old_logs(path);
    }

    fn prune_old_logs(&self, path: &Path) {
        let Some(dir) = path.parent() else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let cutoff = Utc::now() - Duration::days(self.config.retention_days as i64);
        let prefix = format!(
            "{}.",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if !file_name.starts_with(&prefix) {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if chrono::DateTime::<Utc>::from(modified) < cutoff {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

/// 共享日志存储类型（使用 parking_lot）
pub type SharedLogStore = Arc<parking_lot::RwLock<LogStore>>;

/// 需要脱敏的字段前缀
const SECRET_MARKERS: &[&str] = &[
    "Bearer ",
    "password=",
    "\"password\":\"",
    "\"password\": \"",
    "password: ",
];

/// 日志脱敏：掩盖 Bearer token 和各种形式的 password 字段
pub fn sanitize_log_message(message: &str) -> String {
    // 简化版本：使用字符串查找而不是正则表达式
    let mut sanitized = message.to_string();
    for marker in SECRET_MARKERS {
        mask_after(&mut sanitized, marker);
    }
    sanitized
}

fn mask_after(message: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(pos) = message[search_from..].find(marker) {
        let start = search_from + pos + marker.len();
        let end = message[start..]
            .find(|c: char| {
                c.is_whitespace() || matches!(c, '"' | '\'' | '&' | ',' | '}' | ';')
            })
            .map(|offset| start + offset)
            .unwrap_or(message.len());

        if end > start && &message[start..end] != "***" {
            message.replace_range(start..end, "***");
        }
        search_from = start + 3.min(message.len() - start);
    }
}
