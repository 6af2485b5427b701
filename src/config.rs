//! 配置
//!
//! YAML 配置文件，默认位于 `~/.netterm/config.yaml`。所有字段都有默认值，
//! 文件不存在时使用默认配置。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use netterm_core::LogStoreConfig;
use netterm_infra::{HttpTransportConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event_bus::EventBusConfig;
use crate::terminal::dispatcher::DispatcherConfig;
use crate::terminal::persistence::maintenance::MaintenanceConfig;
use crate::terminal::persistence::StoreLimits;
use crate::terminal::session::{default_device_commands, TerminalSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("解析配置文件失败: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// 默认配置路径: ~/.netterm/config.yaml
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".netterm").join("config.yaml"))
}

/// 读取配置；文件不存在时返回默认配置
pub fn load_config(path: &Path) -> Result<NettermConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("[Config] 配置文件不存在，使用默认配置: {}", path.display());
        return Ok(NettermConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(NettermConfig::default());
    }
    let config: NettermConfig = serde_yaml::from_str(&content)?;
    tracing::info!("[Config] 已加载配置: {}", path.display());
    Ok(config)
}

/// 写入配置，必要时创建目录
pub fn save_config(path: &Path, config: &NettermConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_yaml::to_string(config)?)?;
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NettermConfig {
    pub terminal: TerminalSection,
    pub event_bus: EventBusSection,
    pub transport: TransportSection,
    pub dispatcher: DispatcherSection,
    pub persistence: PersistenceSection,
    pub maintenance: MaintenanceSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSection {
    pub history_capacity: usize,
    /// 按设备类型的默认快捷命令
    pub default_commands: HashMap<String, Vec<String>>,
    pub fallback_commands: Vec<String>,
}

impl Default for TerminalSection {
    fn default() -> Self {
        let settings = TerminalSettings::default();
        Self {
            history_capacity: settings.history_capacity,
            default_commands: default_device_commands(),
            fallback_commands: settings.fallback_commands,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusSection {
    pub history_size: usize,
    pub max_emit_depth: usize,
}

impl Default for EventBusSection {
    fn default() -> Self {
        let config = EventBusConfig::default();
        Self {
            history_size: config.history_size,
            max_emit_depth: config.max_emit_depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSection {
    pub target_timeout_secs: u64,
    pub inter_command_delay_ms: u64,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            target_timeout_secs: 60,
            inter_command_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSection {
    /// 为空时使用 `~/.netterm/netterm.db`
    pub database_path: Option<PathBuf>,
    pub session_ttl_hours: i64,
    pub history_retention_days: i64,
}

impl Default for PersistenceSection {
    fn default() -> Self {
        let limits = StoreLimits::default();
        Self {
            database_path: None,
            session_ttl_hours: limits.session_ttl_hours,
            history_retention_days: limits.history_retention_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSection {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for MaintenanceSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 默认过滤级别，`RUST_LOG` 优先
    pub level: String,
    pub json: bool,
    pub max_logs: usize,
    pub file_logging: bool,
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let store = LogStoreConfig::default();
        Self {
            level: "info".to_string(),
            json: false,
            max_logs: store.max_logs,
            file_logging: store.enable_file_logging,
            retention_days: store.retention_days,
        }
    }
}

impl NettermConfig {
    pub fn terminal_settings(&self) -> TerminalSettings {
        TerminalSettings {
            history_capacity: self.terminal.history_capacity,
            default_commands: self.terminal.default_commands.clone(),
            fallback_commands: self.terminal.fallback_commands.clone(),
        }
    }

    pub fn event_bus_config(&self) -> EventBusConfig {
        EventBusConfig {
            history_size: self.event_bus.history_size,
            max_emit_depth: self.event_bus.max_emit_depth,
        }
    }

    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            base_url: self.transport.base_url.clone(),
            timeout: Duration::from_secs(self.transport.timeout_secs),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            target_timeout: Duration::from_secs(self.dispatcher.target_timeout_secs),
            inter_command_delay: Duration::from_millis(self.dispatcher.inter_command_delay_ms),
        }
    }

    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            history_capacity: self.terminal.history_capacity,
            session_ttl_hours: self.persistence.session_ttl_hours,
            history_retention_days: self.persistence.history_retention_days,
        }
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.persistence
            .database_path
            .clone()
            .or_else(crate::database::default_database_path)
    }

    pub fn maintenance_config(&self) -> MaintenanceConfig {
        MaintenanceConfig {
            interval: Duration::from_secs(self.maintenance.interval_secs),
        }
    }

    pub fn log_store_config(&self) -> LogStoreConfig {
        LogStoreConfig {
            max_logs: self.logging.max_logs,
            retention_days: self.logging.retention_days,
            enable_file_logging: self.logging.file_logging,
            ..LogStoreConfig::default()
        }
    }
}
