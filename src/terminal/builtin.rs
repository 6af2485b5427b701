//! 内置命令
//!
//! 只读写本地会话状态，不经过调度器。匹配不区分大小写。

use netterm_core::models::Session;
use serde::Serialize;

use super::history::HistoryIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinCommand {
    Clear,
    Help,
    History,
    Exit,
    Whoami,
    Pwd,
}

impl BuiltinCommand {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "clear" | "cls" => Some(Self::Clear),
            "help" => Some(Self::Help),
            "history" => Some(Self::History),
            "exit" | "quit" => Some(Self::Exit),
            "whoami" => Some(Self::Whoami),
            "pwd" => Some(Self::Pwd),
            _ => None,
        }
    }

    /// 执行后是否断开会话
    pub fn disconnects(&self) -> bool {
        matches!(self, Self::Exit)
    }

    pub fn run(&self, session: &Session, history: &HistoryIndex) -> BuiltinOutcome {
        let output = match self {
            Self::Clear => welcome_banner(session),
            Self::Help => HELP_TEXT.to_string(),
            Self::History => render_history(history),
            Self::Exit => format!("Disconnected from {}", session.device.name),
            Self::Whoami => session.credentials.username.clone(),
            Self::Pwd => "~".to_string(),
        };

        BuiltinOutcome {
            builtin: *self,
            output,
            clear_screen: matches!(self, Self::Clear),
            disconnect: self.disconnects(),
        }
    }
}

/// 内置命令的执行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltinOutcome {
    pub builtin: BuiltinCommand,
    pub output: String,
    pub clear_screen: bool,
    pub disconnect: bool,
}

const HELP_TEXT: &str = "SSH Terminal Help
==================

Built-in Commands:
  help      - Show this help message
  clear     - Clear the terminal screen
  history   - Show command history
  exit      - Disconnect and close terminal
  whoami    - Show current username
  pwd       - Show current directory

Keys:
  Up/Down   - Navigate command history
  Tab       - Command completion

All other commands are executed on the remote device.";

/// 会话欢迎信息
pub fn welcome_banner(session: &Session) -> String {
    format!(
        "Connected to: {}\nUser: {}\nHost: {}:{}\nType: {}\nSession started: {}\n\nType 'help' for available commands.",
        session.device.name,
        session.credentials.username,
        session.device.ip,
        session.credentials.port,
        session.device.device_type,
        session.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

fn render_history(history: &HistoryIndex) -> String {
    if history.is_empty() {
        return "No commands in history yet.".to_string();
    }

    let lines: Vec<String> = history
        .commands()
        .iter()
        .enumerate()
        .map(|(i, command)| format!("{:>3}: {}", i + 1, command))
        .collect();
    format!(
        "Command History ({} commands):\n{}",
        history.len(),
        lines.join("\n")
    )
}
