//! 命令历史与补全索引
//!
//! ## 功能
//! - 有界历史（超出容量淘汰最旧记录）
//! - 相邻重复不追加
//! - 最近 n 条、前缀匹配（区分大小写）
//! - 上下键导航游标

use std::collections::VecDeque;

use netterm_core::models::HistoryEntry;

/// 默认历史容量
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// 命令历史索引
#[derive(Debug, Clone)]
pub struct HistoryIndex {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryIndex {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// 以已有历史初始化，只保留最新的 `capacity` 条
    pub fn with_entries(capacity: usize, entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut index = Self::new(capacity);
        for entry in entries {
            index.push(entry);
        }
        index
    }

    /// 追加命令；与最近一条相同时返回 `false`
    pub fn append(&mut self, command: &str, device_id: &str) -> bool {
        self.push(HistoryEntry::new(command, device_id))
    }

    fn push(&mut self, entry: HistoryEntry) -> bool {
        if self
            .entries
            .back()
            .is_some_and(|last| last.command == entry.command)
        {
            return false;
        }

        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        true
    }

    pub fn all(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// 所有命令，从旧到新
    pub fn commands(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.command.clone()).collect()
    }

    /// 最近 n 条，从旧到新
    pub fn most_recent(&self, n: usize) -> Vec<HistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// 历史导航游标
///
/// 位置取值 `0..=len`，`len` 表示“最新一条之后”（空输入）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryCursor {
    position: usize,
}

impl HistoryCursor {
    /// 指向最新一条之后
    pub fn at_end(history: &HistoryIndex) -> Self {
        Self {
            position: history.len(),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn reset(&mut self, history: &HistoryIndex) {
        self.position = history.len();
    }

    /// 上一条；已在最旧一条时停留并重复该条
    pub fn previous(&mut self, history: &HistoryIndex) -> Option<String> {
        if history.is_empty() {
            self.position = 0;
            return None;
        }
        self.position = self.position.min(history.len());
        if self.position > 0 {
            self.position -= 1;
        }
        history.get(self.position).map(|e| e.command.clone())
    }

    /// 下一条；越过最新一条后返回空串并回到末尾
    pub fn next(&mut self, history: &HistoryIndex) -> String {
        let len = history.len();
        if self.position + 1 < len {
            self.position += 1;
            history
                .get(self.position)
                .map(|e| e.command.clone())
                .unwrap_or_default()
        } else {
            self.position = len;
            String::new()
        }
    }
}
