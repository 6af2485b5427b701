//! 事件、监听器与订阅记录

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// 未指定来源时使用的 source
pub const UNKNOWN_SOURCE: &str = "unknown";

/// 事件总线错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventBusError {
    /// 事件名为空
    #[error("无效的事件名: {0:?}")]
    InvalidEventName(String),
}

/// 一次发出的事件，发出后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl Event {
    pub(crate) fn new(name: &str, payload: Value, source: Option<&str>) -> Self {
        Self {
            id: format!("evt_{}", uuid::Uuid::new_v4().simple()),
            name: name.to_string(),
            payload,
            timestamp: Utc::now(),
            source: source.unwrap_or(UNKNOWN_SOURCE).to_string(),
        }
    }
}

pub type SyncCallback = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;
pub type AsyncCallback = Arc<dyn Fn(Event) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// 监听器
///
/// 克隆共享同一个回调，可用克隆值按引用取消订阅。
#[derive(Clone)]
pub enum Listener {
    Sync(SyncCallback),
    Async(AsyncCallback),
}

impl Listener {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Async(Arc::new(move |event| Box::pin(f(event))))
    }

    fn data_ptr(&self) -> *const () {
        match self {
            Self::Sync(cb) => Arc::as_ptr(cb) as *const (),
            Self::Async(cb) => Arc::as_ptr(cb) as *const (),
        }
    }

    /// 是否为同一个回调
    pub fn same_as(&self, other: &Listener) -> bool {
        self.data_ptr() == other.data_ptr()
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => write!(f, "Listener::Sync({:p})", self.data_ptr()),
            Self::Async(_) => write!(f, "Listener::Async({:p})", self.data_ptr()),
        }
    }
}

/// 订阅 ID，单调递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub once: bool,
    pub priority: i32,
}

impl SubscribeOptions {
    pub fn once() -> Self {
        Self {
            once: true,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// 取消订阅的目标：按 ID 或按回调
#[derive(Debug, Clone, Copy)]
pub enum ListenerTarget<'a> {
    Id(SubscriptionId),
    Listener(&'a Listener),
}

impl From<SubscriptionId> for ListenerTarget<'_> {
    fn from(id: SubscriptionId) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a Listener> for ListenerTarget<'a> {
    fn from(listener: &'a Listener) -> Self {
        Self::Listener(listener)
    }
}

/// 订阅的只读视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub event: String,
    pub once: bool,
    pub priority: i32,
    pub added_at: DateTime<Utc>,
}

pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) listener: Listener,
    pub(crate) once: bool,
    pub(crate) priority: i32,
    pub(crate) added_at: DateTime<Utc>,
    fired: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, listener: Listener, options: SubscribeOptions) -> Self {
        Self {
            id,
            listener,
            once: options.once,
            priority: options.priority,
            added_at: Utc::now(),
            fired: AtomicBool::new(false),
        }
    }

    /// 取得本次调用权；一次性订阅只有第一个调用方能拿到
    pub(crate) fn claim(&self) -> bool {
        !self.once || !self.fired.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn info(&self, event: &str) -> SubscriptionInfo {
        SubscriptionInfo {
            id: self.id,
            event: event.to_string(),
            once: self.once,
            priority: self.priority,
            added_at: self.added_at,
        }
    }

    pub(crate) fn matches(&self, target: ListenerTarget<'_>) -> bool {
        match target {
            ListenerTarget::Id(id) => self.id == id,
            ListenerTarget::Listener(listener) => self.listener.same_as(listener),
        }
    }
}
