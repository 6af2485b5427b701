//! 事件总线实现

use std::any::Any;
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{json, Value};

use super::subscription::{
    Event, EventBusError, Listener, ListenerTarget, SubscribeOptions, Subscription,
    SubscriptionId, SubscriptionInfo,
};

/// 监听器失败时发出的事件名
pub const LISTENER_ERROR: &str = "listenerError";

/// 总线自身发出事件时使用的 source
pub const EVENT_BUS_SOURCE: &str = "eventBus";

thread_local! {
    static EMIT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// 同步 emit 的嵌套深度守卫
struct DepthGuard;

impl DepthGuard {
    fn enter(max_depth: usize) -> Option<Self> {
        EMIT_DEPTH.with(|depth| {
            if depth.get() >= max_depth {
                None
            } else {
                depth.set(depth.get() + 1);
                Some(DepthGuard)
            }
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        EMIT_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventBusConfig {
    /// 历史环大小
    pub history_size: usize,
    /// 同步 emit 最大嵌套深度
    pub max_emit_depth: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            history_size: 100,
            max_emit_depth: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions<'a> {
    pub source: Option<&'a str>,
}

impl<'a> EmitOptions<'a> {
    pub fn source(source: &'a str) -> Self {
        Self {
            source: Some(source),
        }
    }
}

/// 总线统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBusStats {
    pub event_names: Vec<String>,
    pub per_name_subscriber_count: BTreeMap<String, usize>,
    pub total_listeners: usize,
    pub history_size: usize,
    pub max_history_size: usize,
}

/// 负载转换函数
pub type PayloadTransform = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// 流水线中的一步
#[derive(Clone)]
pub struct PipelineStep {
    pub name: String,
    pub transform: Option<PayloadTransform>,
}

impl PipelineStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: None,
        }
    }

    pub fn with_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }
}

/// 事件组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventGroup {
    pub group_id: String,
    pub event_name: String,
    pub subscriptions: Vec<SubscriptionId>,
}

struct Inner {
    listeners: RwLock<HashMap<String, Vec<Arc<Subscription>>>>,
    history: Mutex<VecDeque<Event>>,
    next_id: AtomicU64,
    config: EventBusConfig,
}

/// 事件总线
///
/// 克隆得到的是同一条总线的句柄。同步 `emit` 在调用线程上按优先级依次调用监听器，
/// 调用期间不持有任何锁，监听器可以再次 emit 或修改订阅。
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

enum Invocation {
    Completed,
    Scheduled,
    Failed(String),
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                listeners: RwLock::new(HashMap::new()),
                history: Mutex::new(VecDeque::with_capacity(config.history_size)),
                next_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    pub fn config(&self) -> EventBusConfig {
        self.inner.config
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // ------------------------------------------------------------------------
    // 订阅管理
    // ------------------------------------------------------------------------

    /// 订阅事件
    ///
    /// # 参数
    /// - `event_name`: 事件名，不能为空
    /// - `listener`: 监听器
    /// - `options`: 一次性标记与优先级
    ///
    /// # 返回
    /// 订阅 ID；同名事件的订阅按优先级降序排列，优先级相同按订阅先后
    pub fn subscribe(
        &self,
        event_name: &str,
        listener: Listener,
        options: SubscribeOptions,
    ) -> Result<SubscriptionId, EventBusError> {
        if event_name.trim().is_empty() {
            return Err(EventBusError::InvalidEventName(event_name.to_string()));
        }

        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Arc::new(Subscription::new(id, listener, options));

        let mut listeners = self.inner.listeners.write();
        let list = listeners.entry(event_name.to_string()).or_default();
        let position = list
            .iter()
            .position(|s| s.priority < options.priority)
            .unwrap_or(list.len());
        list.insert(position, subscription);

        tracing::trace!(
            "[EventBus] 添加监听器: event={} id={} priority={} once={}",
            event_name,
            id,
            options.priority,
            options.once
        );
        Ok(id)
    }

    pub fn on(&self, event_name: &str, listener: Listener) -> Result<SubscriptionId, EventBusError> {
        self.subscribe(event_name, listener, SubscribeOptions::default())
    }

    pub fn once(
        &self,
        event_name: &str,
        listener: Listener,
    ) -> Result<SubscriptionId, EventBusError> {
        self.subscribe(event_name, listener, SubscribeOptions::once())
    }

    /// 取消订阅
    ///
    /// # 返回
    /// 移除的订阅数量；事件名下没有订阅时会删除该事件名
    pub fn unsubscribe<'a>(&self, event_name: &str, target: impl Into<ListenerTarget<'a>>) -> usize {
        let target = target.into();
        let mut listeners = self.inner.listeners.write();
        let Some(list) = listeners.get_mut(event_name) else {
            return 0;
        };

        let before = list.len();
        list.retain(|s| !s.matches(target));
        let removed = before - list.len();

        if list.is_empty() {
            listeners.remove(event_name);
        }

        if removed > 0 {
            tracing::trace!("[EventBus] 移除 {} 个监听器: event={}", removed, event_name);
        }
        removed
    }

    /// 移除某个事件（或全部事件）的所有监听器，返回移除数量
    pub fn remove_all_listeners(&self, event_name: Option<&str>) -> usize {
        let mut listeners = self.inner.listeners.write();
        match event_name {
            Some(name) => listeners.remove(name).map(|l| l.len()).unwrap_or(0),
            None => {
                let total = listeners.values().map(Vec::len).sum();
                listeners.clear();
                total
            }
        }
    }

    pub fn has_listeners(&self, event_name: &str) -> bool {
        self.listener_count(event_name) > 0
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.inner
            .listeners
            .read()
            .get(event_name)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// 按调用顺序列出某事件的订阅
    pub fn subscriptions(&self, event_name: &str) -> Vec<SubscriptionInfo> {
        self.inner
            .listeners
            .read()
            .get(event_name)
            .map(|list| list.iter().map(|s| s.info(event_name)).collect())
            .unwrap_or_default()
    }

    fn snapshot(&self, event_name: &str) -> Vec<Arc<Subscription>> {
        self.inner
            .listeners
            .read()
            .get(event_name)
            .cloned()
            .unwrap_or_default()
    }

    fn remove_once(&self, event_name: &str, subscription: &Subscription) {
        if subscription.once {
            self.unsubscribe(event_name, subscription.id);
        }
    }

    // ------------------------------------------------------------------------
    // 发出事件
    // ------------------------------------------------------------------------

    fn record(&self, event: &Event) {
        let max = self.inner.config.history_size;
        if max == 0 {
            return;
        }
        let mut history = self.inner.history.lock();
        history.push_back(event.clone());
        while history.len() > max {
            history.pop_front();
        }
    }

    /// 同步发出事件，返回成功执行的监听器数量
    pub fn emit(&self, event_name: &str, payload: Value) -> usize {
        self.emit_with(event_name, payload, EmitOptions::default())
    }

    /// 序列化负载后同步发出
    pub fn publish<T: Serialize>(&self, event_name: &str, payload: &T) -> usize {
        self.publish_with(event_name, payload, EmitOptions::default())
    }

    pub fn publish_with<T: Serialize>(
        &self,
        event_name: &str,
        payload: &T,
        options: EmitOptions<'_>,
    ) -> usize {
        match serde_json::to_value(payload) {
            Ok(value) => self.emit_with(event_name, value, options),
            Err(e) => {
                tracing::error!("[EventBus] 事件负载序列化失败: event={} error={}", event_name, e);
                0
            }
        }
    }

    pub fn emit_with(&self, event_name: &str, payload: Value, options: EmitOptions<'_>) -> usize {
        let Some(_guard) = DepthGuard::enter(self.inner.config.max_emit_depth) else {
            tracing::warn!(
                "[EventBus] emit 嵌套超过 {} 层，丢弃事件: {}",
                self.inner.config.max_emit_depth,
                event_name
            );
            return 0;
        };

        let event = Event::new(event_name, payload, options.source);
        self.record(&event);

        let subscriptions = self.snapshot(event_name);
        if subscriptions.is_empty() {
            return 0;
        }

        let mut dispatched = 0;
        for subscription in subscriptions {
            if !subscription.claim() {
                continue;
            }

            let outcome = self.invoke_sync(&subscription, &event);
            self.remove_once(event_name, &subscription);

            match outcome {
                Invocation::Completed | Invocation::Scheduled => dispatched += 1,
                Invocation::Failed(message) => {
                    self.report_fault(event_name, subscription.id, &message)
                }
            }
        }

        tracing::trace!("[EventBus] 事件 {} 执行了 {} 个监听器", event_name, dispatched);
        dispatched
    }

    fn invoke_sync(&self, subscription: &Subscription, event: &Event) -> Invocation {
        match &subscription.listener {
            Listener::Sync(callback) => {
                match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                    Ok(Ok(())) => Invocation::Completed,
                    Ok(Err(e)) => Invocation::Failed(e.to_string()),
                    Err(panic) => Invocation::Failed(panic_message(panic)),
                }
            }
            Listener::Async(callback) => {
                let Ok(handle) = tokio::runtime::Handle::try_current() else {
                    return Invocation::Failed("异步监听器需要 tokio 运行时".to_string());
                };
                let future = callback(event.clone());
                let weak = self.downgrade();
                let event_name = event.name.clone();
                let id = subscription.id;
                handle.spawn(async move {
                    if let Err(e) = future.await {
                        if let Some(bus) = EventBus::from_weak(&weak) {
                            bus.report_fault(&event_name, id, &e.to_string());
                        }
                    }
                });
                Invocation::Scheduled
            }
        }
    }

    /// 并发发出事件
    ///
    /// 按优先级顺序调度所有监听器，等待全部结束后返回成功数量。完成顺序不保证。
    pub async fn emit_async(&self, event_name: &str, payload: Value) -> usize {
        self.emit_async_with(event_name, payload, EmitOptions::default())
            .await
    }

    pub async fn emit_async_with(
        &self,
        event_name: &str,
        payload: Value,
        options: EmitOptions<'_>,
    ) -> usize {
        let event = Event::new(event_name, payload, options.source);
        self.record(&event);

        let mut tasks = Vec::new();
        for subscription in self.snapshot(event_name) {
            if !subscription.claim() {
                continue;
            }
            let handle = match &subscription.listener {
                Listener::Sync(callback) => {
                    let callback = callback.clone();
                    let event = event.clone();
                    tokio::spawn(async move { callback(&event) })
                }
                Listener::Async(callback) => tokio::spawn(callback(event.clone())),
            };
            tasks.push((subscription, handle));
        }

        let (subscriptions, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;

        let mut dispatched = 0;
        for (subscription, result) in subscriptions.iter().zip(results) {
            self.remove_once(event_name, subscription);
            match result {
                Ok(Ok(())) => dispatched += 1,
                Ok(Err(e)) => self.report_fault(event_name, subscription.id, &e.to_string()),
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        panic_message(join_error.into_panic())
                    } else {
                        join_error.to_string()
                    };
                    self.report_fault(event_name, subscription.id, &message);
                }
            }
        }
        dispatched
    }

    /// 监听器失败：记录日志并发出 `listenerError`；`listenerError` 自身的失败只记日志
    fn report_fault(&self, event_name: &str, id: SubscriptionId, message: &str) {
        tracing::error!(
            "[EventBus] 监听器执行失败: event={} listener={} error={}",
            event_name,
            id,
            message
        );

        if event_name == LISTENER_ERROR {
            return;
        }

        self.emit_with(
            LISTENER_ERROR,
            json!({
                "event": event_name,
                "error": message,
                "listener": id.0,
            }),
            EmitOptions::source(EVENT_BUS_SOURCE),
        );
    }

    // ------------------------------------------------------------------------
    // 历史与统计
    // ------------------------------------------------------------------------

    /// 事件历史，按时间正序
    ///
    /// # 参数
    /// - `limit`: 最多返回的条数（取最新的），`None` 表示全部
    /// - `event_name`: 只返回该名称的事件
    pub fn history(&self, limit: Option<usize>, event_name: Option<&str>) -> Vec<Event> {
        let history = self.inner.history.lock();
        let filtered: Vec<&Event> = history
            .iter()
            .filter(|e| event_name.map_or(true, |name| e.name == name))
            .collect();
        let skip = limit.map_or(0, |n| filtered.len().saturating_sub(n));
        filtered.into_iter().skip(skip).cloned().collect()
    }

    /// 清空历史，返回清除数量
    pub fn clear_history(&self) -> usize {
        let mut history = self.inner.history.lock();
        let count = history.len();
        history.clear();
        count
    }

    pub fn stats(&self) -> EventBusStats {
        let listeners = self.inner.listeners.read();
        let per_name_subscriber_count: BTreeMap<String, usize> = listeners
            .iter()
            .map(|(name, list)| (name.clone(), list.len()))
            .collect();
        let total_listeners = per_name_subscriber_count.values().sum();

        EventBusStats {
            event_names: per_name_subscriber_count.keys().cloned().collect(),
            per_name_subscriber_count,
            total_listeners,
            history_size: self.inner.history.lock().len(),
            max_history_size: self.inner.config.history_size,
        }
    }

    // ------------------------------------------------------------------------
    // 组合
    // ------------------------------------------------------------------------

    /// 把 `from` 事件转发为 `to` 事件，可选转换负载
    ///
    /// 返回底层订阅 ID，可用 `unsubscribe(from, id)` 拆除。
    pub fn proxy(
        &self,
        from: &str,
        to: &str,
        transform: Option<PayloadTransform>,
    ) -> Result<SubscriptionId, EventBusError> {
        if to.trim().is_empty() {
            return Err(EventBusError::InvalidEventName(to.to_string()));
        }

        let weak = self.downgrade();
        let to = to.to_string();
        self.on(
            from,
            Listener::sync(move |event| {
                if let Some(bus) = EventBus::from_weak(&weak) {
                    let payload = match &transform {
                        Some(f) => f(&event.payload),
                        None => event.payload.clone(),
                    };
                    bus.emit_with(&to, payload, EmitOptions::source("proxy"));
                }
                Ok(())
            }),
        )
    }

    /// 把一组事件汇总为 `group:<name>`
    ///
    /// 每个成员事件都会以 `{event, data, groupId}` 重新发出。
    pub fn create_group(
        &self,
        group_name: &str,
        events: &[&str],
    ) -> Result<EventGroup, EventBusError> {
        let group_id = format!("grp_{}", uuid::Uuid::new_v4().simple());
        let event_name = format!("group:{}", group_name);

        let mut subscriptions = Vec::with_capacity(events.len());
        for member in events {
            let weak = self.downgrade();
            let target = event_name.clone();
            let group_id = group_id.clone();
            let member_name = member.to_string();
            let id = self.on(
                member,
                Listener::sync(move |event| {
                    if let Some(bus) = EventBus::from_weak(&weak) {
                        bus.emit_with(
                            &target,
                            json!({
                                "event": member_name,
                                "data": event.payload,
                                "groupId": group_id,
                            }),
                            EmitOptions::source("group"),
                        );
                    }
                    Ok(())
                }),
            )?;
            subscriptions.push(id);
        }

        Ok(EventGroup {
            group_id,
            event_name,
            subscriptions,
        })
    }

    /// 依次并发发出每一步，步骤之间可转换数据，返回最终数据
    pub async fn pipeline(&self, steps: &[PipelineStep], initial: Value) -> Value {
        let mut current = initial;
        for step in steps {
            self.emit_async(&step.name, current.clone()).await;
            if let Some(transform) = &step.transform {
                current = transform(&current);
            }
        }
        current
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "监听器 panic".to_string()
    }
}
