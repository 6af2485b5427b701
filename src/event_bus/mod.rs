//! 事件总线模块
//!
//! 进程内的发布/订阅路由，连接会话状态的产生方与各个独立的消费方。
//!
//! ## 功能
//! - 按优先级排序的订阅，一次性订阅
//! - 同步 emit（调用线程内依次执行）与并发 emit_async（tokio 任务扇出）
//! - 监听器失败隔离，失败通过 `listenerError` 事件上报
//! - 有界事件历史与统计
//! - 事件转发（proxy）、事件组与流水线
//!
//! ## 模块结构
//! - `subscription` - 事件、监听器、订阅记录
//! - `bus` - `EventBus` 实现

mod bus;
mod subscription;


pub use bus::{
    EmitOptions, EventBus, EventBusConfig, EventBusStats, EventGroup, PayloadTransform,
    PipelineStep, EVENT_BUS_SOURCE, LISTENER_ERROR,
};
pub use subscription::{
    AsyncCallback, Event, EventBusError, Listener, ListenerTarget, SubscribeOptions,
    SubscriptionId, SubscriptionInfo, SyncCallback, UNKNOWN_SOURCE,
};
