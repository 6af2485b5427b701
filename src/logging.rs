//! 日志初始化
//!
//! `tracing-subscriber` 注册表：`EnvFilter`（`RUST_LOG` 优先于配置级别）、
//! 文本或 JSON 格式的 fmt 层，以及可选的 `LogStoreLayer`，
//! 把事件写入 `netterm-core` 的内存日志环（写入前脱敏）。

use std::fmt::Debug;

use netterm_core::SharedLogStore;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// 安装全局日志订阅器
///
/// # 参数
/// - `config`: 日志配置
/// - `store`: 可选的日志存储，传入时所有事件同时写入该存储
pub fn init_logging(config: &LoggingConfig, store: Option<SharedLogStore>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(store.map(LogStoreLayer::new));

    let result = if config.json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    result.map_err(|e| anyhow::anyhow!("初始化日志失败: {}", e))
}

/// 把 tracing 事件写入 `LogStore`
pub struct LogStoreLayer {
    store: SharedLogStore,
}

impl LogStoreLayer {
    pub fn new(store: SharedLogStore) -> Self {
        Self { store }
    }
}

impl<S: Subscriber> Layer<S> for LogStoreLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.store.write().add(
            &metadata.level().as_str().to_lowercase(),
            metadata.target(),
            &visitor.finish(),
        );
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}
