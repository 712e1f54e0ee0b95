//! # Dispatcher
//!
//! 记录投递模块。
//!
//! 负责：
//! - 将 `TelemetryRecord` 编码为 CHORDS `url_create` URI
//! - 有界、非阻塞的投递队列，满时丢弃并计数
//! - 后台 worker 按序 HTTP GET，失败指数退避重试
//! - 退出前等待队列排空

pub mod error;
pub mod metrics;
pub mod queue;
pub mod sinks;
pub mod transport;
pub mod uri;

pub use contracts::{RecordSink, TelemetryRecord};
pub use reqwest::Url;
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, QueueMetrics};
pub use queue::{drain, DeliveryQueue, RetryPolicy};
pub use sinks::{ChordsSink, LogSink};
pub use transport::{HttpTransport, LocalTransport, Transport};
pub use uri::{build_record_uri, redact_uri};
