//! # Matcher
//!
//! Sensor match and record construction engine.
//!
//! 负责：
//! - 按配置顺序匹配传感器 (first match wins)
//! - 提取并重命名变量
//! - 连续重复读数去重
//! - 解析时间戳并构造 `TelemetryRecord`
//!
//! ## 使用示例
//!
//! ```ignore
//! use matcher::{Deduplicator, Evaluation, MatchEngine};
//!
//! let engine = MatchEngine::new(Arc::new(config));
//! let mut dedup = Deduplicator::new();
//!
//! if !dedup.check(&reading) {
//!     if let Evaluation::Record { record, .. } = engine.evaluate(&reading) {
//!         sink.submit(&record)?;
//!     }
//! }
//! ```

mod builder;
mod dedup;
mod engine;
mod matching;

pub use builder::{build_record, parse_time, resolve_timestamp, ResolvedTimestamp, TimestampSource};
pub use dedup::Deduplicator;
pub use engine::{Evaluation, MatchEngine};
pub use matching::{criteria_satisfied, find_match, SensorMatch};

// Re-export contracts types
pub use contracts::{Reading, SensorDefinition, StationConfig, TelemetryRecord};
