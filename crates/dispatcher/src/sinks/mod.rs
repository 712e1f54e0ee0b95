//! Sink implementations
//!
//! Contains ChordsSink (queued HTTP delivery) and LogSink (dry run).

mod chords;
mod log;

pub use self::chords::ChordsSink;
pub use self::log::LogSink;
