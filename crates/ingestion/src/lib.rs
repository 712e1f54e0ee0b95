//! # Ingestion Pipeline
//!
//! Line ingestion module.
//!
//! Responsibilities:
//! - Provide line sources (decoder subprocess, replay file, in-memory mock)
//! - Decode each line into a `Reading`
//! - Drive dedup -> match -> record build -> sink submission, one line at a time
//! - Isolate failures per line
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{DecoderProcess, StreamPipeline};
//!
//! let mut pipeline = StreamPipeline::new(MatchEngine::new(config.clone()), sink);
//! let mut source = DecoderProcess::spawn(&config.decoder)?;
//! if let Err(e) = pipeline.run(&mut source).await {
//!     // Upstream closed: restart the decoder and call run() again
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockLineSource;
//!
//! let mut source = MockLineSource::from_lines(["{\"model\":\"X\"}", "not json"]);
//! pipeline.run(&mut source).await?;
//! ```

mod mock;
mod pipeline;
mod sources;

// Re-exports
pub use contracts::{LineSource, Reading};
pub use mock::MockLineSource;
pub use pipeline::{decode_reading, LineOutcome, LineStats, StreamPipeline};
pub use sources::{open_replay_file, DecoderProcess, ReaderLineSource};
