//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Data Model
//! - `StationConfig`: the sensor catalogue plus CHORDS endpoint settings
//! - `Reading`: one decoded JSON object emitted by the radio decoder
//! - `TelemetryRecord`: the outbound payload for one matched reading
//!
//! ## Seams
//! - `LineSource`: anything that yields raw input lines
//! - `RecordSink`: the delivery queue that accepts records

mod error;
mod instrument_id;
mod line_source;
mod record;
mod sink;
mod station;

pub use error::*;
pub use instrument_id::InstrumentId;
pub use line_source::{LineSource, LocalLineSource};
pub use record::*;
pub use sink::RecordSink;
pub use station::*;
