//! LineSource trait - input stream abstraction
//!
//! The decoder subprocess, a replay file and in-memory test fixtures all
//! yield raw lines through this interface.

use crate::ContractError;

/// Source of raw input lines
///
/// Lines are returned as bytes without the trailing newline; UTF-8 and JSON
/// validity are checked per line by the consumer.
#[trait_variant::make(LineSource: Send)]
pub trait LocalLineSource {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Next line, `Ok(None)` at a normal end of stream
    ///
    /// # Errors
    /// Returns `UpstreamClosed` when the source terminates abnormally
    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, ContractError>;
}
