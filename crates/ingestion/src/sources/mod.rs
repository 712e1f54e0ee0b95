//! Line source implementations
//!
//! Contains the decoder subprocess and generic async reader sources.

mod decoder;
mod reader;

pub use self::decoder::DecoderProcess;
pub use self::reader::{open_replay_file, ReaderLineSource};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Read one `\n`-terminated line, stripping the terminator (and any `\r`)
///
/// Returns `Ok(None)` at end of stream.
pub(crate) async fn read_raw_line<R>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(buf))
}
