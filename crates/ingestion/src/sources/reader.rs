//! ReaderLineSource - lines from any async reader (replay files, stdin)

use std::path::Path;

use contracts::{ContractError, LineSource};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info};

use super::read_raw_line;

/// Line source over a buffered async reader
///
/// End of input is a normal end of stream.
pub struct ReaderLineSource<R> {
    name: String,
    reader: R,
    lines_read: u64,
}

impl<R> ReaderLineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Create a new source with the given name
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            lines_read: 0,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

/// Open a recorded decoder output file for replay
pub async fn open_replay_file(
    path: &Path,
) -> Result<ReaderLineSource<BufReader<File>>, ContractError> {
    let file = File::open(path).await?;
    info!(path = %path.display(), "Replaying decoder output from file");
    Ok(ReaderLineSource::new(
        path.display().to_string(),
        BufReader::new(file),
    ))
}

impl<R> LineSource for ReaderLineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, ContractError> {
        match read_raw_line(&mut self.reader).await {
            Ok(Some(line)) => {
                self.lines_read += 1;
                Ok(Some(line))
            }
            Ok(None) => {
                debug!(source = %self.name, lines = self.lines_read, "End of input");
                Ok(None)
            }
            Err(e) => Err(ContractError::upstream_closed(&self.name, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_lines_without_terminators() {
        let data: &[u8] = b"first\r\nsecond\nthird";
        let mut source = ReaderLineSource::new("mem", BufReader::new(data));
        assert_eq!(source.next_line().await.unwrap().unwrap(), b"first");
        assert_eq!(source.next_line().await.unwrap().unwrap(), b"second");
        assert_eq!(source.next_line().await.unwrap().unwrap(), b"third");
        assert!(source.next_line().await.unwrap().is_none());
        assert_eq!(source.lines_read(), 3);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_passed_through() {
        let data: &[u8] = b"\xff\xfe\n{}\n";
        let mut source = ReaderLineSource::new("mem", BufReader::new(data));
        assert_eq!(source.next_line().await.unwrap().unwrap(), vec![0xff, 0xfe]);
        assert_eq!(source.next_line().await.unwrap().unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_open_replay_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"model\":\"X\"}}").unwrap();
        let mut source = open_replay_file(file.path()).await.unwrap();
        assert_eq!(source.next_line().await.unwrap().unwrap(), br#"{"model":"X"}"#);
        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_replay_file() {
        let result = open_replay_file(Path::new("/nonexistent/replay.json")).await;
        assert!(matches!(result, Err(ContractError::Io(_))));
    }
}
