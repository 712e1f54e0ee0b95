//! DecoderProcess - rtl_433 subprocess as a line source
//!
//! 以 `{path} -f {frequency} -F json {extra_args...}` 启动解码器，
//! 逐行读取其 stdout。stdout 关闭即视为上游结束，返回 `UpstreamClosed`。

use std::process::Stdio;

use contracts::{ContractError, DecoderConfig, LineSource};
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, error, info, instrument};

use super::read_raw_line;

/// Running decoder subprocess
pub struct DecoderProcess {
    name: String,
    child: Child,
    stdout: BufReader<ChildStdout>,
    lines_read: u64,
}

impl DecoderProcess {
    /// Spawn the decoder described by `config`
    #[instrument(name = "decoder_spawn", skip(config), fields(path = %config.path))]
    pub fn spawn(config: &DecoderConfig) -> Result<Self, ContractError> {
        let args = config.command_args();
        let mut child = Command::new(&config.path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ContractError::upstream_closed(&config.path, format!("failed to spawn: {}", e))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            ContractError::upstream_closed(&config.path, "stdout not captured")
        })?;

        info!(args = ?args, pid = ?child.id(), "Decoder started");

        Ok(Self {
            name: config.path.clone(),
            child,
            stdout: BufReader::new(stdout),
            lines_read: 0,
        })
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Terminate the subprocess
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "Decoder already exited");
        }
    }

    async fn closed(&mut self) -> ContractError {
        let message = match self.child.wait().await {
            Ok(status) => format!("decoder exited ({})", status),
            Err(e) => format!("failed to reap decoder: {}", e),
        };
        error!(source = %self.name, lines = self.lines_read, "{}", message);
        ContractError::upstream_closed(&self.name, message)
    }
}

impl LineSource for DecoderProcess {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, ContractError> {
        match read_raw_line(&mut self.stdout).await {
            Ok(Some(line)) => {
                self.lines_read += 1;
                Ok(Some(line))
            }
            Ok(None) => Err(self.closed().await),
            Err(e) => {
                error!(source = %self.name, error = %e, "Failed reading decoder output");
                Err(ContractError::upstream_closed(&self.name, e.to_string()))
            }
        }
    }
}
