//! CLI argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// rtl2chords - forward rtl_433 sensor readings to a CHORDS portal
#[derive(Parser, Debug)]
#[command(
    name = "rtl2chords",
    author,
    version,
    about = "Forward rtl_433 sensor readings to a CHORDS data portal",
    long_about = "Runs the rtl_433 decoder (or replays its JSON output from a file), matches\n\
                  each reading against the configured smart sensors and uploads the mapped\n\
                  variables to a CHORDS portal."
)]
pub struct Cli {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long, env = "RTL2CHORDS_CONFIG")]
    pub config: PathBuf,

    /// Read decoder output from this file instead of running rtl_433
    #[arg(short, long, env = "RTL2CHORDS_FILE")]
    pub file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, env = "RTL2CHORDS_DEBUG")]
    pub debug: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        env = "RTL2CHORDS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "RTL2CHORDS_METRICS_PORT")]
    pub metrics_port: u16,

    /// Log records instead of uploading them
    #[arg(long, env = "RTL2CHORDS_DRY_RUN")]
    pub dry_run: bool,

    /// Validate configuration and exit
    #[arg(long, env = "RTL2CHORDS_VALIDATE")]
    pub validate: bool,

    /// Print the validation result as JSON
    #[arg(long, requires = "validate", env = "RTL2CHORDS_JSON")]
    pub json: bool,

    /// Forget the previous reading whenever the decoder restarts
    #[arg(long, env = "RTL2CHORDS_RESET_DEDUP")]
    pub reset_dedup: bool,

    /// Give up waiting for the upload queue after this many seconds
    #[arg(long, env = "RTL2CHORDS_DRAIN_TIMEOUT")]
    pub drain_timeout: Option<u64>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line format
    #[default]
    Compact,
    /// Human-readable pretty format
    Pretty,
    /// JSON structured logging
    Json,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => Self::Compact,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Json => Self::Json,
        }
    }
}
