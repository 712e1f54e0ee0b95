//! # rtl2chords CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 解码器监管与自动重启
//! - 优雅关闭与上传队列排空

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::Cli;
use commands::{run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(observability::ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: (cli.metrics_port != 0 && !cli.validate).then_some(cli.metrics_port),
        default_log_level: if cli.debug { "debug" } else { "info" }.to_string(),
    })?;
    tracing::debug!("Debug logging enabled");

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "Starting rtl2chords"
    );

    let result = if cli.validate {
        run_validate(&cli)
    } else {
        run_pipeline(&cli).await
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
