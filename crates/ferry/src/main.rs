use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ferry::cli::{self, App};
use ferry::config::FerryConfig;
use ferry::ui::ProgressBars;
use ferry_s3::S3Store;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let app = App::parse();
    let mut config = FerryConfig::load(app.global.config.as_deref()).context("failed to load config")?;
    app.global.apply(&mut config);

    setup_tracing(&config.log_level);

    let store = S3Store::new(config.store.s3_config()?).context("failed to configure the S3 store")?;
    let bars = if app.global.quiet {
        ProgressBars::hidden()
    } else {
        ProgressBars::new()
    };

    cli::run(app.cmd, Arc::new(store), config.transfer, Arc::new(bars)).await
}

/// Respects `RUST_LOG` if set, otherwise uses the configured level.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
