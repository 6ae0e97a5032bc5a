//! CLI for querying and following bridge transactions through the status API.

mod cli;
mod config;
mod handlers;

use anyhow::{Context, Result};
use clap::Parser;
use lxly_bridge_common::logging::{self, LoggerConfig};

use crate::handlers::{status, track};

#[tokio::main]
async fn main() -> Result<()> {
    let mut logger_config = LoggerConfig::with_base_name("lxly-cli");
    if let Some(url) = logging::get_otlp_url_from_env() {
        logger_config.set_otlp_url(url);
    }
    logging::init(logger_config).context("initialize logging")?;

    let cli = cli::Cli::parse();
    let config = config::load(&cli.global).context("load configuration")?;

    match cli.command {
        cli::Commands::Status(args) => status::handle_status(config, args).await,
        cli::Commands::Track(args) => track::handle_track(config, args).await,
    }
}
