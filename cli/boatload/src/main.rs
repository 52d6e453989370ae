//! boatload - upload compose files to BigBoat dashboards
//!
//! Reads per-site settings from `settings.yml`, renders the compose templates
//! for each selected site, uploads them as an application version, and
//! optionally (re)starts the site's instance.

use anyhow::Result;
use clap::Parser;

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod uploader;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level(), cli.log_json());

    if let Err(e) = cli.run().await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
