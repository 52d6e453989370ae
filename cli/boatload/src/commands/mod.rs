//! CLI commands.

mod render;
mod sites;
mod upload;
mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use boatload_settings::SettingsDocument;
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::config::settings_path;
use crate::logging::LogLevel;
use crate::output::OutputFormat;

/// boatload - upload compose files to BigBoat dashboards.
#[derive(Debug, Parser)]
#[command(name = "boatload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file. Defaults to ./settings.yml, then the user config directory.
    #[arg(long, global = true, env = "BOATLOAD_SETTINGS", value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Log level.
    #[arg(
        long,
        global = true,
        env = "BOATLOAD_LOG",
        value_enum,
        ignore_case = true,
        default_value = "INFO"
    )]
    log: LogLevel,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload compose files to sites and optionally (re)start instances.
    Upload(upload::UploadCommand),

    /// List sites and their resolved settings.
    Sites(sites::SitesCommand),

    /// Print a compose file rendered for a site.
    Render(render::RenderCommand),

    /// Validate the settings file (offline).
    Validate(validate::ValidateCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        self.log
    }

    pub fn log_json(&self) -> bool {
        self.log_json
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let ctx = CommandContext {
            settings_path: settings_path(self.settings.as_deref()),
            format: OutputFormat::parse(&self.format),
        };

        match self.command {
            Commands::Upload(cmd) => cmd.run(ctx).await,
            Commands::Sites(cmd) => cmd.run(ctx),
            Commands::Render(cmd) => cmd.run(ctx),
            Commands::Validate(cmd) => cmd.run(ctx),
            Commands::Version => {
                println!("boatload {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub settings_path: PathBuf,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Load and validate the settings file.
    pub fn load_settings(&self) -> Result<SettingsDocument> {
        debug!(path = %self.settings_path.display(), "Loading settings");
        SettingsDocument::load(&self.settings_path).with_context(|| {
            format!(
                "Cannot load settings from {}",
                self.settings_path.display()
            )
        })
    }
}
