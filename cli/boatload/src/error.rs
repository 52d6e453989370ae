//! Error handling and display for the CLI.

use boatload_client::ClientError;
use boatload_settings::{SettingsError, TemplateError};
use colored::Colorize;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("API for {site} cannot upload compose files (no v2 API key)")]
    V1Only { site: String },

    #[error("{file} for {site}: {source}")]
    Template {
        site: String,
        file: String,
        #[source]
        source: TemplateError,
    },

    #[error("Old instance '{instance}' on {site} was not removed within {waited_secs}s")]
    RestartTimeout {
        site: String,
        instance: String,
        waited_secs: u64,
    },

    #[error("Invalid site '{0}': expected a base URL such as https://host/")]
    InvalidSite(String),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), error_message(err));

    if let Some(SettingsError::Schema { violations }) = find::<SettingsError>(err) {
        for violation in violations {
            eprintln!("  - {}", violation);
        }
    }

    if let Some(hint) = hint(err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

/// Join the error chain, skipping causes the previous message already ends with.
fn error_message(err: &anyhow::Error) -> String {
    let mut message = String::new();
    let mut previous = String::new();

    for cause in err.chain() {
        let text = cause.to_string();
        if previous.ends_with(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
        previous = text;
    }

    message
}

/// Pick a hint for the first error in the chain that has one.
fn hint(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(cli_err) = find::<CliError>(err) {
        return match cli_err {
            CliError::V1Only { .. } => {
                Some("Add a `key` for the site to settings.yml or pass one with --keys.")
            }
            CliError::Template { .. } => Some(
                "Define the missing parameters under `params` in the default or site block.",
            ),
            CliError::RestartTimeout { .. } => {
                Some("Check the instance on the dashboard, or rerun with --no-stop.")
            }
            CliError::InvalidSite(_) => None,
        };
    }

    if let Some(client_err) = find::<ClientError>(err) {
        if matches!(client_err.status(), Some(401 | 403)) {
            return Some("The API key may be wrong for this site, or lacks permission.");
        }
        return match client_err {
            ClientError::Network(_) => {
                Some("Check your network connection and the site (or remote_site) URL.")
            }
            ClientError::RequiresV2 { .. } => {
                Some("Add a `key` for the site to settings.yml or pass one with --keys.")
            }
            _ => None,
        };
    }

    if let Some(SettingsError::Schema { .. }) = find::<SettingsError>(err) {
        return Some("Run `boatload validate` to list every problem in the settings file.");
    }

    None
}

fn find<E: std::error::Error + 'static>(err: &anyhow::Error) -> Option<&E> {
    err.chain().find_map(|cause| cause.downcast_ref::<E>())
}
