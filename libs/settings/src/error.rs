//! Error types for loading settings.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading a settings document.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid YAML.
    #[error("invalid settings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The top level of the document is not a mapping.
    #[error("settings must be a mapping from site URL to site settings")]
    NotAMapping,

    /// A top-level key is not a string.
    #[error("site identifier must be a string, got {0}")]
    InvalidSiteKey(String),

    /// A top-level key is neither `default` nor a site URL.
    #[error("site '{0}' must be `default` or a base URL such as https://host/")]
    InvalidSiteUrl(String),

    /// One or more site blocks do not match the settings schema.
    #[error("settings do not match the schema: {}", summarize(.violations))]
    Schema { violations: Vec<SchemaViolation> },

    /// A site block passed the schema but could not be typed.
    #[error("invalid settings for '{site}': {reason}")]
    InvalidSite { site: String, reason: String },

    /// The embedded schema failed to compile.
    #[error("settings schema is invalid: {0}")]
    SchemaCompile(String),
}

/// A single schema violation within one site block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub site: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.site, self.message)
    }
}

fn summarize(violations: &[SchemaViolation]) -> String {
    match violations {
        [] => "no violations".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
