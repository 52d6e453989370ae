//! # boatload-settings
//!
//! Site settings for uploading compose files to BigBoat dashboards.
//!
//! ## Settings Document
//!
//! `settings.yml` maps a site URL (`https://host/`) or the literal `default`
//! to a block of site settings:
//!
//! ```yaml
//! default:
//!   params:
//!     JIRA_URL: https://jira.example/
//! https://bigboat.example/:
//!   key: 0123abcd
//!   instance: gros-agent
//!   params:
//!     AGENT_LOGGING: "1"
//! ```
//!
//! ## Merge Rules
//!
//! - `params` of the default block are overridden per key by the site
//! - `remote_site` and `instance` fall back to the default block
//! - `key` and `v1` are never inherited from the default block
//!
//! ## Templates
//!
//! Compose files carry `{{TOKEN}}` placeholders which are resolved from the
//! merged parameters. Rendering fails when any placeholder has no value.

mod document;
mod error;
mod keys;
mod merge;
mod schema;
mod template;

pub use document::{is_site_url, SettingsDocument, SiteSettings, DEFAULT_SITE};
pub use error::{SchemaViolation, SettingsError};
pub use keys::SiteKeys;
pub use merge::{merge_site, ResolvedSite, HOST_PARAM, KEY_PARAM, MISSING_KEY};
pub use schema::{site_schema, validate_site};
pub use template::{is_token, placeholders, render, TemplateError};
