//! Configuration.
//!
//! Handles:
//! - Locating the settings file
//! - Environment-driven upload tuning (timeouts, restart polling)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Settings file name.
pub const SETTINGS_FILE: &str = "settings.yml";

/// Get the config directory path.
fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("nl", "gros", "boatload").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Find the settings file to use.
///
/// An explicit path always wins. Otherwise `./settings.yml` is used when it
/// exists, then `settings.yml` in the user config directory. When neither
/// exists the local path is returned so that loading reports it.
pub fn settings_path(explicit: Option<&Path>) -> PathBuf {
    let user = config_dir().map(|dir| dir.join(SETTINGS_FILE));
    pick_settings_path(explicit, Path::new(SETTINGS_FILE), user.as_deref())
}

fn pick_settings_path(explicit: Option<&Path>, local: &Path, user: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if local.exists() {
        return local.to_path_buf();
    }
    match user {
        Some(path) if path.exists() => path.to_path_buf(),
        _ => local.to_path_buf(),
    }
}

/// Upload tuning (env-driven).
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Timeout of a single dashboard request.
    pub request_timeout: Duration,

    /// Interval between checks whether an old instance is gone.
    pub restart_poll: Duration,

    /// Give up waiting for an old instance after this long.
    pub restart_timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            request_timeout: boatload_client::DEFAULT_TIMEOUT,
            restart_poll: Duration::from_secs(2),
            restart_timeout: Duration::from_secs(300),
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let request_timeout = lookup("BOATLOAD_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("BOATLOAD_TIMEOUT_SECS must be an integer (seconds).")?
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or(defaults.request_timeout);

        let restart_poll = lookup("BOATLOAD_RESTART_POLL_MS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("BOATLOAD_RESTART_POLL_MS must be an integer (milliseconds).")?
            .map(|ms| Duration::from_millis(ms.max(10)))
            .unwrap_or(defaults.restart_poll);

        let restart_timeout = lookup("BOATLOAD_RESTART_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("BOATLOAD_RESTART_TIMEOUT_SECS must be an integer (seconds).")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.restart_timeout);

        Ok(Self {
            request_timeout,
            restart_poll,
            restart_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_upload_config_defaults() {
        let config = UploadConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.restart_poll, Duration::from_secs(2));
        assert_eq!(config.request_timeout, boatload_client::DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_upload_config_from_env() {
        let config = UploadConfig::from_lookup(lookup(&[
            ("BOATLOAD_RESTART_POLL_MS", "1"),
            ("BOATLOAD_TIMEOUT_SECS", "5"),
            ("BOATLOAD_RESTART_TIMEOUT_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.restart_poll, Duration::from_millis(10));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.restart_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_upload_config_rejects_garbage() {
        assert!(UploadConfig::from_lookup(lookup(&[("BOATLOAD_TIMEOUT_SECS", "soon")])).is_err());
    }

    #[test]
    fn test_settings_path_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local.yml");
        let user = dir.path().join("user.yml");
        let explicit = dir.path().join("explicit.yml");

        // Nothing exists: fall back to the local path.
        assert_eq!(pick_settings_path(None, &local, Some(&user)), local);

        std::fs::write(&user, "").unwrap();
        assert_eq!(pick_settings_path(None, &local, Some(&user)), user);

        std::fs::write(&local, "").unwrap();
        assert_eq!(pick_settings_path(None, &local, Some(&user)), local);

        assert_eq!(
            pick_settings_path(Some(&explicit), &local, Some(&user)),
            explicit
        );
    }
}
