//! Dashboard API payloads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Compose files an application version carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposeFile {
    /// `docker-compose.yml`.
    Docker,
    /// `bigboat-compose.yml`.
    BigBoat,
}

impl ComposeFile {
    /// Every compose file, in upload order.
    pub const ALL: [ComposeFile; 2] = [ComposeFile::Docker, ComposeFile::BigBoat];

    /// Name of the file on disk.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Docker => "docker-compose.yml",
            Self::BigBoat => "bigboat-compose.yml",
        }
    }

    /// Path segment of the file in the API.
    pub fn api_name(self) -> &'static str {
        match self {
            Self::Docker => "dockerCompose",
            Self::BigBoat => "bigboatCompose",
        }
    }

    /// Look up a compose file by its name on disk.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|file| file.file_name() == name)
    }
}

impl fmt::Display for ComposeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// An application version registered on a dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Application reference inside an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Current and desired state of an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceState {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub desired: Option<String>,
}

/// An instance running (or starting) on a dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub app: Option<AppRef>,
    #[serde(default)]
    pub state: Option<InstanceState>,
}

/// Body of `PUT instances/{name}`.
#[derive(Debug, Serialize)]
pub(crate) struct InstanceRequest<'a> {
    pub app: &'a str,
    pub version: &'a str,
    pub parameters: &'a BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_file_names() {
        assert_eq!(ComposeFile::Docker.api_name(), "dockerCompose");
        assert_eq!(ComposeFile::BigBoat.api_name(), "bigboatCompose");
        assert_eq!(
            ComposeFile::from_file_name("bigboat-compose.yml"),
            Some(ComposeFile::BigBoat)
        );
        assert_eq!(ComposeFile::from_file_name("compose.yml"), None);
    }

    #[test]
    fn test_instance_deserialization_is_lenient() {
        let json = r#"{
            "name": "gros-agent",
            "app": { "name": "gros-data-gathering-agent", "version": "2" },
            "state": { "current": "running", "desired": "running" },
            "services": {}
        }"#;
        let instance: Instance = serde_json::from_str(json).unwrap();
        assert_eq!(instance.name, "gros-agent");
        assert_eq!(
            instance.state.and_then(|s| s.current).as_deref(),
            Some("running")
        );

        let bare: Instance = serde_json::from_str("{}").unwrap();
        assert_eq!(bare, Instance::default());
    }

    #[test]
    fn test_instance_request_serialization() {
        let parameters = BTreeMap::from([("BIGBOAT_HOST".to_string(), "https://a/".to_string())]);
        let request = InstanceRequest {
            app: "agent",
            version: "2",
            parameters: &parameters,
            options: BTreeMap::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "app": "agent",
                "version": "2",
                "parameters": { "BIGBOAT_HOST": "https://a/" },
                "options": {}
            })
        );
    }
}
