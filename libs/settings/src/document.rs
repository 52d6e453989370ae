//! Settings document parsing.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{SchemaViolation, SettingsError};
use crate::merge::{merge_site, ResolvedSite};
use crate::schema::validate_site;

/// Key of the block whose settings apply to every site.
pub const DEFAULT_SITE: &str = "default";

/// Settings for one site, or the default block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Instance parameters (`UPPER_SNAKE` keys).
    #[serde(default, deserialize_with = "scalar_map")]
    pub params: BTreeMap<String, String>,

    /// API key for the site.
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub key: Option<String>,

    /// The site only offers the v1 API.
    ///
    /// Only `v1: true` disables the site's key; `v1: false` is the same as
    /// leaving the flag out.
    #[serde(default)]
    pub v1: bool,

    /// URL to send API requests to, when it differs from the site URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_site: Option<String>,

    /// Instance name to start on the site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// A parsed and validated `settings.yml`.
///
/// Sites keep the order in which they appear in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsDocument {
    default: SiteSettings,
    sites: Vec<(String, SiteSettings)>,
}

impl SettingsDocument {
    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::from_yaml_str(&contents)?;

        debug!(
            path = %path.display(),
            site_count = document.sites.len(),
            "Loaded site settings"
        );
        Ok(document)
    }

    /// Parse a settings document, rejecting any schema violation.
    pub fn from_yaml_str(contents: &str) -> Result<Self, SettingsError> {
        let entries = parse_entries(contents)?;

        let violations = validate_entries(&entries)?;
        if !violations.is_empty() {
            return Err(SettingsError::Schema { violations });
        }

        let mut document = Self::default();
        for (site, value) in entries {
            let settings: SiteSettings =
                serde_yaml::from_value(value).map_err(|e| SettingsError::InvalidSite {
                    site: site.clone(),
                    reason: e.to_string(),
                })?;

            if site == DEFAULT_SITE {
                document.default = settings;
            } else {
                document.sites.push((site, settings));
            }
        }

        Ok(document)
    }

    /// Check a settings document against the schema.
    ///
    /// Structural problems (bad YAML, bad site keys) are returned as errors;
    /// schema violations of every site are collected.
    pub fn check_yaml_str(contents: &str) -> Result<Vec<SchemaViolation>, SettingsError> {
        let entries = parse_entries(contents)?;
        validate_entries(&entries)
    }

    /// Settings of the default block.
    pub fn default_settings(&self) -> &SiteSettings {
        &self.default
    }

    /// Settings of a specific (non-default) site, if present.
    pub fn site(&self, site: &str) -> Option<&SiteSettings> {
        self.sites
            .iter()
            .find(|(id, _)| id == site)
            .map(|(_, settings)| settings)
    }

    /// Check if a site has its own block.
    pub fn contains(&self, site: &str) -> bool {
        self.site(site).is_some()
    }

    /// Iterate over non-default sites in file order.
    pub fn sites(&self) -> impl Iterator<Item = (&str, &SiteSettings)> {
        self.sites
            .iter()
            .map(|(site, settings)| (site.as_str(), settings))
    }

    /// Non-default site URLs in file order.
    pub fn site_ids(&self) -> Vec<String> {
        self.sites.iter().map(|(site, _)| site.clone()).collect()
    }

    /// Merge the default block into the settings of a site.
    ///
    /// Sites without their own block resolve to the default block alone.
    pub fn resolve(&self, site: &str) -> ResolvedSite {
        merge_site(site, &self.default, self.site(site))
    }
}

/// Check whether a value has the shape of a site URL (`^https?://[^/]+/$`).
pub fn is_site_url(value: &str) -> bool {
    let Some(rest) = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
    else {
        return false;
    };

    match rest.strip_suffix('/') {
        Some(host) => !host.is_empty() && !host.contains('/'),
        None => false,
    }
}

fn parse_entries(contents: &str) -> Result<Vec<(String, Value)>, SettingsError> {
    let root: Value = serde_yaml::from_str(&quote_numeric_keys(contents))?;
    let mapping = match root {
        Value::Mapping(mapping) => mapping,
        Value::Null => Mapping::new(),
        _ => return Err(SettingsError::NotAMapping),
    };

    let mut entries = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let Value::String(site) = key else {
            return Err(SettingsError::InvalidSiteKey(
                serde_yaml::to_string(&key)
                    .map(|text| text.trim_end().to_string())
                    .unwrap_or_else(|_| "<unprintable>".to_string()),
            ));
        };

        if site != DEFAULT_SITE && !is_site_url(&site) {
            return Err(SettingsError::InvalidSiteUrl(site));
        }

        // An empty block (`https://host/:` with nothing below it) has no overrides.
        let value = match value {
            Value::Null => Value::Mapping(Mapping::new()),
            other => other,
        };
        entries.push((site, value));
    }

    Ok(entries)
}

fn validate_entries(entries: &[(String, Value)]) -> Result<Vec<SchemaViolation>, SettingsError> {
    let mut violations = Vec::new();
    for (site, value) in entries {
        match serde_json::to_value(value) {
            Ok(json) => violations.extend(validate_site(site, &json)?),
            Err(e) => violations.push(SchemaViolation {
                site: site.clone(),
                message: format!("not representable as JSON: {e}"),
            }),
        }
    }
    Ok(violations)
}

/// Quote block-style `key:` values made of digits only.
///
/// API keys are hex, so a key can be all digits. Read as a YAML integer it
/// would lose leading zeros, and one beyond 128 bits does not parse at all.
fn quote_numeric_keys(contents: &str) -> Cow<'_, str> {
    let mut changed = false;
    let mut output = String::with_capacity(contents.len() + 16);

    for line in contents.split_inclusive('\n') {
        match quoted_key_line(line) {
            Some(quoted) => {
                output.push_str(&quoted);
                changed = true;
            }
            None => output.push_str(line),
        }
    }

    if changed {
        Cow::Owned(output)
    } else {
        Cow::Borrowed(contents)
    }
}

fn quoted_key_line(line: &str) -> Option<String> {
    let body = line.trim_end_matches(['\n', '\r']);
    let ending = &line[body.len()..];

    let indent_len = body.len() - body.trim_start_matches(' ').len();
    let (indent, rest) = body.split_at(indent_len);
    let value = rest.strip_prefix("key:")?;
    if !value.starts_with([' ', '\t']) {
        return None;
    }

    let (value, comment) = match value.find(" #") {
        Some(at) => value.split_at(at),
        None => (value, ""),
    };
    let digits = value.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(format!("{indent}key: \"{digits}\"{comment}{ending}"))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_text(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a string or number")),
    }
}

fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|(name, value)| match scalar_text(&value) {
            Some(text) => Ok((name, text)),
            None => Err(D::Error::custom(format!(
                "parameter '{name}' must be a string, number or boolean"
            ))),
        })
        .collect()
}
