//! Merging the default block into site settings.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::document::SiteSettings;

/// Instance parameter carrying the public site URL.
pub const HOST_PARAM: &str = "BIGBOAT_HOST";

/// Instance parameter carrying the site API key.
pub const KEY_PARAM: &str = "BIGBOAT_KEY";

/// Value of [`KEY_PARAM`] when the site has no API key.
pub const MISSING_KEY: &str = "-";

/// Settings of a site after merging in the default block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedSite {
    /// Public site URL.
    pub site: String,

    /// URL to send API requests to, if not the site URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_site: Option<String>,

    /// Configured instance name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Merged parameters.
    pub params: BTreeMap<String, String>,
}

impl ResolvedSite {
    /// URL that API requests for this site are sent to.
    pub fn remote_site(&self) -> &str {
        self.remote_site.as_deref().unwrap_or(&self.site)
    }

    /// Parameters passed to a started instance and used to render templates.
    ///
    /// Site parameters take precedence over the host and key entries.
    pub fn instance_parameters(&self, key: Option<&str>) -> BTreeMap<String, String> {
        let mut parameters = BTreeMap::new();
        parameters.insert(HOST_PARAM.to_string(), self.site.clone());
        parameters.insert(
            KEY_PARAM.to_string(),
            key.unwrap_or(MISSING_KEY).to_string(),
        );
        parameters.extend(
            self.params
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        parameters
    }
}

/// Merge default settings with the overrides of one site.
///
/// `params` are merged one level deep with site values winning. Scalar
/// options fall back to the default block. `key` and `v1` are never
/// inherited; they are resolved through [`crate::SiteKeys`].
pub fn merge_site(
    site: &str,
    defaults: &SiteSettings,
    overrides: Option<&SiteSettings>,
) -> ResolvedSite {
    let mut params = defaults.params.clone();
    let mut remote_site = defaults.remote_site.clone();
    let mut instance = defaults.instance.clone();

    if let Some(overrides) = overrides {
        params.extend(
            overrides
                .params
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        if overrides.remote_site.is_some() {
            remote_site = overrides.remote_site.clone();
        }
        if overrides.instance.is_some() {
            instance = overrides.instance.clone();
        }
    }

    ResolvedSite {
        site: site.to_string(),
        remote_site,
        instance,
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::SettingsDocument;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn settings(pairs: &[(&str, &str)]) -> SiteSettings {
        SiteSettings {
            params: params(pairs),
            ..SiteSettings::default()
        }
    }

    #[rstest]
    #[case(&[], &[], &[])]
    #[case(&[("A", "1")], &[], &[("A", "1")])]
    #[case(&[], &[("A", "2")], &[("A", "2")])]
    #[case(&[("A", "1"), ("B", "1")], &[("B", "2")], &[("A", "1"), ("B", "2")])]
    #[case(&[("A", "1")], &[("C", "3")], &[("A", "1"), ("C", "3")])]
    fn test_params_override_per_key(
        #[case] default_params: &[(&str, &str)],
        #[case] site_params: &[(&str, &str)],
        #[case] expected: &[(&str, &str)],
    ) {
        let resolved = merge_site(
            "https://a.example/",
            &settings(default_params),
            Some(&settings(site_params)),
        );
        assert_eq!(resolved.params, params(expected));
    }

    #[test]
    fn test_absent_site_resolves_to_defaults() {
        let defaults = SiteSettings {
            params: params(&[("A", "1")]),
            instance: Some("agent".to_string()),
            ..SiteSettings::default()
        };
        let resolved = merge_site("https://new.example/", &defaults, None);
        assert_eq!(resolved.site, "https://new.example/");
        assert_eq!(resolved.params, params(&[("A", "1")]));
        assert_eq!(resolved.instance.as_deref(), Some("agent"));
        assert_eq!(resolved.remote_site(), "https://new.example/");
    }

    #[test]
    fn test_scalar_options_fall_back_to_defaults() {
        let defaults = SiteSettings {
            remote_site: Some("http://proxy.example/".to_string()),
            instance: Some("default-agent".to_string()),
            ..SiteSettings::default()
        };
        let overrides = SiteSettings {
            instance: Some("site-agent".to_string()),
            ..SiteSettings::default()
        };

        let resolved = merge_site("https://a.example/", &defaults, Some(&overrides));
        assert_eq!(resolved.instance.as_deref(), Some("site-agent"));
        assert_eq!(resolved.remote_site(), "http://proxy.example/");
    }

    #[test]
    fn test_every_site_gets_default_params() {
        let doc = SettingsDocument::from_yaml_str(
            r#"
default:
  params:
    SHARED: base
    LEVEL: info
https://a.example/:
  params:
    LEVEL: debug
https://b.example/:
  key: abc
"#,
        )
        .unwrap();

        for site in doc.site_ids() {
            let resolved = doc.resolve(&site);
            let own = doc.site(&site).unwrap();
            for (name, value) in &doc.default_settings().params {
                let expected = own.params.get(name).unwrap_or(value);
                assert_eq!(resolved.params.get(name), Some(expected));
            }
            for (name, value) in &own.params {
                assert_eq!(resolved.params.get(name), Some(value));
            }
        }
    }

    #[test]
    fn test_instance_parameters() {
        let resolved = ResolvedSite {
            site: "https://a.example/".to_string(),
            params: params(&[("JIRA_URL", "https://jira.example/")]),
            ..ResolvedSite::default()
        };

        let with_key = resolved.instance_parameters(Some("abc123"));
        assert_eq!(with_key[HOST_PARAM], "https://a.example/");
        assert_eq!(with_key[KEY_PARAM], "abc123");
        assert_eq!(with_key["JIRA_URL"], "https://jira.example/");

        let without_key = resolved.instance_parameters(None);
        assert_eq!(without_key[KEY_PARAM], MISSING_KEY);
    }

    #[test]
    fn test_site_params_win_over_host_and_key() {
        let resolved = ResolvedSite {
            site: "https://a.example/".to_string(),
            params: params(&[(HOST_PARAM, "https://public.example/")]),
            ..ResolvedSite::default()
        };
        let parameters = resolved.instance_parameters(Some("abc"));
        assert_eq!(parameters[HOST_PARAM], "https://public.example/");
    }
}
