//! Sites command.

use anyhow::Result;
use boatload_client::ApiVersion;
use boatload_settings::{SettingsDocument, SiteKeys};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::print_output;

use super::CommandContext;

/// List sites and their resolved settings.
#[derive(Debug, Args)]
pub struct SitesCommand {}

#[derive(Debug, Clone, Serialize, Tabled)]
struct SiteRow {
    #[tabled(rename = "Site")]
    site: String,

    #[tabled(rename = "Remote")]
    remote_site: String,

    #[tabled(rename = "API")]
    api_version: String,

    #[tabled(rename = "Instance")]
    instance: String,

    #[tabled(rename = "Params")]
    params: String,
}

impl SitesCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let document = ctx.load_settings()?;
        print_output(&site_rows(&document), ctx.format);
        Ok(())
    }
}

fn site_rows(document: &SettingsDocument) -> Vec<SiteRow> {
    let keys = SiteKeys::from_document(document);

    document
        .site_ids()
        .into_iter()
        .map(|site| {
            let resolved = document.resolve(&site);
            let remote_site = resolved.remote_site().to_string();
            let has_key = keys.api_key(&site, &remote_site).is_some();

            SiteRow {
                api_version: if has_key {
                    ApiVersion::V2
                } else {
                    ApiVersion::V1
                }
                .to_string(),
                instance: resolved.instance.clone().unwrap_or_else(|| "-".to_string()),
                params: resolved
                    .params
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
                remote_site,
                site,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_rows() {
        let document = SettingsDocument::from_yaml_str(
            r#"
default:
  params:
    AGENT_TAG: latest
  instance: gros-agent
https://a.example/:
  key: abc
https://b.example/:
  v1: true
  remote_site: https://a.example/
  params:
    JIRA_URL: https://jira.example/
"#,
        )
        .unwrap();

        let rows = site_rows(&document);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].site, "https://a.example/");
        assert_eq!(rows[0].api_version, "v2");
        assert_eq!(rows[0].instance, "gros-agent");
        assert_eq!(rows[0].params, "AGENT_TAG");

        // The remote site's key is used for a v1 site behind it.
        assert_eq!(rows[1].remote_site, "https://a.example/");
        assert_eq!(rows[1].api_version, "v2");
        assert_eq!(rows[1].params, "AGENT_TAG, JIRA_URL");
    }

    #[test]
    fn test_site_without_key_is_v1() {
        let document =
            SettingsDocument::from_yaml_str("https://a.example/:\n  params: {}\n").unwrap();
        let rows = site_rows(&document);
        assert_eq!(rows[0].api_version, "v1");
        assert_eq!(rows[0].instance, "-");
    }
}
