//! Upload command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use boatload_settings::{is_site_url, SettingsDocument, SiteKeys};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tracing::{info, warn};

use crate::config::UploadConfig;
use crate::error::CliError;
use crate::output::{print_output, print_receipt, OutputFormat, Receipt};
use crate::uploader::{
    UploadOptions, UploadPlan, Uploader, DEFAULT_APP_NAME, DEFAULT_APP_VERSION,
};

use super::CommandContext;

/// Upload compose files to BigBoat dashboards.
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Sites to upload to. Defaults to every site in the settings file.
    #[arg(value_name = "SITE")]
    sites: Vec<String>,

    /// API keys for the given sites, in the same order.
    #[arg(long, num_args = 1.., value_name = "KEY")]
    keys: Vec<String>,

    /// Application name.
    #[arg(long, default_value = DEFAULT_APP_NAME)]
    name: String,

    /// Application version.
    #[arg(long = "version", default_value = DEFAULT_APP_VERSION)]
    app_version: String,

    /// Instance to (re)start. Defaults to the site's `instance`, then the app name.
    #[arg(long)]
    instance: Option<String>,

    /// Directory with docker-compose.yml and bigboat-compose.yml.
    #[arg(long, env = "BOATLOAD_COMPOSE_DIR", default_value = ".", value_name = "DIR")]
    compose: PathBuf,

    /// Start the instance after uploading.
    #[arg(long)]
    start: bool,

    /// Do not stop a running instance before starting.
    #[arg(long)]
    no_stop: bool,

    /// Upload the templates without rendering the placeholders.
    #[arg(long)]
    raw: bool,

    /// Show what would be uploaded without contacting any dashboard.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct PlanRow {
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Remote")]
    remote_site: String,
    #[tabled(rename = "App")]
    app: String,
    #[tabled(rename = "Files")]
    files: String,
    #[tabled(rename = "Instance")]
    instance: String,
}

impl From<&UploadPlan> for PlanRow {
    fn from(plan: &UploadPlan) -> Self {
        Self {
            site: plan.site.clone(),
            remote_site: plan.remote_site.clone(),
            app: format!("{}:{}", plan.app, plan.version),
            files: plan
                .files
                .iter()
                .map(|file| format!("{} ({} bytes)", file.file, file.bytes))
                .collect::<Vec<_>>()
                .join(", "),
            instance: match (&plan.instance, plan.stop) {
                (Some(instance), true) => format!("{instance} (restart)"),
                (Some(instance), false) => instance.clone(),
                (None, _) => "-".to_string(),
            },
        }
    }
}

/// Outcome for one site.
#[derive(Debug, Serialize)]
struct SiteResult {
    site: String,
    remote_site: String,
    app: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<boatload_client::Instance>,
}

impl UploadCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let document = ctx.load_settings()?;
        let sites = self.selected_sites(&document)?;
        let keys = self.site_keys(&document);
        let options = self.options(UploadConfig::from_env()?);

        if self.dry_run {
            let plans = plan_sites(&document, &keys, &options, &sites)?;
            match ctx.format {
                OutputFormat::Json => crate::output::print_single(&plans),
                OutputFormat::Table => {
                    let rows: Vec<PlanRow> = plans.iter().map(PlanRow::from).collect();
                    print_output(&rows, OutputFormat::Table);
                }
            }
            return Ok(());
        }

        for site in &sites {
            let result = upload_site(&document, &keys, &options, site)
                .await
                .with_context(|| format!("Upload to {site} failed"))?;
            print_site_result(ctx.format, &result);
        }

        Ok(())
    }

    /// Sites to touch, in command-line order or document order.
    fn selected_sites(&self, document: &SettingsDocument) -> Result<Vec<String>> {
        if self.sites.is_empty() {
            if !self.keys.is_empty() {
                warn!("API keys given without sites; ignoring --keys");
            }
            return Ok(document.site_ids());
        }

        for site in &self.sites {
            if !is_site_url(site) {
                return Err(CliError::InvalidSite(site.clone()).into());
            }
            if !document.contains(site) {
                warn!(site = %site, "Site is not in the settings file; using default settings");
            }
        }
        Ok(self.sites.clone())
    }

    fn site_keys(&self, document: &SettingsDocument) -> SiteKeys {
        let mut keys = SiteKeys::from_document(document);
        if !self.sites.is_empty() {
            keys.override_with(&self.sites, &self.keys);
        }
        keys
    }

    fn options(&self, config: UploadConfig) -> UploadOptions {
        UploadOptions {
            name: self.name.clone(),
            version: self.app_version.clone(),
            instance: self.instance.clone(),
            compose_dir: self.compose.clone(),
            start: self.start,
            stop: !self.no_stop,
            raw: self.raw,
            config,
        }
    }
}

fn plan_sites(
    document: &SettingsDocument,
    keys: &SiteKeys,
    options: &UploadOptions,
    sites: &[String],
) -> Result<Vec<UploadPlan>> {
    sites
        .iter()
        .map(|site| {
            Uploader::new(document.resolve(site), keys, options)?
                .plan()
                .with_context(|| format!("Cannot plan upload to {site}"))
        })
        .collect()
}

async fn upload_site(
    document: &SettingsDocument,
    keys: &SiteKeys,
    options: &UploadOptions,
    site: &str,
) -> Result<SiteResult> {
    let resolved = document.resolve(site);
    let remote_site = resolved.remote_site().to_string();
    let uploader = Uploader::new(resolved, keys, options)?;

    uploader.upload().await?;
    info!(site = %site, app = %options.name, version = %options.version, "Uploaded compose files");

    let instance = if options.start {
        Some(uploader.start().await?)
    } else {
        None
    };

    Ok(SiteResult {
        site: site.to_string(),
        remote_site,
        app: options.name.clone(),
        version: options.version.clone(),
        instance,
    })
}

fn print_site_result(format: OutputFormat, result: &SiteResult) {
    let (status, message) = match &result.instance {
        Some(instance) => (
            "started",
            format!(
                "Uploaded {}:{} to {} and started {}",
                result.app, result.version, result.remote_site, instance.name
            ),
        ),
        None => (
            "uploaded",
            format!(
                "Uploaded {}:{} to {}",
                result.app, result.version, result.remote_site
            ),
        ),
    };

    print_receipt(
        format,
        Receipt {
            message,
            status,
            kind: "upload",
            resource_key: "result",
            resource: result,
            ids: serde_json::json!({
                "site": result.site,
                "remote_site": result.remote_site,
                "app": result.app,
                "version": result.version,
            }),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::commands::Cli;

    fn parse(args: &[&str]) -> UploadCommand {
        let cli = Cli::try_parse_from(std::iter::once("boatload").chain(args.iter().copied()))
            .unwrap();
        match cli.command {
            super::super::Commands::Upload(cmd) => cmd,
            other => panic!("expected upload, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let cmd = parse(&["upload"]);
        assert_eq!(cmd.name, "gros-data-gathering-agent");
        assert_eq!(cmd.app_version, "2");
        assert!(!cmd.start);
        assert!(!cmd.no_stop);
        assert!(cmd.sites.is_empty());
    }

    #[test]
    fn test_sites_and_keys() {
        let cmd = parse(&[
            "upload",
            "https://a.example/",
            "https://b.example/",
            "--keys",
            "aaa",
            "bbb",
            "--version",
            "3",
            "--start",
            "--no-stop",
        ]);
        assert_eq!(cmd.sites, vec!["https://a.example/", "https://b.example/"]);
        assert_eq!(cmd.keys, vec!["aaa", "bbb"]);
        assert_eq!(cmd.app_version, "3");
        assert!(cmd.start && cmd.no_stop);
    }

    #[test]
    fn test_invalid_site_is_rejected() {
        let document = SettingsDocument::from_yaml_str("").unwrap();
        let cmd = parse(&["upload", "a.example"]);
        let err = cmd.selected_sites(&document).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidSite(_))
        ));
    }

    #[test]
    fn test_all_sites_in_document_order() {
        let document = SettingsDocument::from_yaml_str(
            "default:\n  params: {}\nhttps://b.example/:\n  key: bb\nhttps://a.example/:\n  key: aa\n",
        )
        .unwrap();
        let cmd = parse(&["upload"]);
        assert_eq!(
            cmd.selected_sites(&document).unwrap(),
            vec!["https://b.example/", "https://a.example/"]
        );
    }

    #[test]
    fn test_command_line_keys_override_settings() {
        let document =
            SettingsDocument::from_yaml_str("https://a.example/:\n  key: aa\n").unwrap();
        let cmd = parse(&["upload", "https://a.example/", "--keys", "ff"]);
        assert_eq!(cmd.site_keys(&document).get("https://a.example/"), Some("ff"));
    }

    #[tokio::test]
    async fn test_only_selected_sites_are_touched() {
        let touched = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/api/v2/apps/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&touched)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&touched)
            .await;

        let untouched = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&untouched)
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "image: {{TAG}}\n").unwrap();
        std::fs::write(dir.path().join("bigboat-compose.yml"), "name: x\n").unwrap();

        let document = SettingsDocument::from_yaml_str(&format!(
            "default:\n  params:\n    TAG: latest\n\
             https://a.example/:\n  key: aa\n  remote_site: {}/\n\
             https://b.example/:\n  key: bb\n  remote_site: {}/\n",
            touched.uri(),
            untouched.uri()
        ))
        .unwrap();

        let cmd = parse(&["upload", "https://a.example/"]);
        let options = UploadOptions {
            compose_dir: dir.path().to_path_buf(),
            ..cmd.options(UploadConfig::default())
        };
        let keys = cmd.site_keys(&document);

        for site in cmd.selected_sites(&document).unwrap() {
            upload_site(&document, &keys, &options, &site).await.unwrap();
        }
    }

    #[test]
    fn test_dry_run_plans_without_requests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "image: {{TAG}}\n").unwrap();
        std::fs::write(dir.path().join("bigboat-compose.yml"), "name: x\n").unwrap();

        // Port 9 (discard) would refuse any request that slipped through.
        let document = SettingsDocument::from_yaml_str(
            "default:\n  params:\n    TAG: latest\n\
             https://a.example/:\n  key: aa\n  remote_site: http://127.0.0.1:9/\n",
        )
        .unwrap();
        let keys = SiteKeys::from_document(&document);
        let options = UploadOptions {
            name: "agent".to_string(),
            version: "2".to_string(),
            instance: None,
            compose_dir: dir.path().to_path_buf(),
            start: true,
            stop: true,
            raw: false,
            config: UploadConfig::default(),
        };

        let plans = plan_sites(&document, &keys, &options, &document.site_ids()).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].instance.as_deref(), Some("agent"));

        let row = PlanRow::from(&plans[0]);
        assert_eq!(row.app, "agent:2");
        assert_eq!(row.instance, "agent (restart)");
        assert!(row.files.starts_with("docker-compose.yml (14 bytes)"));
    }
}
