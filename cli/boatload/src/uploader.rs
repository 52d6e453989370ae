//! Per-site upload and restart flow.
//!
//! For one site:
//! 1. Render the compose templates with the merged site parameters
//! 2. Make sure the application version is registered
//! 3. Upload both compose files
//! 4. Optionally stop the old instance and start a new one

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use boatload_client::{ApiVersion, Client, ComposeFile, Instance};
use boatload_settings::{render, ResolvedSite, SiteKeys};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::UploadConfig;
use crate::error::CliError;

/// Default application name.
pub const DEFAULT_APP_NAME: &str = "gros-data-gathering-agent";

/// Default application version.
pub const DEFAULT_APP_VERSION: &str = "2";

/// Options shared by every site of one run.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub name: String,
    pub version: String,
    pub instance: Option<String>,
    pub compose_dir: PathBuf,
    pub start: bool,
    pub stop: bool,
    pub raw: bool,
    pub config: UploadConfig,
}

/// What a run would do for one site.
#[derive(Debug, Clone, Serialize)]
pub struct UploadPlan {
    pub site: String,
    pub remote_site: String,
    pub api_version: String,
    pub app: String,
    pub version: String,
    pub files: Vec<PlannedFile>,
    pub start: bool,
    pub stop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
}

/// A compose file that would be uploaded.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedFile {
    pub file: String,
    pub api_name: String,
    pub bytes: usize,
    pub rendered: bool,
}

/// Uploads compose files to one site.
pub struct Uploader<'a> {
    site: ResolvedSite,
    site_key: Option<String>,
    client: Client,
    options: &'a UploadOptions,
}

impl<'a> Uploader<'a> {
    /// Set up the API client for a site.
    ///
    /// Requests go to the site's `remote_site`, authenticated with the key of
    /// the remote site, or of the site itself when the remote has none.
    pub fn new(site: ResolvedSite, keys: &SiteKeys, options: &'a UploadOptions) -> Result<Self> {
        let remote = site.remote_site().to_string();
        let site_key = keys.get(&site.site).map(str::to_string);
        // A keyless remote borrows the site's key instead of falling back to v1.
        let api_key = keys.api_key(&site.site, &remote);

        info!(site = %site.site, remote_site = %remote, "Setting up API");
        let client = Client::with_timeout(&remote, api_key, options.config.request_timeout)
            .with_context(|| format!("Cannot set up API for {remote}"))?;

        Ok(Self {
            site,
            site_key,
            client,
            options,
        })
    }

    /// Name of the instance to (re)start.
    pub fn instance_name(&self) -> &str {
        self.options
            .instance
            .as_deref()
            .or(self.site.instance.as_deref())
            .unwrap_or(&self.options.name)
    }

    /// Parameters for rendering and for the started instance.
    pub fn parameters(&self) -> BTreeMap<String, String> {
        self.site.instance_parameters(self.site_key.as_deref())
    }

    /// Read the compose files and render them for this site.
    pub fn compose_files(&self) -> Result<Vec<(ComposeFile, String)>> {
        let parameters = self.parameters();

        ComposeFile::ALL
            .into_iter()
            .map(|file| {
                let path = self.options.compose_dir.join(file.file_name());
                let template = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read compose file {}", path.display()))?;

                if self.options.raw {
                    return Ok((file, template));
                }

                let rendered = render(&template, &parameters).map_err(|source| {
                    CliError::Template {
                        site: self.site.site.clone(),
                        file: file.file_name().to_string(),
                        source,
                    }
                })?;
                Ok((file, rendered))
            })
            .collect()
    }

    /// Describe the run for this site without calling the API.
    pub fn plan(&self) -> Result<UploadPlan> {
        self.require_v2()?;
        let files = self
            .compose_files()?
            .into_iter()
            .map(|(file, content)| PlannedFile {
                file: file.file_name().to_string(),
                api_name: file.api_name().to_string(),
                bytes: content.len(),
                rendered: !self.options.raw,
            })
            .collect();

        Ok(UploadPlan {
            site: self.site.site.clone(),
            remote_site: self.client.site().to_string(),
            api_version: self.client.api_version().to_string(),
            app: self.options.name.clone(),
            version: self.options.version.clone(),
            files,
            start: self.options.start,
            stop: self.options.start && self.options.stop,
            instance: self
                .options
                .start
                .then(|| self.instance_name().to_string()),
            parameters: self
                .options
                .start
                .then(|| self.parameters().into_keys().collect()),
        })
    }

    /// Register the application version and upload the compose files.
    pub async fn upload(&self) -> Result<()> {
        self.require_v2()?;

        // Render everything before the first request, so a missing
        // parameter leaves the dashboard untouched.
        let files = self.compose_files()?;

        let name = &self.options.name;
        let version = &self.options.version;
        let remote = self.client.site();

        if self.client.get_app(name, version).await?.is_none() {
            warn!(
                app = %name,
                version = %version,
                remote_site = %remote,
                "Application version is not on the dashboard, creating"
            );
            self.client
                .update_app(name, version)
                .await
                .with_context(|| format!("Cannot register application on {remote}"))?;
        }

        for (file, content) in files {
            self.client
                .update_compose(name, version, file, &content)
                .await
                .with_context(|| format!("Cannot update {file} on {remote}"))?;
            info!(file = %file, remote_site = %remote, "Uploaded compose file");
        }

        Ok(())
    }

    /// Request that the instance is (re)started with the site parameters.
    pub async fn start(&self) -> Result<Instance> {
        self.require_v2()?;

        let instance_name = self.instance_name();
        let remote = self.client.site();

        if self.options.stop {
            self.wait_for_removal(instance_name).await?;
        }

        let instance = self
            .client
            .update_instance(
                instance_name,
                &self.options.name,
                &self.options.version,
                &self.parameters(),
            )
            .await
            .with_context(|| format!("Could not start instance on {remote}"))?;

        info!(
            app = %self.options.name,
            version = %self.options.version,
            instance = %instance_name,
            remote_site = %remote,
            "Started application"
        );
        Ok(instance)
    }

    /// Delete an existing instance and poll until the dashboard drops it.
    async fn wait_for_removal(&self, instance_name: &str) -> Result<()> {
        let started = Instant::now();
        let mut deleted = false;

        while self.client.get_instance(instance_name).await?.is_some() {
            if !deleted {
                self.client.delete_instance(instance_name).await?;
                info!(instance = %instance_name, "Waiting for old instance to be removed");
                deleted = true;
            }

            let waited = started.elapsed();
            if waited >= self.options.config.restart_timeout {
                return Err(CliError::RestartTimeout {
                    site: self.client.site().to_string(),
                    instance: instance_name.to_string(),
                    waited_secs: waited.as_secs(),
                }
                .into());
            }

            tokio::time::sleep(self.options.config.restart_poll).await;
        }

        Ok(())
    }

    fn require_v2(&self) -> Result<()> {
        match self.client.api_version() {
            ApiVersion::V2 => Ok(()),
            ApiVersion::V1 => Err(CliError::V1Only {
                site: self.client.site().to_string(),
            }
            .into()),
        }
    }
}
