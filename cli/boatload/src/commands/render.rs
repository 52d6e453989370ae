//! Render command.
//!
//! Prints a compose template rendered for one site, without contacting
//! the dashboard.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use boatload_client::ComposeFile;
use boatload_settings::{is_site_url, render, SettingsDocument, SiteKeys};
use clap::Args;
use tracing::warn;

use crate::error::CliError;
use crate::output::{print_single, OutputFormat};

use super::CommandContext;

/// Print a compose file rendered for a site.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Site to render for.
    site: String,

    /// Template file name inside the compose directory.
    #[arg(long, default_value = "docker-compose.yml", value_name = "NAME")]
    file: String,

    /// Directory with the compose templates.
    #[arg(long, env = "BOATLOAD_COMPOSE_DIR", default_value = ".", value_name = "DIR")]
    compose: PathBuf,
}

impl RenderCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let document = ctx.load_settings()?;
        let rendered = self.render(&document)?;

        match ctx.format {
            OutputFormat::Json => print_single(&serde_json::json!({
                "site": self.site,
                "file": self.file,
                "content": rendered,
            })),
            OutputFormat::Table => print!("{rendered}"),
        }
        Ok(())
    }

    fn render(&self, document: &SettingsDocument) -> Result<String> {
        if !is_site_url(&self.site) {
            return Err(CliError::InvalidSite(self.site.clone()).into());
        }
        if !document.contains(&self.site) {
            warn!(site = %self.site, "Site is not in the settings file; using default settings");
        }
        if ComposeFile::from_file_name(&self.file).is_none() {
            warn!(file = %self.file, "File is not one of the uploaded compose files");
        }

        let template = read_template(&self.compose.join(&self.file))?;
        let keys = SiteKeys::from_document(document);
        let parameters = document
            .resolve(&self.site)
            .instance_parameters(keys.get(&self.site));

        render(&template, &parameters).map_err(|source| {
            CliError::Template {
                site: self.site.clone(),
                file: self.file.clone(),
                source,
            }
            .into()
        })
    }
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read compose file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use boatload_settings::TemplateError;

    fn command(dir: &Path, site: &str, file: &str) -> RenderCommand {
        RenderCommand {
            site: site.to_string(),
            file: file.to_string(),
            compose: dir.to_path_buf(),
        }
    }

    fn document() -> SettingsDocument {
        SettingsDocument::from_yaml_str(
            "default:\n  params:\n    TAG: latest\nhttps://a.example/:\n  key: abc\n  params:\n    TAG: \"7\"\n",
        )
        .unwrap()
    }

    #[test]
    fn test_render_for_site() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("docker-compose.yml"),
            "image: agent:{{TAG}}\nkey: {{BIGBOAT_KEY}}\nhost: {{BIGBOAT_HOST}}\n",
        )
        .unwrap();

        let rendered = command(dir.path(), "https://a.example/", "docker-compose.yml")
            .render(&document())
            .unwrap();
        assert_eq!(
            rendered,
            "image: agent:7\nkey: abc\nhost: https://a.example/\n"
        );
    }

    #[test]
    fn test_unknown_site_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bigboat-compose.yml"), "{{TAG}} {{BIGBOAT_KEY}}").unwrap();

        let rendered = command(dir.path(), "https://other.example/", "bigboat-compose.yml")
            .render(&document())
            .unwrap();
        assert_eq!(rendered, "latest -");
    }

    #[test]
    fn test_missing_placeholders_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "{{B_VAR}} {{A_VAR}}").unwrap();

        let err = command(dir.path(), "https://a.example/", "docker-compose.yml")
            .render(&document())
            .unwrap_err();
        match err.downcast_ref::<CliError>() {
            Some(CliError::Template {
                source: TemplateError::Unresolved { missing },
                ..
            }) => assert_eq!(missing, &vec!["A_VAR".to_string(), "B_VAR".to_string()]),
            other => panic!("expected template error, got {other:?}"),
        }
    }

    #[test]
    fn test_example_settings_render_shipped_templates() {
        let compose = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../compose");
        let document =
            SettingsDocument::from_yaml_str(include_str!("../../../../compose/settings.example.yml"))
                .unwrap();

        for site in document.site_ids() {
            for file in ComposeFile::ALL {
                let rendered = command(&compose, &site, file.file_name())
                    .render(&document)
                    .unwrap();
                assert!(!rendered.contains("{{"), "{site} {file}: {rendered}");
            }
        }
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = command(dir.path(), "https://a.example/", "docker-compose.yml")
            .render(&document())
            .unwrap_err();
        assert!(err.to_string().contains("docker-compose.yml"));
    }
}
