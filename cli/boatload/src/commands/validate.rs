//! Validate command.
//!
//! Checks the settings file offline and reports every schema violation.

use anyhow::{Context, Result};
use boatload_settings::{site_schema, SchemaViolation, SettingsDocument};
use clap::Args;

use crate::output::{print_info, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Validate the settings file.
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Print the JSON Schema that site blocks must match, and exit.
    #[arg(long)]
    schema: bool,
}

impl ValidateCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        if self.schema {
            println!("{}", site_schema());
            return Ok(());
        }

        let path = &ctx.settings_path;
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;

        let violations = SettingsDocument::check_yaml_str(&contents)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        if !violations.is_empty() {
            report_violations(&violations);
            anyhow::bail!(
                "Settings validation failed ({} error(s))",
                violations.len()
            );
        }

        let document = SettingsDocument::from_yaml_str(&contents)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        let sites = document.site_ids();

        match ctx.format {
            OutputFormat::Json => print_single(&serde_json::json!({
                "valid": true,
                "path": path.display().to_string(),
                "sites": sites,
            })),
            OutputFormat::Table => {
                print_success(&format!("Settings are valid: {}", path.display()));
                print_info(&format!("{} site(s)", sites.len()));
            }
        }

        Ok(())
    }
}

fn report_violations(violations: &[SchemaViolation]) {
    for violation in violations {
        println!("invalid: {violation}");
    }
}
