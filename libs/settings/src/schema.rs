//! JSON Schema validation of site blocks.

use std::sync::OnceLock;

use jsonschema::Validator;

use crate::error::{SchemaViolation, SettingsError};

const SITE_SCHEMA: &str = include_str!("../schema/settings.schema.json");

/// The JSON Schema that every site block (and the default block) must match.
pub fn site_schema() -> &'static str {
    SITE_SCHEMA
}

fn site_validator() -> Result<&'static Validator, SettingsError> {
    static VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema: serde_json::Value =
                serde_json::from_str(SITE_SCHEMA).map_err(|e| e.to_string())?;
            jsonschema::validator_for(&schema).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| SettingsError::SchemaCompile(e.clone()))
}

/// Validate one site block, returning every violation found.
pub fn validate_site(
    site: &str,
    value: &serde_json::Value,
) -> Result<Vec<SchemaViolation>, SettingsError> {
    let validator = site_validator()?;
    Ok(validator
        .iter_errors(value)
        .map(|error| SchemaViolation {
            site: site.to_string(),
            message: error.to_string(),
        })
        .collect())
}
