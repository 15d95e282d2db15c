//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Loads and validates a `kiln.toml` configuration from a project directory.
///
/// Reads `<project_dir>/kiln.toml`, parses it, and validates the result.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join("kiln.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    for (value, field) in [
        (&config.site.pages, "site.pages"),
        (&config.site.output, "site.output"),
        (&config.site.page_ext, "site.page_ext"),
        (&config.site.output_ext, "site.output_ext"),
        (&config.site.cache, "site.cache"),
    ] {
        if value.is_empty() {
            return Err(ConfigError::MissingField(field.to_string()));
        }
    }
    for (value, field) in [
        (&config.site.page_ext, "site.page_ext"),
        (&config.site.output_ext, "site.output_ext"),
    ] {
        if value.starts_with('.') {
            return Err(ConfigError::ValidationError(format!(
                "{field} is written without the leading dot"
            )));
        }
    }
    if let Some(render) = &config.render {
        if render.command.is_empty() {
            return Err(ConfigError::MissingField("render.command".to_string()));
        }
    }
    if config.imports.keys().any(|key| key.is_empty()) {
        return Err(ConfigError::ValidationError(
            "import map keys must be non-empty".to_string(),
        ));
    }
    Ok(())
}
