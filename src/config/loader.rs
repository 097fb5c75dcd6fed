/// Configuration loading from TOML file
use std::path::Path;

use crate::error::{Result, TimeError};
use crate::types::Settings;

/// Prefix for environment overrides, e.g. `TRADECLOCK__WRAP_MODE=overnight`
pub const ENV_PREFIX: &str = "TRADECLOCK";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TimeError::ConfigError(format!("Failed to read config file: {}", e)))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(content)
        .map_err(|e| TimeError::ConfigError(format!("Failed to parse config: {}", e)))?;

    validate_config(&settings)?;

    Ok(settings)
}

/// Load the file, then apply `TRADECLOCK__*` environment overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let settings: Settings = ::config::Config::builder()
        .add_source(::config::File::from(path.as_ref()))
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .and_then(|layered| layered.try_deserialize())
        .map_err(|e| TimeError::ConfigError(format!("Failed to load config: {}", e)))?;

    validate_config(&settings)?;

    Ok(settings)
}

fn validate_config(settings: &Settings) -> Result<()> {
    if settings.log_level.trim().is_empty() {
        return Err(TimeError::ConfigError("log_level is empty".to_string()));
    }

    // Timezones must be canonical names
    settings
        .default_timezone()
        .map_err(|e| TimeError::ConfigError(format!("Invalid default_timezone: {}", e)))?;
    settings
        .epoch_timezone()
        .map_err(|e| TimeError::ConfigError(format!("Invalid epoch_timezone: {}", e)))?;

    // Window bounds must parse
    settings
        .window()
        .map_err(|e| TimeError::ConfigError(format!("Invalid window: {}", e)))?;

    Ok(())
}
