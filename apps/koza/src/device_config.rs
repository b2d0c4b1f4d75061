//! # Device Configuration File
//!
//! Loads and saves `DeviceConfig` as TOML. A missing file is not an error: the
//! built-in defaults are used and the file is created on the first save.
//!
//! ```toml
//! active_stage = "larva_4"
//!
//! [auto_stage]
//! enabled = true
//! start_stage = "larva_1"
//! start_at = "2026-03-01T00:00:00Z"
//!
//! [stages.larva_4]
//! t_min = 23.0
//! t_max = 25.0
//! ...
//! ```

use koza_core::{DeviceConfig, KozaError};
use std::path::Path;

/// Parse a TOML document. Missing stages are filled from the defaults and
/// every band is validated.
pub fn parse_device_config(content: &str) -> Result<DeviceConfig, KozaError> {
    let config: DeviceConfig = toml::from_str(content)
        .map_err(|e| KozaError::ConfigError(format!("Invalid TOML: {}", e)))?;
    let config = config.with_defaults();
    config.validate()?;
    Ok(config)
}

/// Render a configuration as TOML.
pub fn render_device_config(config: &DeviceConfig) -> Result<String, KozaError> {
    toml::to_string(config).map_err(|e| KozaError::SerializationError(e.to_string()))
}

/// Load the configuration at `path`, or the defaults if it does not exist.
pub fn load_device_config(path: &Path) -> Result<DeviceConfig, KozaError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "device config not found, using defaults");
        return Ok(DeviceConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        KozaError::IoError(format!("Cannot read '{}': {}", path.display(), e))
    })?;
    parse_device_config(&content)
}

/// Validate and write a configuration to `path`.
///
/// The document is written to a sibling temp file first and renamed into
/// place, so a crash never leaves a half-written config behind.
pub fn save_device_config(path: &Path, config: &DeviceConfig) -> Result<(), KozaError> {
    config.validate()?;
    let rendered = render_device_config(config)?;

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, rendered)
        .map_err(|e| KozaError::IoError(format!("Write '{}': {}", tmp.display(), e)))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| KozaError::IoError(format!("Rename to '{}': {}", path.display(), e)))?;

    tracing::info!(path = %path.display(), "device config saved");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
