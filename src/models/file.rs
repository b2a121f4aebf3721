use std::path::Path;

use super::{Config, ConfigError};

pub trait ConfigExt {
    fn to_string(&self) -> Result<String, toml::ser::Error>;
}

impl ConfigExt for Config {
    fn to_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Config {
    /// Load the configuration file at `path`
    ///
    /// Files with a `.toml` extension are read as TOML, anything else as JSON.
    #[instrument]
    pub async fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let full = tokio::fs::read_to_string(path).await?;

        let config = match path.extension().and_then(std::ffi::OsStr::to_str) {
            Some("toml") => Self::from_toml_str(&full)?,
            _ => Self::from_json_str(&full)?,
        };

        info!(
            pixels = config.common.pixel_count(),
            equipments = config.equipments.len(),
            rack_units = config.rack_units.len(),
            "loaded configuration"
        );

        Ok(config)
    }
}
