//! INI configuration, read from `~/.fillaridata/main.conf` by default.
//!
//! The only key the pipeline itself needs is the FMI API key:
//!
//! ```ini
//! [FMI]
//! api_key = 00000000-0000-0000-0000-000000000000
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration")]
    Read(#[from] config::ConfigError),
}

/// Settings loaded from an INI file. A missing file yields an empty
/// configuration rather than an error, so first runs work without any setup.
pub struct Config {
    settings: config::Config,
}

impl Config {
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Ini)
                    .required(false),
            )
            .build()?;
        Ok(Self { settings })
    }

    /// Value of `key` under `[section]`, if the file defines it.
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.settings.get_string(&format!("{section}.{key}")).ok()
    }

    pub fn fmi_api_key(&self) -> Option<String> {
        self.get("FMI", "api_key")
    }

    /// `~/.fillaridata/main.conf`, when a home directory can be resolved.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".fillaridata").join("main.conf"))
    }
}
