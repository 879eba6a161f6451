//! XDG path resolution for tiller configuration and data directories.

use anyhow::Result;
use std::path::PathBuf;

use super::types::Config;

impl Config {
    /// Returns `~/.config/tiller/` on Linux (`XDG_CONFIG_HOME/tiller`).
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join(crate::constants::APP_NAME);
        Ok(dir)
    }

    /// Returns `~/.local/share/tiller/` on Linux (`XDG_DATA_HOME/tiller`).
    ///
    /// Holds the transcript log.
    pub fn data_dir() -> Result<PathBuf> {
        let dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
            .join(crate::constants::APP_NAME);
        Ok(dir)
    }

    /// Returns `~/.config/tiller/config.toml` on Linux.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(crate::constants::CONFIG_FILENAME))
    }

    /// Default transcript location under the data directory.
    pub fn default_log_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join(crate::constants::TRANSCRIPT_FILENAME))
    }
}
