use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration: where the pulse data lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory, creating it when missing.
    ///
    /// Falls back to the platform config directory when no explicit path
    /// is given.
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => dirs::config_dir()
                .context("Could not find config directory")?
                .join("pulse"),
        };

        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        }

        Ok(Config { data_dir })
    }

    pub fn db_file(&self) -> PathBuf {
        self.data_dir.join("pulse.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_data_dir() {
        let dir = std::env::temp_dir().join("pulse-config-test");
        let config = Config::new(Some(dir.clone())).unwrap();

        assert_eq!(config.data_dir, dir);
        assert!(dir.exists());
        assert_eq!(config.db_file(), dir.join("pulse.db"));

        std::fs::remove_dir_all(dir).ok();
    }
}
