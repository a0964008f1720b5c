//! User configuration.
//!
//! Read from `<config dir>/filetags/config.toml`.
//! Every key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{UntaggedPolicy, DEFAULT_TAGTREES_MAXDEPTH};

const APP_DIR: &str = "filetags";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_TAGTREES_DIR: &str = ".filetags_tagfilter";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read `{}`: {1}", .0.display())]
    Read(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse `{}`: {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where tag trees are generated.
    /// Defaults to a directory in the home directory.
    pub tagtrees_dir: Option<PathBuf>,
    pub tagtrees_depth: usize,
    pub hardlinks: bool,
    /// `treeroot`,
    /// `ignore`,
    /// or the name of a subdirectory.
    pub untagged: UntaggedPolicy,
    pub link_missing_mutual: bool,
    pub recursive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tagtrees_dir: None,
            tagtrees_depth: DEFAULT_TAGTREES_MAXDEPTH,
            hardlinks: false,
            untagged: UntaggedPolicy::default(),
            link_missing_mutual: false,
            recursive: false,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load `path`,
    /// or the default configuration file if it exists.
    ///
    /// A missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::read(&path),
                _ => {
                    debug!("No configuration file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_owned(), e))?;
        let config = Self::parse(&content).map_err(|e| ConfigError::Parse(path.to_owned(), e))?;
        debug!("Loaded configuration from `{}`", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn tagtrees_dir(&self) -> PathBuf {
        self.tagtrees_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_default()
                .join(DEFAULT_TAGTREES_DIR)
        })
    }
}
