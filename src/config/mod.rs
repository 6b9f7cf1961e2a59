pub mod polling;
mod raw;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use self::polling::PollingConfig;
use self::raw::RawConfig;
use crate::kubernetes_objects::{
    DEFAULT_CONTAINER, DEFAULT_GIT_OPERATOR_SELECTOR, DEFAULT_JOB_SELECTOR,
};

pub use self::raw::ConfigParseError;

#[derive(Debug, Clone)]
pub struct Config {
    pub namespace: Option<String>,
    pub job_selector: String,
    pub git_operator_selector: String,
    pub container: String,
    pub polling: PollingConfig,
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file '{path}': {err}", path = .0.display(), err = .1)]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file '{path}': {err}", path = .0.display(), err = .1)]
    Parse(PathBuf, serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigParseError),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: None,
            job_selector: DEFAULT_JOB_SELECTOR.to_string(),
            git_operator_selector: DEFAULT_GIT_OPERATOR_SELECTOR.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            polling: PollingConfig::default(),
        }
    }
}

impl Config {
    /// Loads the YAML config at `path`, falling back to defaults when no path is given.
    #[instrument("config/load", level = "debug")]
    pub async fn new_from_file(path: Option<&Path>) -> Result<Config, ConfigLoadError> {
        let Some(path) = path else {
            debug!("No config file given, using defaults.");
            return Ok(Config::default());
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigLoadError::Read(path.to_path_buf(), e))?;
        Self::from_yaml(&content).map_err(|e| match e {
            ConfigLoadError::Parse(_, e) => ConfigLoadError::Parse(path.to_path_buf(), e),
            e => e,
        })
    }

    /// Checks the invariants that hold however the values were set.
    pub fn validate(&self) -> Result<(), ConfigParseError> {
        if self.polling.poll_interval >= self.polling.max_wait {
            return Err(ConfigParseError::PollIntervalTooLong);
        }
        Ok(())
    }

    pub fn from_yaml(content: &str) -> Result<Config, ConfigLoadError> {
        let raw: RawConfig = serde_yaml::from_str(content)
            .map_err(|e| ConfigLoadError::Parse(PathBuf::from("<inline>"), e))?;
        Ok(Config::try_from(raw)?)
    }
}
