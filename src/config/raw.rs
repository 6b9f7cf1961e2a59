use serde::Deserialize;
use thiserror::Error;

use super::Config;
use super::polling::PollingConfig;
use crate::kubernetes_objects::{
    DEFAULT_CONTAINER, DEFAULT_GIT_OPERATOR_SELECTOR, DEFAULT_JOB_SELECTOR,
};

#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(super) struct RawConfig {
    /// Namespace probed before the default git operator namespaces
    #[serde(default)]
    pub(super) namespace: Option<String>,

    /// Label selector of the boot Jobs and their Pods
    ///
    /// Example: "app=jx-boot"
    #[serde(default)]
    pub(super) job_selector: Option<String>,

    #[serde(default)]
    pub(super) git_operator_selector: Option<String>,

    /// Container of the boot Job Pod whose log is tailed
    #[serde(default)]
    pub(super) container: Option<String>,

    #[serde(default)]
    pub(super) polling: PollingConfig,
}

#[derive(Error, Debug)]
pub enum ConfigParseError {
    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("poll_interval must be shorter than max_wait")]
    PollIntervalTooLong,
}

fn non_empty(
    value: Option<String>,
    field: &'static str,
    default: &str,
) -> Result<String, ConfigParseError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigParseError::EmptyField { field }),
        Some(v) => Ok(v),
        None => Ok(default.to_string()),
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigParseError;
    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let config = Config {
            namespace: raw.namespace.filter(|ns| !ns.is_empty()),
            job_selector: non_empty(raw.job_selector, "job_selector", DEFAULT_JOB_SELECTOR)?,
            git_operator_selector: non_empty(
                raw.git_operator_selector,
                "git_operator_selector",
                DEFAULT_GIT_OPERATOR_SELECTOR,
            )?,
            container: non_empty(raw.container, "container", DEFAULT_CONTAINER)?,
            polling: raw.polling,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let raw: RawConfig = serde_yaml::from_str("{}").unwrap();
        let config = Config::try_from(raw).unwrap();
        assert_eq!(config.namespace, None);
        assert_eq!(config.job_selector, "app=jx-boot");
        assert_eq!(config.git_operator_selector, "app=jx-git-operator");
        assert_eq!(config.container, "job");
        assert_eq!(config.polling, PollingConfig::default());
    }

    #[test]
    fn test_full_config() {
        let yaml_data = r#"
          namespace: my-custom-namespace
          job_selector: app=custom-boot
          container: boot
          polling:
            max_wait: 10m
            poll_interval: 2s
        "#;
        let raw: RawConfig = serde_yaml::from_str(yaml_data).unwrap();
        let config = Config::try_from(raw).unwrap();
        assert_eq!(config.namespace.as_deref(), Some("my-custom-namespace"));
        assert_eq!(config.job_selector, "app=custom-boot");
        assert_eq!(config.container, "boot");
        assert_eq!(config.polling.max_wait, Duration::from_secs(600));
        assert_eq!(config.polling.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_empty_selector_rejected() {
        let raw: RawConfig = serde_yaml::from_str("job_selector: ''").unwrap();
        assert!(matches!(
            Config::try_from(raw),
            Err(ConfigParseError::EmptyField { field: "job_selector" })
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_yaml::from_str::<RawConfig>("selector: app=jx-boot").is_err());
    }
}
