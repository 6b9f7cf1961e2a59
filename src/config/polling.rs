use std::time::Duration;

use duration_string::DurationString;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
pub struct PollingConfig {
    /// How long to wait for an active Job and a running Pod
    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_max_wait"
    )]
    pub max_wait: Duration,

    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_poll_interval"
    )]
    pub poll_interval: Duration,

    /// Pause between attempts while waiting for the git operator namespace
    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_namespace_retry_interval"
    )]
    pub namespace_retry_interval: Duration,

    /// Attempts to re-apply a Job update after a resource version conflict
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_wait: default_max_wait(),
            poll_interval: default_poll_interval(),
            namespace_retry_interval: default_namespace_retry_interval(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    DurationString::deserialize(deserializer).map(Duration::from)
}

const fn default_max_wait() -> Duration {
    Duration::from_secs(30 * 60)
}
const fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}
const fn default_namespace_retry_interval() -> Duration {
    Duration::from_secs(5)
}
const fn default_max_conflict_retries() -> u64 {
    3
}
