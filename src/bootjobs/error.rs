use std::time::Duration;

use duration_string::DurationString;
use thiserror::Error;
use tracing_error::{ExtractSpanTrace, SpanTrace};

use crate::error::{SpannedErr, SpannedExt};

#[derive(Error, Debug)]
pub enum BootJobError {
    #[error("failed to {action}: {source}")]
    KubeClient {
        action: String,
        source: SpannedErr<kube::Error>,
    },

    #[error("failed to find Deployment {deployment} in namespaces {namespaces}")]
    NamespaceNotFound {
        deployment: &'static str,
        namespaces: String,
        span_trace: SpanTrace,
    },

    #[error("timed out after waiting for duration {}", format_duration(.0))]
    Timeout(Duration, SpanTrace),

    #[error("Job {0} not found in namespace {1}")]
    JobNotFound(String, String, SpanTrace),

    #[error(
        "invalid container name {container} for pod {pod}. Available names: {}",
        .available.join(", ")
    )]
    InvalidContainer {
        container: String,
        pod: String,
        available: Vec<String>,
    },

    #[error("you have specified --sha-mode but no $PULL_BASE_SHA is defined or --commit-sha option supplied")]
    MissingCommitSha,

    #[error("received {signal} while {activity}")]
    Cancelled {
        signal: &'static str,
        activity: String,
    },
}

impl ExtractSpanTrace for BootJobError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            BootJobError::KubeClient { source, .. } => source.span_trace(),
            BootJobError::NamespaceNotFound { span_trace, .. } => Some(span_trace),
            BootJobError::Timeout(_, span_trace) => Some(span_trace),
            BootJobError::JobNotFound(_, _, span_trace) => Some(span_trace),
            BootJobError::InvalidContainer { .. }
            | BootJobError::MissingCommitSha
            | BootJobError::Cancelled { .. } => None,
        }
    }
}

impl BootJobError {
    pub(crate) fn timeout(configured: Duration) -> Self {
        BootJobError::Timeout(configured, SpanTrace::capture())
    }

    pub(crate) fn job_not_found(name: &str, namespace: &str) -> Self {
        BootJobError::JobNotFound(name.to_string(), namespace.to_string(), SpanTrace::capture())
    }
}

pub(crate) fn format_duration(duration: &Duration) -> String {
    DurationString::from(*duration).to_string()
}

pub(crate) fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

pub(crate) fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409)
}

pub(crate) trait KubeResultExt<T> {
    /// Wraps a cluster error with the operation that failed.
    fn context<F>(self, action: F) -> Result<T, BootJobError>
    where
        F: FnOnce() -> String;
}

impl<T> KubeResultExt<T> for Result<T, kube::Error> {
    fn context<F>(self, action: F) -> Result<T, BootJobError>
    where
        F: FnOnce() -> String,
    {
        self.with_span_trace()
            .map_err(|source| BootJobError::KubeClient {
                action: action(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::api_error;

    #[test]
    fn test_invalid_container_message() {
        let err = BootJobError::InvalidContainer {
            container: "boot".to_string(),
            pod: "boot-1-xyz".to_string(),
            available: vec!["git".to_string(), "job".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "invalid container name boot for pod boot-1-xyz. Available names: git, job"
        );
    }

    #[test]
    fn test_kube_error_classification() {
        assert!(is_not_found(&api_error(404, "NotFound")));
        assert!(!is_not_found(&api_error(403, "Forbidden")));
        assert!(is_conflict(&api_error(409, "Conflict")));
    }

    #[test]
    fn test_context_keeps_action() {
        let result: Result<(), kube::Error> = Err(api_error(403, "Forbidden"));
        let err = result
            .context(|| "list pods in namespace jx".to_string())
            .unwrap_err();
        assert!(matches!(err, BootJobError::KubeClient { ref action, .. } if action == "list pods in namespace jx"));
        assert!(err.span_trace().is_some());
    }
}
