use std::fmt::Display;

use k8s_openapi::api::core::v1::Pod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodOutcome {
    Succeeded,
    Failed(String),
    Terminating,
}

impl Display for PodOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodOutcome::Succeeded => f.write_str("Succeeded"),
            PodOutcome::Failed(phase) => f.write_str(phase),
            PodOutcome::Terminating => f.write_str("Terminating"),
        }
    }
}

pub fn pod_name(pod: &Pod) -> &str {
    pod.metadata.name.as_deref().unwrap_or("<unknown>")
}

fn phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

pub fn is_pod_running(pod: &Pod) -> bool {
    phase(pod) == Some("Running")
}

pub fn is_pod_succeeded(pod: &Pod) -> bool {
    phase(pod) == Some("Succeeded")
}

pub fn is_pod_completed(pod: &Pod) -> bool {
    matches!(phase(pod), Some("Succeeded" | "Failed"))
}

pub fn is_pod_terminating(pod: &Pod) -> bool {
    pod.metadata.deletion_timestamp.is_some()
}

pub fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// Status string in the style of the `STATUS` column of `kubectl get pods`.
pub fn pod_status(pod: &Pod) -> String {
    if is_pod_terminating(pod) {
        return "Terminating".to_string();
    }
    let Some(status) = pod.status.as_ref() else {
        return "Unknown".to_string();
    };

    let init_reason = status
        .init_container_statuses
        .iter()
        .flatten()
        .filter_map(|cs| cs.state.as_ref())
        .find_map(|state| {
            if let Some(waiting) = &state.waiting {
                waiting.reason.as_ref().map(|r| format!("Init:{r}"))
            } else {
                state
                    .terminated
                    .as_ref()
                    .filter(|t| t.exit_code != 0)
                    .map(|t| format!("Init:{}", t.reason.as_deref().unwrap_or("Error")))
            }
        });
    if let Some(reason) = init_reason {
        return reason;
    }

    let container_reason = status
        .container_statuses
        .iter()
        .flatten()
        .filter_map(|cs| cs.state.as_ref())
        .find_map(|state| {
            state
                .waiting
                .as_ref()
                .and_then(|w| w.reason.clone())
                .or_else(|| state.terminated.as_ref().and_then(|t| t.reason.clone()))
        });
    if let Some(reason) = container_reason {
        return reason;
    }

    if let Some(reason) = &status.reason {
        return reason.clone();
    }
    status
        .phase
        .clone()
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Container names declared by the pod spec, sorted alphabetically.
pub fn container_names(pod: &Pod) -> Vec<String> {
    let mut names: Vec<String> = pod
        .spec
        .iter()
        .flat_map(|spec| spec.containers.iter())
        .map(|c| c.name.clone())
        .collect();
    names.sort();
    names
}

pub fn has_container(pod: &Pod, name: &str) -> bool {
    pod.spec
        .as_ref()
        .is_some_and(|spec| spec.containers.iter().any(|c| c.name == name))
}

/// How a pod ended up once its log stream closed, if it ended at all.
pub fn pod_outcome(pod: &Pod) -> Option<PodOutcome> {
    if is_pod_completed(pod) {
        if is_pod_succeeded(pod) {
            Some(PodOutcome::Succeeded)
        } else {
            Some(PodOutcome::Failed(phase(pod).unwrap_or("Failed").to_string()))
        }
    } else if is_pod_terminating(pod) {
        Some(PodOutcome::Terminating)
    } else {
        None
    }
}
