use tracing::{info, warn};

use crate::kubernetes_objects::job::JobState;
use crate::kubernetes_objects::pod::PodOutcome;

/// Something an operator watching a boot run would want to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootEvent {
    NamespaceResolved {
        namespace: String,
    },
    NamespaceLookupFailed {
        error: String,
    },
    WaitingForGitOperator {
        namespace: String,
    },
    GitOperatorReady {
        pod: String,
    },
    WaitingForJob {
        namespace: String,
        selector: String,
        commit_sha: Option<String>,
    },
    JobFound {
        job: String,
    },
    PodStatusChanged {
        pod: String,
        status: String,
    },
    TailingPod {
        pod: String,
    },
    TailFailed {
        pod: String,
        error: String,
    },
    PodFinished {
        pod: String,
        outcome: PodOutcome,
    },
    JobComplete {
        job: String,
        state: JobState,
    },
    JobSuspended {
        job: String,
    },
    JobRerunRequested {
        job: String,
    },
    NoJobs {
        namespace: String,
    },
    NoRunningJob {
        namespace: String,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: BootEvent);
}

/// Renders events as log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: BootEvent) {
        match event {
            BootEvent::NamespaceResolved { namespace } => {
                info!(kubernetes_namespace = %namespace, "Found the git operator in namespace '{namespace}'.");
            }
            BootEvent::NamespaceLookupFailed { error } => {
                warn!("{error}");
            }
            BootEvent::WaitingForGitOperator { namespace } => {
                info!("Waiting for the git operator to be ready in namespace '{namespace}'...");
            }
            BootEvent::GitOperatorReady { pod } => {
                info!("The git operator is running in pod '{pod}'.");
            }
            BootEvent::WaitingForJob {
                namespace,
                selector,
                commit_sha: Some(sha),
            } => {
                info!(
                    "Waiting for boot Job pod with selector '{selector}' in namespace '{namespace}' for commit SHA {sha}..."
                );
            }
            BootEvent::WaitingForJob {
                namespace,
                selector,
                commit_sha: None,
            } => {
                info!("Waiting for boot Job pod with selector '{selector}' in namespace '{namespace}'...");
            }
            BootEvent::JobFound { job } => {
                info!(job_name = %job, "Waiting for Job '{job}' to complete...");
            }
            BootEvent::PodStatusChanged { pod, status } => {
                info!(pod_name = %pod, "Pod '{pod}' has status {status}.");
            }
            BootEvent::TailingPod { pod } => {
                info!(pod_name = %pod, "Tailing boot Job pod '{pod}'.");
            }
            BootEvent::TailFailed { pod, error } => {
                warn!(pod_name = %pod, "Failed to tail log: {error}");
            }
            BootEvent::PodFinished {
                pod,
                outcome: PodOutcome::Terminating,
            } => {
                warn!(pod_name = %pod, "Boot Job pod '{pod}' is Terminating.");
            }
            BootEvent::PodFinished { pod, outcome } => {
                info!(pod_name = %pod, "Boot Job pod '{pod}' has {outcome}.");
            }
            BootEvent::JobComplete {
                job,
                state: JobState::Succeeded,
            } => {
                info!(job_name = %job, "Boot Job '{job}' has Succeeded.");
            }
            BootEvent::JobComplete { job, state } => {
                warn!(job_name = %job, "Boot Job '{job}' has {state}.");
            }
            BootEvent::JobSuspended { job } => {
                info!(job_name = %job, "Marked Job '{job}' to be stopped.");
            }
            BootEvent::JobRerunRequested { job } => {
                info!(job_name = %job, "Marked Job '{job}' to be rerun. You can view the logs via: jx-bootjob log");
            }
            BootEvent::NoJobs { namespace } => {
                warn!("There are no boot Jobs found in namespace '{namespace}'.");
            }
            BootEvent::NoRunningJob { namespace } => {
                warn!("There is no running boot Job in namespace '{namespace}'.");
            }
        }
    }
}
