use std::fmt::Display;

use k8s_openapi::api::batch::v1::Job;

use super::LABEL_COMMIT_SHA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Succeeded,
    Failed,
    Running,
    Pending,
}

impl Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Succeeded => "Succeeded",
            JobState::Failed => "Failed",
            JobState::Running => "Running",
            JobState::Pending => "Pending",
        };
        f.write_str(s)
    }
}

pub fn job_name(job: &Job) -> &str {
    job.metadata.name.as_deref().unwrap_or("<unknown>")
}

pub fn commit_sha(job: &Job) -> Option<&str> {
    job.metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(LABEL_COMMIT_SHA))
        .map(String::as_str)
}

fn has_condition(job: &Job, condition_type: &str) -> bool {
    job.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == condition_type && c.status == "True")
        })
}

pub fn active_pods(job: &Job) -> i32 {
    job.status.as_ref().and_then(|s| s.active).unwrap_or(0)
}

/// A Job is finished once it carries a terminal condition, a completion time,
/// or has no active pods left after at least one pod succeeded or failed.
pub fn is_job_finished(job: &Job) -> bool {
    if has_condition(job, "Complete") || has_condition(job, "Failed") {
        return true;
    }
    let Some(status) = job.status.as_ref() else {
        return false;
    };
    if status.completion_time.is_some() {
        return true;
    }
    status.active.unwrap_or(0) == 0
        && (status.succeeded.unwrap_or(0) > 0 || status.failed.unwrap_or(0) > 0)
}

pub fn is_job_succeeded(job: &Job) -> bool {
    if has_condition(job, "Complete") {
        return true;
    }
    if has_condition(job, "Failed") {
        return false;
    }
    job.status
        .as_ref()
        .is_some_and(|s| s.succeeded.unwrap_or(0) > 0)
}

pub fn job_state(job: &Job) -> JobState {
    if is_job_finished(job) {
        if is_job_succeeded(job) {
            JobState::Succeeded
        } else {
            JobState::Failed
        }
    } else if active_pods(job) > 0 {
        JobState::Running
    } else {
        JobState::Pending
    }
}
