use k8s_openapi::api::batch::v1::Job;
use tracing::{Level, debug, instrument};

use super::BootJobContext;
use super::error::{BootJobError, KubeResultExt, is_not_found};
use crate::kubernetes_objects::client::BootJobApi;
use crate::kubernetes_objects::job::commit_sha;

/// Commit filters select a Job when its commit SHA label starts with the filter.
pub fn matches_commit(job: &Job, filter: &str) -> bool {
    commit_sha(job).is_some_and(|sha| sha.starts_with(filter))
}

/// Newest first. Jobs created at the same instant keep their listed order.
pub fn sort_newest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| {
        b.metadata
            .creation_timestamp
            .cmp(&a.metadata.creation_timestamp)
    });
}

impl<A: BootJobApi> BootJobContext<A> {
    #[instrument("list_jobs", level = Level::TRACE, skip(self))]
    pub async fn list_jobs(
        &self,
        namespace: &str,
        selector: &str,
        commit_filter: Option<&str>,
    ) -> Result<Vec<Job>, BootJobError> {
        let mut jobs = match self.api.list_jobs(namespace, selector).await {
            Err(e) if is_not_found(&e) => Vec::new(),
            result => result.context(|| {
                format!("list Jobs in namespace {namespace} with selector {selector}")
            })?,
        };

        if let Some(filter) = commit_filter.filter(|f| !f.is_empty()) {
            jobs.retain(|job| matches_commit(job, filter));
        }
        sort_newest_first(&mut jobs);

        debug!("Found {} boot Jobs in namespace '{namespace}'.", jobs.len());
        Ok(jobs)
    }

    pub async fn latest_job(
        &self,
        namespace: &str,
        selector: &str,
        commit_filter: Option<&str>,
    ) -> Result<Option<Job>, BootJobError> {
        let jobs = self.list_jobs(namespace, selector, commit_filter).await?;
        Ok(jobs.into_iter().next())
    }
}
