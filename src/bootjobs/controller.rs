use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::Job;
use tracing::{Instrument, instrument, trace_span, warn};

use super::BootJobContext;
use super::error::{BootJobError, KubeResultExt, is_conflict};
use super::events::BootEvent;
use crate::kubernetes_objects::client::BootJobApi;
use crate::kubernetes_objects::job::{is_job_finished, job_name};
use crate::kubernetes_objects::{LABEL_RERUN, LABEL_RERUN_VALUE};

fn suspend(job: &mut Job) -> bool {
    if is_job_finished(job) {
        return false;
    }
    job.spec.get_or_insert_with(Default::default).suspend = Some(true);
    true
}

fn mark_rerun(job: &mut Job) -> bool {
    job.metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .insert(LABEL_RERUN.to_string(), LABEL_RERUN_VALUE.to_string());
    true
}

impl<A: BootJobApi> BootJobContext<A> {
    /// Suspends the newest boot Job. Returns the updated Job, or `None` when nothing was running.
    #[instrument("stop", skip(self))]
    pub async fn stop(
        &self,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Option<Job>, BootJobError> {
        let ns = self.resolve_namespace(namespace).await?;
        let Some(job) = self.latest_job(&ns, selector, None).await? else {
            self.emit(BootEvent::NoJobs { namespace: ns });
            return Ok(None);
        };

        match self.update_job(&ns, job, suspend).await? {
            Some(updated) => {
                self.emit(BootEvent::JobSuspended {
                    job: job_name(&updated).to_string(),
                });
                Ok(Some(updated))
            }
            None => {
                self.emit(BootEvent::NoRunningJob { namespace: ns });
                Ok(None)
            }
        }
    }

    /// Labels the newest boot Job, optionally for one commit, so the git operator runs it again.
    #[instrument("trigger", skip(self))]
    pub async fn trigger(
        &self,
        namespace: Option<&str>,
        selector: &str,
        commit_filter: Option<&str>,
    ) -> Result<Option<Job>, BootJobError> {
        let ns = self.resolve_namespace(namespace).await?;
        let Some(job) = self.latest_job(&ns, selector, commit_filter).await? else {
            self.emit(BootEvent::NoJobs { namespace: ns });
            return Ok(None);
        };

        let updated = self.update_job(&ns, job, mark_rerun).await?;
        if let Some(updated) = &updated {
            self.emit(BootEvent::JobRerunRequested {
                job: job_name(updated).to_string(),
            });
        }
        Ok(updated)
    }

    /// Applies `mutate` and replaces the Job, re-fetching and re-applying on a conflict.
    ///
    /// `mutate` returning false means the change no longer applies; nothing is written then.
    async fn update_job<F>(
        &self,
        namespace: &str,
        mut job: Job,
        mutate: F,
    ) -> Result<Option<Job>, BootJobError>
    where
        F: Fn(&mut Job) -> bool,
    {
        let name = job_name(&job).to_string();
        let mut conflicts = 0u64;
        loop {
            if !mutate(&mut job) {
                return Ok(None);
            }

            let result = self
                .api
                .replace_job(namespace, &job)
                .instrument(trace_span!("replace_job", job_name = %name))
                .await;
            match result {
                Ok(updated) => return Ok(Some(updated)),
                Err(e) if is_conflict(&e) && conflicts < self.polling.max_conflict_retries => {
                    conflicts += 1;
                    warn!(
                        "Job '{name}' was modified concurrently, retrying update ({conflicts}/{}).",
                        self.polling.max_conflict_retries
                    );
                    job = self
                        .api
                        .get_job(namespace, &name)
                        .await
                        .context(|| format!("get Job {name} in namespace {namespace}"))?
                        .ok_or_else(|| BootJobError::job_not_found(&name, namespace))?;
                }
                Err(e) => {
                    return Err(e)
                        .context(|| format!("update Job {name} in namespace {namespace}"));
                }
            }
        }
    }
}
