use k8s_openapi::api::batch::v1::Job;
use tracing::{debug, instrument};

use super::error::BootJobError;
use super::events::BootEvent;
use super::{BootJobContext, Deadline};
use crate::kubernetes_objects::client::BootJobApi;
use crate::kubernetes_objects::job::{is_job_finished, job_name};

impl<A: BootJobApi> BootJobContext<A> {
    /// Polls until the newest matching Job is a run worth watching.
    ///
    /// Without a commit filter only an unfinished Job qualifies. With one, the
    /// Job for that commit is returned whatever its state.
    #[instrument("wait_for_job", skip(self, deadline))]
    pub async fn wait_for_job(
        &self,
        namespace: &str,
        selector: &str,
        commit_filter: Option<&str>,
        deadline: &Deadline,
    ) -> Result<Job, BootJobError> {
        let commit_filter = commit_filter.filter(|f| !f.is_empty());
        loop {
            if let Some(job) = self.latest_job(namespace, selector, commit_filter).await? {
                if commit_filter.is_some() || !is_job_finished(&job) {
                    self.emit(BootEvent::JobFound {
                        job: job_name(&job).to_string(),
                    });
                    return Ok(job);
                }
                debug!("Latest boot Job '{}' has already finished.", job_name(&job));
            }

            if deadline.expired() {
                return Err(deadline.timeout());
            }
            self.pause(self.polling.poll_interval, || {
                format!("waiting for a boot Job in namespace {namespace}")
            })
            .await?;
        }
    }
}
