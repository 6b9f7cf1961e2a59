use std::time::Duration;

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use tokio::io::AsyncWriteExt;
use tokio::select;
use tracing::{Instrument, debug, info_span, instrument, warn};

use super::error::{BootJobError, KubeResultExt, is_not_found};
use super::events::BootEvent;
use super::pod_tracker::{JobProgress, PodStatusMemo};
use super::{BootJobContext, Deadline};
use crate::kubernetes_objects::LABEL_JOB_NAME;
use crate::kubernetes_objects::client::{BootJobApi, LogSinks};
use crate::kubernetes_objects::job::{active_pods, job_name};
use crate::kubernetes_objects::pod::{container_names, has_container, pod_name, pod_outcome};

/// What the `log` command was asked to show.
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub namespace: Option<String>,
    pub selector: String,
    pub git_operator_selector: String,
    pub container: String,
    pub commit_sha: Option<String>,
    pub wait: bool,
    pub duration: Duration,
}

pub fn verify_container(pod: &Pod, container: &str) -> Result<(), BootJobError> {
    if has_container(pod, container) {
        return Ok(());
    }
    Err(BootJobError::InvalidContainer {
        container: container.to_string(),
        pod: pod_name(pod).to_string(),
        available: container_names(pod),
    })
}

impl<A: BootJobApi> BootJobContext<A> {
    /// Tails the running pod of a Job, re-attaching to replacement pods, until the Job finishes.
    #[instrument("stream_until_job_done", skip(self, deadline, sinks))]
    pub async fn stream_until_job_done(
        &self,
        namespace: &str,
        job: &str,
        selector: &str,
        container: &str,
        deadline: &Deadline,
        sinks: &mut LogSinks,
    ) -> Result<(), BootJobError> {
        let mut memo = PodStatusMemo::default();
        loop {
            let pod = match self
                .wait_for_job_complete_or_pod_running(namespace, job, selector, deadline, &mut memo)
                .await?
            {
                JobProgress::Complete => return Ok(()),
                JobProgress::PodRunning(pod) => pod,
            };

            verify_container(&pod, container)?;
            let name = pod_name(&pod).to_string();
            let streamed = self.tail_pod(namespace, &name, container, sinks).await?;
            self.report_pod_outcome(namespace, &name).await;
            if !streamed {
                self.pause(self.polling.poll_interval, || {
                    format!("retrying the log of pod {name}")
                })
                .await?;
            }
        }
    }

    /// Blocks until the log stream of the pod closes. Stream failures are reported, not returned.
    ///
    /// Returns false when the stream failed.
    async fn tail_pod(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        sinks: &mut LogSinks,
    ) -> Result<bool, BootJobError> {
        self.emit(BootEvent::TailingPod {
            pod: pod.to_string(),
        });

        let mut shutdown = self.shutdown.clone();
        let tailed = select! {
            res = self
                .api
                .tail_logs(namespace, pod, container, sinks)
                .instrument(info_span!("tail_logs", pod_name = %pod, container = %container)) => res,
            signal = shutdown.wait() => {
                return Err(BootJobError::Cancelled {
                    signal,
                    activity: format!("tailing pod {pod}"),
                });
            }
        };

        let Err(e) = tailed else {
            return Ok(true);
        };
        self.emit(BootEvent::TailFailed {
            pod: pod.to_string(),
            error: e.to_string(),
        });
        let note = format!("failed to tail log of pod {pod}: {e}\n");
        if let Err(e) = sinks.err.write_all(note.as_bytes()).await {
            debug!("Could not write to the error stream: {e}");
        }
        Ok(false)
    }

    /// Logs how a pod ended once its stream closed. Never decides whether to keep watching.
    async fn report_pod_outcome(&self, namespace: &str, pod: &str) {
        let current = match self.api.get_pod(namespace, pod).await {
            Ok(current) => current,
            Err(e) if is_not_found(&e) => {
                debug!("Pod '{pod}' is gone.");
                return;
            }
            Err(e) => {
                warn!("Could not check how pod '{pod}' in namespace '{namespace}' ended: {e}");
                return;
            }
        };
        if let Some(outcome) = pod_outcome(&current) {
            self.emit(BootEvent::PodFinished {
                pod: pod.to_string(),
                outcome,
            });
        }
    }

    /// Tails every pod an already started Job created, one after another.
    #[instrument("view_job_log", skip(self, job, sinks), fields(job_name = job_name(job)))]
    pub async fn view_job_log(
        &self,
        namespace: &str,
        job: &Job,
        container: &str,
        duration: Duration,
        sinks: &mut LogSinks,
    ) -> Result<(), BootJobError> {
        let selector = format!("{LABEL_JOB_NAME}={}", job_name(job));
        let pods = match self.api.list_pods(namespace, &selector).await {
            Err(e) if is_not_found(&e) => Vec::new(),
            result => result
                .context(|| format!("list pods in namespace {namespace} with selector {selector}"))?,
        };
        if pods.is_empty() {
            warn!("No pods found for Job '{}'.", job_name(job));
        }

        let deadline = Deadline::after(duration);
        for pod in &pods {
            verify_container(pod, container)?;
            let name = pod_name(pod);
            self.wait_for_pod_started(namespace, name, &deadline).await?;
            self.tail_pod(namespace, name, container, sinks).await?;
            self.report_pod_outcome(namespace, name).await;
        }
        Ok(())
    }

    /// Shows the boot Job log, waiting for the next run when nothing is running yet.
    #[instrument("log_boot_job", skip_all)]
    pub async fn log_boot_job(
        &self,
        options: &LogOptions,
        sinks: &mut LogSinks,
    ) -> Result<(), BootJobError> {
        let commit_sha = options.commit_sha.as_deref().filter(|s| !s.is_empty());
        let deadline = Deadline::after(options.duration);
        let namespace = if options.wait {
            self.wait_for_namespace(options.namespace.as_deref(), &deadline)
                .await?
        } else {
            self.resolve_namespace(options.namespace.as_deref()).await?
        };
        let jobs = self
            .list_jobs(&namespace, &options.selector, commit_sha)
            .await?;

        let wait = options.wait || jobs.first().is_none_or(|job| active_pods(job) > 0);
        if !wait {
            return self
                .view_job_log(&namespace, &jobs[0], &options.container, options.duration, sinks)
                .await;
        }

        self.wait_for_git_operator(&namespace, &options.git_operator_selector, &deadline)
            .await?;
        self.emit(BootEvent::WaitingForJob {
            namespace: namespace.clone(),
            selector: options.selector.clone(),
            commit_sha: commit_sha.map(str::to_string),
        });
        let job = self
            .wait_for_job(&namespace, &options.selector, commit_sha, &deadline)
            .await?;
        self.stream_until_job_done(
            &namespace,
            job_name(&job),
            &options.selector,
            &options.container,
            &deadline,
            sinks,
        )
        .await
    }
}
