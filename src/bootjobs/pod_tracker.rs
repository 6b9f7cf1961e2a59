use std::collections::HashMap;

use k8s_openapi::api::core::v1::Pod;
use tracing::{Level, debug, instrument};

use super::error::{BootJobError, KubeResultExt, is_not_found};
use super::events::BootEvent;
use super::{BootJobContext, Deadline};
use crate::kubernetes_objects::LABEL_JOB_NAME;
use crate::kubernetes_objects::client::BootJobApi;
use crate::kubernetes_objects::job::{is_job_finished, job_name, job_state};
use crate::kubernetes_objects::pod::{
    is_pod_completed, is_pod_ready, is_pod_running, is_pod_terminating, pod_name, pod_status,
};

/// Last status reported per pod, so each status change is announced once.
///
/// Owned by a single watch; never shared between watches.
#[derive(Debug, Default)]
pub struct PodStatusMemo {
    statuses: HashMap<String, String>,
}

impl PodStatusMemo {
    /// Records `status` and reports whether it differs from the last one seen.
    pub fn observe(&mut self, pod: &str, status: &str) -> bool {
        if self.statuses.get(pod).map(String::as_str) == Some(status) {
            return false;
        }
        self.statuses.insert(pod.to_string(), status.to_string());
        true
    }
}

#[derive(Debug, Clone)]
pub enum JobProgress {
    /// The Job finished, successfully or not.
    Complete,
    /// A pod of the Job is running or ready and can be tailed.
    PodRunning(Box<Pod>),
}

/// Narrows the caller's selector to the pods created for `job`.
pub fn job_pod_selector(selector: &str, job: &str) -> String {
    if selector.is_empty() {
        format!("{LABEL_JOB_NAME}={job}")
    } else {
        format!("{selector},{LABEL_JOB_NAME}={job}")
    }
}

/// Newest pod that is neither completed nor being deleted.
fn live_pod(mut pods: Vec<Pod>) -> Option<Pod> {
    pods.sort_by(|a, b| {
        b.metadata
            .creation_timestamp
            .cmp(&a.metadata.creation_timestamp)
    });
    pods.into_iter()
        .find(|pod| !is_pod_completed(pod) && !is_pod_terminating(pod))
}

impl<A: BootJobApi> BootJobContext<A> {
    async fn list_pods_or_empty(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<Pod>, BootJobError> {
        match self.api.list_pods(namespace, selector).await {
            Err(e) if is_not_found(&e) => Ok(Vec::new()),
            result => result.context(|| {
                format!("query pods in namespace {namespace} with selector {selector}")
            }),
        }
    }

    /// Polls until the Job has finished or one of its pods is running.
    ///
    /// Completion is checked before pods on every iteration.
    #[instrument(
        "wait_for_job_complete_or_pod_running",
        level = Level::TRACE,
        skip(self, deadline, memo)
    )]
    pub async fn wait_for_job_complete_or_pod_running(
        &self,
        namespace: &str,
        job: &str,
        selector: &str,
        deadline: &Deadline,
        memo: &mut PodStatusMemo,
    ) -> Result<JobProgress, BootJobError> {
        let pod_selector = job_pod_selector(selector, job);
        loop {
            let current = self
                .api
                .get_job(namespace, job)
                .await
                .context(|| format!("check for Job {job} complete in namespace {namespace}"))?
                .ok_or_else(|| BootJobError::job_not_found(job, namespace))?;

            if is_job_finished(&current) {
                self.emit(BootEvent::JobComplete {
                    job: job_name(&current).to_string(),
                    state: job_state(&current),
                });
                return Ok(JobProgress::Complete);
            }
            debug!("Boot Job '{job}' is not completed yet.");

            let pods = self.list_pods_or_empty(namespace, &pod_selector).await?;
            if let Some(pod) = live_pod(pods) {
                let name = pod_name(&pod);
                let status = pod_status(&pod);
                if !is_pod_completed(&pod) && !is_pod_terminating(&pod) && memo.observe(name, &status)
                {
                    self.emit(BootEvent::PodStatusChanged {
                        pod: name.to_string(),
                        status,
                    });
                }
                if is_pod_running(&pod) || is_pod_ready(&pod) {
                    return Ok(JobProgress::PodRunning(Box::new(pod)));
                }
            }

            if deadline.expired() {
                return Err(deadline.timeout());
            }
            self.pause(self.polling.poll_interval, || {
                format!("waiting for a pod of Job {job}")
            })
            .await?;
        }
    }

    /// Polls until a pod matching the git operator selector is ready.
    #[instrument("wait_for_git_operator", skip(self, deadline))]
    pub async fn wait_for_git_operator(
        &self,
        namespace: &str,
        selector: &str,
        deadline: &Deadline,
    ) -> Result<Pod, BootJobError> {
        self.emit(BootEvent::WaitingForGitOperator {
            namespace: namespace.to_string(),
        });
        loop {
            let pods = self.list_pods_or_empty(namespace, selector).await?;
            if let Some(pod) = pods.into_iter().find(is_pod_ready) {
                self.emit(BootEvent::GitOperatorReady {
                    pod: pod_name(&pod).to_string(),
                });
                return Ok(pod);
            }

            if deadline.expired() {
                return Err(deadline.timeout());
            }
            self.pause(self.polling.poll_interval, || {
                format!("waiting for the git operator in namespace {namespace}")
            })
            .await?;
        }
    }

    /// Polls a single pod until it is running, ready or completed.
    pub(crate) async fn wait_for_pod_started(
        &self,
        namespace: &str,
        pod: &str,
        deadline: &Deadline,
    ) -> Result<Pod, BootJobError> {
        loop {
            let current = self
                .api
                .get_pod(namespace, pod)
                .await
                .context(|| format!("get pod {pod} in namespace {namespace}"))?;
            if is_pod_running(&current) || is_pod_ready(&current) || is_pod_completed(&current) {
                return Ok(current);
            }

            if deadline.expired() {
                return Err(deadline.timeout());
            }
            self.pause(self.polling.poll_interval, || {
                format!("waiting for pod {pod} to be running")
            })
            .await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::kubernetes_objects::client::MockBootJobApi;
    use crate::kubernetes_objects::job::JobState;
    use crate::testing::{context, job_with_status, pod};
    use serde_json::json;

    fn running_job() -> Option<k8s_openapi::api::batch::v1::Job> {
        Some(job_with_status("boot-1", json!({ "active": 1 })))
    }

    #[test]
    fn test_memo_reports_changes_once() {
        let mut memo = PodStatusMemo::default();
        assert!(memo.observe("boot-1-a", "Pending"));
        assert!(!memo.observe("boot-1-a", "Pending"));
        assert!(memo.observe("boot-1-a", "Running"));
        assert!(memo.observe("boot-1-b", "Running"));
    }

    #[test]
    fn test_job_pod_selector() {
        assert_eq!(job_pod_selector("app=jx-boot", "boot-1"), "app=jx-boot,job-name=boot-1");
        assert_eq!(job_pod_selector("", "boot-1"), "job-name=boot-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeded_job_completes_without_pod_lookup() {
        let mut api = MockBootJobApi::new();
        api.expect_get_job()
            .withf(|ns, name| ns == "jx" && name == "boot-1")
            .times(1)
            .returning(|_, _| {
                Ok(Some(job_with_status("boot-1", json!({ "active": 0, "succeeded": 1 }))))
            });
        api.expect_list_pods().never();
        let (ctx, sink) = context(api);

        let deadline = Deadline::after(Duration::from_secs(30));
        let mut memo = PodStatusMemo::default();
        let progress = ctx
            .wait_for_job_complete_or_pod_running("jx", "boot-1", "app=jx-boot", &deadline, &mut memo)
            .await
            .unwrap();

        assert!(matches!(progress, JobProgress::Complete));
        assert_eq!(
            sink.events(),
            vec![BootEvent::JobComplete {
                job: "boot-1".to_string(),
                state: JobState::Succeeded,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_pending_pod_to_run() {
        let mut api = MockBootJobApi::new();
        api.expect_get_job().returning(|_, _| Ok(running_job()));
        let mut polls = 0;
        api.expect_list_pods()
            .withf(|_, selector| selector == "app=jx-boot,job-name=boot-1")
            .times(4)
            .returning(move |_, _| {
                polls += 1;
                match polls {
                    1 | 2 => Ok(vec![pod("boot-1-a", "Pending", false, &["job"])]),
                    3 => Ok(vec![]),
                    _ => Ok(vec![pod("boot-1-a", "Running", true, &["job"])]),
                }
            });
        let (ctx, sink) = context(api);

        let deadline = Deadline::after(Duration::from_secs(30));
        let mut memo = PodStatusMemo::default();
        let progress = ctx
            .wait_for_job_complete_or_pod_running("jx", "boot-1", "app=jx-boot", &deadline, &mut memo)
            .await
            .unwrap();

        let JobProgress::PodRunning(pod) = progress else {
            panic!("expected a running pod");
        };
        assert_eq!(pod_name(&pod), "boot-1-a");
        assert_eq!(
            sink.events(),
            vec![
                BootEvent::PodStatusChanged {
                    pod: "boot-1-a".to_string(),
                    status: "Pending".to_string(),
                },
                BootEvent::PodStatusChanged {
                    pod: "boot-1-a".to_string(),
                    status: "Running".to_string(),
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminating_pod_is_not_tailed() {
        let mut api = MockBootJobApi::new();
        api.expect_get_job().returning(|_, _| Ok(running_job()));
        api.expect_list_pods().returning(|_, _| {
            let mut old = pod("boot-1-old", "Running", true, &["job"]);
            old.metadata.deletion_timestamp = old.metadata.creation_timestamp.clone();
            Ok(vec![old])
        });
        let (ctx, sink) = context(api);

        let deadline = Deadline::after(Duration::from_secs(3));
        let mut memo = PodStatusMemo::default();
        let err = ctx
            .wait_for_job_complete_or_pod_running("jx", "boot-1", "app=jx-boot", &deadline, &mut memo)
            .await
            .unwrap_err();

        assert!(matches!(err, BootJobError::Timeout(..)));
        assert!(sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_job_is_an_error() {
        let mut api = MockBootJobApi::new();
        api.expect_get_job().returning(|_, _| Ok(None));
        let (ctx, _) = context(api);

        let deadline = Deadline::after(Duration::from_secs(30));
        let err = ctx
            .wait_for_job_complete_or_pod_running(
                "jx",
                "boot-1",
                "app=jx-boot",
                &deadline,
                &mut PodStatusMemo::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BootJobError::JobNotFound(..)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_git_operator() {
        let mut api = MockBootJobApi::new();
        let mut polls = 0;
        api.expect_list_pods()
            .withf(|ns, selector| ns == "jx" && selector == "app=jx-git-operator")
            .returning(move |_, _| {
                polls += 1;
                let ready = polls > 1;
                Ok(vec![pod("jx-git-operator-abc", "Running", ready, &["git-operator"])])
            });
        let (ctx, sink) = context(api);

        let deadline = Deadline::after(Duration::from_secs(30));
        let pod = ctx
            .wait_for_git_operator("jx", "app=jx-git-operator", &deadline)
            .await
            .unwrap();

        assert_eq!(pod_name(&pod), "jx-git-operator-abc");
        assert_eq!(
            sink.events().last(),
            Some(&BootEvent::GitOperatorReady {
                pod: "jx-git-operator-abc".to_string()
            })
        );
    }
}
