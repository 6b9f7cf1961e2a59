use tracing::{Level, debug, instrument};
use tracing_error::SpanTrace;

use super::error::{BootJobError, KubeResultExt, is_not_found};
use super::events::BootEvent;
use super::{BootJobContext, Deadline};
use crate::kubernetes_objects::client::BootJobApi;
use crate::kubernetes_objects::{DEFAULT_NAMESPACES, GIT_OPERATOR_DEPLOYMENT};

/// Namespaces probed for the git operator, in order.
pub fn namespace_candidates(explicit: Option<&str>) -> Vec<String> {
    let mut namespaces: Vec<String> = Vec::with_capacity(DEFAULT_NAMESPACES.len() + 1);
    let explicit = explicit.filter(|ns| !ns.is_empty());
    for ns in explicit.into_iter().chain(DEFAULT_NAMESPACES) {
        if !namespaces.iter().any(|n| n == ns) {
            namespaces.push(ns.to_string());
        }
    }
    namespaces
}

impl<A: BootJobApi> BootJobContext<A> {
    /// Finds the first candidate namespace containing the git operator Deployment.
    #[instrument("resolve_namespace", level = Level::TRACE, skip(self))]
    pub async fn resolve_namespace(&self, explicit: Option<&str>) -> Result<String, BootJobError> {
        let namespaces = namespace_candidates(explicit);
        for ns in &namespaces {
            match self.api.get_deployment(ns, GIT_OPERATOR_DEPLOYMENT).await {
                Ok(Some(_)) => {
                    self.emit(BootEvent::NamespaceResolved {
                        namespace: ns.clone(),
                    });
                    return Ok(ns.clone());
                }
                Ok(None) => {
                    debug!("Deployment '{GIT_OPERATOR_DEPLOYMENT}' not found in namespace '{ns}'.");
                }
                Err(e) if is_not_found(&e) => {
                    debug!("Deployment '{GIT_OPERATOR_DEPLOYMENT}' not found in namespace '{ns}'.");
                }
                Err(e) => {
                    return Err(e).context(|| {
                        format!("find Deployment {GIT_OPERATOR_DEPLOYMENT} in namespace {ns}")
                    });
                }
            }
        }

        Err(BootJobError::NamespaceNotFound {
            deployment: GIT_OPERATOR_DEPLOYMENT,
            namespaces: namespaces.join(", "),
            span_trace: SpanTrace::capture(),
        })
    }

    /// Retries [`Self::resolve_namespace`] until it succeeds or the deadline passes.
    ///
    /// A failure is reported only when its text differs from the previous one.
    #[instrument("wait_for_namespace", skip(self, deadline))]
    pub async fn wait_for_namespace(
        &self,
        explicit: Option<&str>,
        deadline: &Deadline,
    ) -> Result<String, BootJobError> {
        let mut last_error: Option<String> = None;
        loop {
            match self.resolve_namespace(explicit).await {
                Ok(ns) => return Ok(ns),
                Err(e) => {
                    let text = e.to_string();
                    if last_error.as_deref() != Some(text.as_str()) {
                        self.emit(BootEvent::NamespaceLookupFailed {
                            error: text.clone(),
                        });
                        last_error = Some(text);
                    }
                }
            }

            if deadline.expired() {
                return Err(deadline.timeout());
            }
            self.pause(self.polling.namespace_retry_interval, || {
                "waiting for the git operator namespace".to_string()
            })
            .await?;
        }
    }
}
