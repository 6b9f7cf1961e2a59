//! Fixtures shared by the unit tests.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::core::ErrorResponse;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bootjobs::BootJobContext;
use crate::bootjobs::events::{BootEvent, EventSink};
use crate::config::polling::PollingConfig;
use crate::kubernetes_objects::client::{LogSinks, MockBootJobApi};
use crate::shutdown::Shutdown;

pub(crate) fn job(name: &str, created: &str, labels: Option<Value>) -> Job {
    job_from(json!({
        "metadata": {
            "name": name,
            "namespace": "jx",
            "creationTimestamp": created,
            "labels": labels.unwrap_or_else(|| json!({ "app": "jx-boot" })),
        }
    }))
}

pub(crate) fn job_with_status(name: &str, status: Value) -> Job {
    job_from(json!({
        "metadata": {
            "name": name,
            "namespace": "jx",
            "creationTimestamp": "2024-01-01T00:00:00Z",
            "labels": { "app": "jx-boot" },
        },
        "status": status,
    }))
}

pub(crate) fn job_from(mut value: Value) -> Job {
    value["apiVersion"] = json!("batch/v1");
    value["kind"] = json!("Job");
    serde_json::from_value(value).unwrap()
}

pub(crate) fn pod(name: &str, phase: &str, ready: bool, containers: &[&str]) -> Pod {
    let containers: Vec<Value> = containers
        .iter()
        .map(|c| json!({ "name": c, "image": "ghcr.io/jenkins-x/jx-boot" }))
        .collect();
    let ready = if ready { "True" } else { "False" };
    pod_from(json!({
        "metadata": {
            "name": name,
            "namespace": "jx",
            "creationTimestamp": "2024-01-01T00:00:00Z",
        },
        "spec": { "containers": containers },
        "status": {
            "phase": phase,
            "conditions": [{ "type": "Ready", "status": ready }],
        }
    }))
}

pub(crate) fn pod_from(mut value: Value) -> Pod {
    value["apiVersion"] = json!("v1");
    value["kind"] = json!("Pod");
    serde_json::from_value(value).unwrap()
}

pub(crate) fn deployment(name: &str) -> Deployment {
    serde_json::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name },
    }))
    .unwrap()
}

pub(crate) fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{reason} (test)"),
        reason: reason.to_string(),
        code,
    })
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<BootEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<BootEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: BootEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Context around a mock with a one second poll interval and no shutdown signal.
pub(crate) fn context(
    api: MockBootJobApi,
) -> (BootJobContext<MockBootJobApi>, Arc<RecordingSink>) {
    let (_trigger, shutdown) = Shutdown::channel();
    context_with_shutdown(api, shutdown)
}

pub(crate) fn context_with_shutdown(
    api: MockBootJobApi,
    shutdown: Shutdown,
) -> (BootJobContext<MockBootJobApi>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let polling = PollingConfig {
        max_wait: Duration::from_secs(60),
        poll_interval: Duration::from_secs(1),
        namespace_retry_interval: Duration::from_secs(5),
        max_conflict_retries: 3,
    };
    let ctx = BootJobContext::new(api, sink.clone(), shutdown, polling);
    (ctx, sink)
}

pub(crate) fn null_sinks() -> LogSinks {
    LogSinks::new(Box::new(tokio::io::sink()), Box::new(tokio::io::sink()))
}
