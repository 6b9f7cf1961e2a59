use async_trait::async_trait;
use derive_debug::Dbg;
use futures::{AsyncBufRead, AsyncBufReadExt};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, LogParams, PostParams};
use kube::{Api, Client};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{Level, instrument};

#[cfg(test)]
use mockall::automock;

pub type LogWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The pair of streams a container log is copied into.
pub struct LogSinks {
    pub out: LogWriter,
    pub err: LogWriter,
}

impl LogSinks {
    pub fn new(out: LogWriter, err: LogWriter) -> Self {
        Self { out, err }
    }

    pub fn stdio() -> Self {
        Self::new(Box::new(tokio::io::stdout()), Box::new(tokio::io::stderr()))
    }
}

#[derive(Error, Debug)]
pub enum TailError {
    #[error("Kubernetes client error: {0}")]
    KubeClient(#[from] kube::Error),

    #[error("Failed to copy log stream: {0}")]
    Io(#[from] std::io::Error),
}

/// Cluster calls made by the boot Job controller.
///
/// Errors are returned untouched so callers decide which ones are tolerated.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BootJobApi: Send + Sync {
    /// Returns `None` when the Deployment does not exist.
    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Deployment>, kube::Error>;

    async fn list_jobs(&self, namespace: &str, selector: &str) -> Result<Vec<Job>, kube::Error>;

    /// Returns `None` when the Job does not exist.
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, kube::Error>;

    async fn replace_job(&self, namespace: &str, job: &Job) -> Result<Job, kube::Error>;

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, kube::Error>;

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, kube::Error>;

    /// Follows the container log until the stream closes.
    async fn tail_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
        sinks: &mut LogSinks,
    ) -> Result<(), TailError>;
}

#[derive(Dbg, Clone)]
pub struct KubeBootJobApi {
    #[dbg(skip)]
    client: Client,
}

impl KubeBootJobApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BootJobApi for KubeBootJobApi {
    #[instrument("kube/get_deployment", level = Level::TRACE, skip(self))]
    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Deployment>, kube::Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    #[instrument("kube/list_jobs", level = Level::TRACE, skip(self))]
    async fn list_jobs(&self, namespace: &str, selector: &str) -> Result<Vec<Job>, kube::Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default().labels(selector)).await?;
        Ok(list.items)
    }

    #[instrument("kube/get_job", level = Level::TRACE, skip(self))]
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, kube::Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    #[instrument(
        "kube/replace_job",
        level = Level::TRACE,
        skip(self, job),
        fields(job_name = job.metadata.name.as_deref().unwrap_or_default())
    )]
    async fn replace_job(&self, namespace: &str, job: &Job) -> Result<Job, kube::Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let name = job.metadata.name.as_deref().unwrap_or_default();
        api.replace(name, &PostParams::default(), job).await
    }

    #[instrument("kube/list_pods", level = Level::TRACE, skip(self))]
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, kube::Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default().labels(selector)).await?;
        Ok(list.items)
    }

    #[instrument("kube/get_pod", level = Level::TRACE, skip(self))]
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, kube::Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await
    }

    #[instrument("kube/tail_logs", level = Level::TRACE, skip(self, sinks))]
    async fn tail_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container: &str,
        sinks: &mut LogSinks,
    ) -> Result<(), TailError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            follow: true,
            ..Default::default()
        };

        let stream = api.log_stream(pod_name, &params).await?;
        copy_log_lines(stream, &mut sinks.out).await?;
        Ok(())
    }
}

/// Copies a log stream to `out` one line at a time, bytes untouched.
pub(crate) async fn copy_log_lines<R, W>(reader: R, out: &mut W) -> std::io::Result<()>
where
    R: AsyncBufRead,
    W: AsyncWrite + Unpin,
{
    futures::pin_mut!(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        out.write_all(&line).await?;
        out.flush().await?;
    }
    out.flush().await
}
