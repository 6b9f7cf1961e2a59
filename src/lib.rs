use std::sync::Arc;

use self::bootjobs::BootJobContext;
use self::bootjobs::error::BootJobError;
use self::bootjobs::events::TracingEventSink;
use self::cli::{Cli, Command};
use self::kubernetes_objects::client::{KubeBootJobApi, LogSinks};
use self::shutdown::Shutdown;
use clap::Parser;
use thiserror::Error;
use tracing::{debug, info};
use tracing_error::ExtractSpanTrace;
use tracing_error::SpanTrace;

pub mod bootjobs;
pub(crate) mod cli;
pub mod config;
pub mod error;
pub mod kubernetes_objects;
pub mod shutdown;

#[cfg(test)]
mod testing;

const PULL_BASE_SHA: &str = "PULL_BASE_SHA";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load config.\n{0}")]
    ConfigError(#[from] config::ConfigLoadError),

    #[error("Failed to initialize kubernetes client.\n{0}")]
    KubeClientError(#[from] kube::Error),

    #[error("{0}")]
    BootJob(#[from] BootJobError),
}

impl ExtractSpanTrace for AppError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            AppError::BootJob(e) => e.span_trace(),
            _ => None,
        }
    }
}

pub async fn app() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = config::Config::new_from_file(cli.config.as_deref()).await?;
    cli.apply(&mut config)
        .map_err(config::ConfigLoadError::Invalid)?;

    debug!("Config loaded: {config:?}");

    let client = kube::Client::try_default().await?;

    info!("Kubernetes Client Initialized.");

    let context = BootJobContext::new(
        KubeBootJobApi::new(client),
        Arc::new(TracingEventSink),
        Shutdown::listen(),
        config.polling.clone(),
    );

    match &cli.command {
        Command::Log(args) => {
            let options = args.to_options(&config, std::env::var(PULL_BASE_SHA).ok())?;
            let mut sinks = LogSinks::stdio();
            context.log_boot_job(&options, &mut sinks).await?;
        }
        Command::Stop => {
            context
                .stop(config.namespace.as_deref(), &config.job_selector)
                .await?;
        }
        Command::Trigger(args) => {
            context
                .trigger(
                    config.namespace.as_deref(),
                    &config.job_selector,
                    args.commit_sha.as_deref(),
                )
                .await?;
        }
    }

    Ok(())
}
