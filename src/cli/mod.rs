use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use duration_string::DurationString;

use crate::bootjobs::LogOptions;
use crate::bootjobs::error::BootJobError;
use crate::config::{Config, ConfigParseError};

/// Views and controls the boot Job run by the git operator.
#[derive(Debug, Parser)]
#[command(name = "jx-bootjob")]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) command: Command,

    /// YAML config file
    #[clap(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// The namespace where the boot jobs run. If not specified it will look in: jx and jx-git-operator
    #[clap(short, long, global = true)]
    pub(crate) namespace: Option<String>,

    /// The selector of the boot Job pods
    #[clap(short, long, global = true)]
    pub(crate) selector: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Views the boot Job logs in the cluster
    #[clap(alias = "logs")]
    Log(LogArgs),

    /// Stops the currently running boot Job by setting spec.suspend=true
    #[clap(alias = "suspend")]
    Stop,

    /// Triggers the latest boot Job to run again
    #[clap(alias = "rerun")]
    Trigger(TriggerArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct LogArgs {
    /// The name of the container in the boot Job to log
    #[clap(short, long)]
    pub(crate) container: Option<String>,

    /// The git commit SHA of the git repository to query the boot Job for
    #[clap(long)]
    pub(crate) commit_sha: Option<String>,

    /// Wait for the next active Job to start
    #[clap(short, long)]
    pub(crate) wait: bool,

    /// Default the commit SHA from $PULL_BASE_SHA and fail if it is not set
    #[clap(long)]
    pub(crate) sha_mode: bool,

    /// How long to wait for a Job to be active and a Pod to be ready
    #[clap(short, long, value_parser = parse_duration)]
    pub(crate) duration: Option<Duration>,

    /// Duration between polls for an active Job or Pod
    #[clap(long, value_parser = parse_duration)]
    pub(crate) poll: Option<Duration>,

    /// The selector of the git operator pod
    #[clap(short, long)]
    pub(crate) git_operator_selector: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct TriggerArgs {
    /// The git commit SHA to filter jobs by
    #[clap(long)]
    pub(crate) commit_sha: Option<String>,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    s.parse::<DurationString>()
        .map(Duration::from)
        .map_err(|e| format!("invalid duration '{s}': {e}"))
}

/// Commit SHA to filter by, taking `$PULL_BASE_SHA` in sha mode.
pub(crate) fn resolve_commit_sha(
    commit_sha: Option<String>,
    sha_mode: bool,
    pull_base_sha: Option<String>,
) -> Result<Option<String>, BootJobError> {
    let commit_sha = commit_sha.filter(|s| !s.is_empty());
    if !sha_mode || commit_sha.is_some() {
        return Ok(commit_sha);
    }
    match pull_base_sha.filter(|s| !s.is_empty()) {
        Some(sha) => Ok(Some(sha)),
        None => Err(BootJobError::MissingCommitSha),
    }
}

impl Cli {
    /// Command line values win over the config file.
    pub(crate) fn apply(&self, config: &mut Config) -> Result<(), ConfigParseError> {
        if let Some(namespace) = &self.namespace {
            config.namespace = Some(namespace.clone()).filter(|ns| !ns.is_empty());
        }
        if let Some(selector) = &self.selector {
            config.job_selector = selector.clone();
        }
        if let Command::Log(args) = &self.command {
            if let Some(container) = &args.container {
                config.container = container.clone();
            }
            if let Some(selector) = &args.git_operator_selector {
                config.git_operator_selector = selector.clone();
            }
            if let Some(duration) = args.duration {
                config.polling.max_wait = duration;
            }
            if let Some(poll) = args.poll {
                config.polling.poll_interval = poll;
            }
        }
        config.validate()
    }
}

impl LogArgs {
    pub(crate) fn to_options(
        &self,
        config: &Config,
        pull_base_sha: Option<String>,
    ) -> Result<LogOptions, BootJobError> {
        Ok(LogOptions {
            namespace: config.namespace.clone(),
            selector: config.job_selector.clone(),
            git_operator_selector: config.git_operator_selector.clone(),
            container: config.container.clone(),
            commit_sha: resolve_commit_sha(self.commit_sha.clone(), self.sha_mode, pull_base_sha)?,
            wait: self.wait,
            duration: config.polling.max_wait,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("jx-bootjob").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_log_flags_override_config() {
        let cli = parse(&[
            "log", "-n", "my-ns", "-s", "app=custom", "-c", "boot", "-d", "10m", "--poll", "2s",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config).unwrap();

        assert_eq!(config.namespace.as_deref(), Some("my-ns"));
        assert_eq!(config.job_selector, "app=custom");
        assert_eq!(config.container, "boot");
        assert_eq!(config.polling.max_wait, Duration::from_secs(600));
        assert_eq!(config.polling.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_overrides_are_validated() {
        let cli = parse(&["log", "-d", "5s", "--poll", "10s"]);
        let mut config = Config::default();
        assert!(matches!(
            cli.apply(&mut config),
            Err(ConfigParseError::PollIntervalTooLong)
        ));
    }

    #[test]
    fn test_aliases() {
        assert!(matches!(parse(&["suspend"]).command, Command::Stop));
        assert!(matches!(parse(&["rerun"]).command, Command::Trigger(_)));
        assert!(matches!(parse(&["logs", "-w"]).command, Command::Log(LogArgs { wait: true, .. })));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        assert!(Cli::try_parse_from(["jx-bootjob", "log", "-d", "forever"]).is_err());
    }

    #[test]
    fn test_sha_mode() {
        assert_eq!(resolve_commit_sha(None, false, Some("abc".into())).unwrap(), None);
        assert_eq!(
            resolve_commit_sha(None, true, Some("abc".into())).unwrap().as_deref(),
            Some("abc")
        );
        assert_eq!(
            resolve_commit_sha(Some("def".into()), true, Some("abc".into()))
                .unwrap()
                .as_deref(),
            Some("def")
        );
        assert!(matches!(
            resolve_commit_sha(None, true, None),
            Err(BootJobError::MissingCommitSha)
        ));
    }

    #[test]
    fn test_log_options_from_config() {
        let cli = parse(&["log", "--commit-sha", "abc123"]);
        let Command::Log(args) = &cli.command else {
            panic!("expected log command");
        };
        let options = args.to_options(&Config::default(), None).unwrap();
        assert_eq!(options.selector, "app=jx-boot");
        assert_eq!(options.container, "job");
        assert_eq!(options.commit_sha.as_deref(), Some("abc123"));
        assert_eq!(options.duration, Duration::from_secs(1800));
        assert!(!options.wait);
    }
}
