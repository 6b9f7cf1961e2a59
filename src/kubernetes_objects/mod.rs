pub mod client;
pub mod job;
pub mod pod;

/// Label added by the git operator to boot Jobs naming the commit they run for.
pub const LABEL_COMMIT_SHA: &str = "git-operator.jenkins.io/commit-sha";

/// Label the git operator watches to re-run a boot Job.
pub const LABEL_RERUN: &str = "git-operator.jenkins.io/rerun";
pub const LABEL_RERUN_VALUE: &str = "true";

/// Label the Job controller puts on every Pod it creates.
pub const LABEL_JOB_NAME: &str = "job-name";

/// Deployment whose presence marks the git operator namespace.
pub const GIT_OPERATOR_DEPLOYMENT: &str = "jx-git-operator";

pub const DEFAULT_NAMESPACES: [&str; 2] = ["jx", "jx-git-operator"];
pub const DEFAULT_JOB_SELECTOR: &str = "app=jx-boot";
pub const DEFAULT_GIT_OPERATOR_SELECTOR: &str = "app=jx-git-operator";
pub const DEFAULT_CONTAINER: &str = "job";
