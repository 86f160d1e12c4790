//! Argument vectors for the `gcloud dataproc` commands.

use std::fmt;

use crate::config::GcloudConfig;
use crate::resolve::RunConfig;
use crate::sizing::ClusterSizing;

/// A single external command: a program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The program to run.
    program: String,
    /// The arguments passed to the program.
    args: Vec<String>,
}

impl Invocation {
    /// Creates a new invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Gets the program to run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Gets the arguments passed to the program.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Gets the full argument vector, program first.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

impl fmt::Display for Invocation {
    /// Renders the invocation as a shell-quoted command line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match shlex::try_join(self.argv()) {
            Ok(line) => f.write_str(&line),
            // Only nul bytes fail to quote; show the words unquoted instead.
            Err(_) => f.write_str(&self.argv().collect::<Vec<_>>().join(" ")),
        }
    }
}

/// Starts a `gcloud dataproc` invocation with the configured global
/// arguments.
fn dataproc(gcloud: &GcloudConfig) -> Invocation {
    Invocation::new(&gcloud.program)
        .args(&gcloud.global_args)
        .arg("dataproc")
}

/// Builds the command that creates the cluster.
///
/// The `--tags` flag is left off when no network tags are configured.
pub fn create_cluster(config: &RunConfig, sizing: &ClusterSizing) -> Invocation {
    let machine_type = config.machine_type.as_str();
    let invocation = dataproc(&config.gcloud)
        .args(["clusters", "create", config.cluster.as_str()])
        .args(["--master-machine-type", machine_type])
        .args(["--worker-machine-type", machine_type])
        .args(["--num-workers".to_string(), sizing.workers.to_string()])
        .args([
            "--num-preemptible-workers".to_string(),
            sizing.preemptible_workers.to_string(),
        ]);

    if config.tags.is_empty() {
        invocation
    } else {
        invocation.args(["--tags".to_string(), config.tags.join(",")])
    }
}

/// Builds the command that submits the Spark job.
///
/// `properties` is the flattened properties argument; the `--properties`
/// flag is left off when it is `None`.
pub fn submit_job(config: &RunConfig, properties: Option<&str>) -> Invocation {
    let mut invocation = dataproc(&config.gcloud)
        .args(["jobs", "submit", "spark"])
        .args(["--cluster", config.cluster.as_str()])
        .args(["--class", config.main.as_str()])
        .args(["--jars", config.jar.as_str()]);

    if let Some(properties) = properties {
        invocation = invocation.args(["--properties", properties]);
    }

    invocation.arg("--").args(&config.job_args)
}

/// Builds the command that deletes the cluster.
pub fn delete_cluster(config: &RunConfig) -> Invocation {
    dataproc(&config.gcloud).args(["clusters", "delete", config.cluster.as_str()])
}
