//! Resolution of command line arguments into a [`RunConfig`].
//!
//! Each setting is taken from its flag, then its environment variable, then
//! the configuration file, then a built-in default. Required settings that
//! are still missing are reported before anything is run.

use std::env;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::Error;
use crate::Result;
use crate::commands::run::Args;
use crate::config::Config;
use crate::config::GcloudConfig;
use crate::properties;
use crate::sizing::ClusterSizing;
use crate::sizing::MachineType;

/// The environment variable holding additional properties files.
///
/// Unlike the other environment variables, this one is merged with its flag
/// rather than overridden by it.
pub const PROPS_FILES_ENV: &str = "SPARK_PROPS_FILES";

/// The fully resolved settings for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// The cluster name, including the timestamp suffix if one was requested.
    pub cluster: String,
    /// Whether a timestamp suffix was appended to the cluster name.
    pub timestamped: bool,
    /// The total number of cores requested.
    pub cores: u64,
    /// The properties files to flatten, in order.
    pub properties_files: Vec<PathBuf>,
    /// The URI of the application JAR.
    pub jar: String,
    /// The main class of the application.
    pub main: String,
    /// The machine type for master and worker nodes.
    pub machine_type: MachineType,
    /// Print commands instead of running them.
    pub dry_run: bool,
    /// Skip creating and deleting the cluster.
    pub job_only: bool,
    /// Arguments passed through to the job.
    pub job_args: Vec<String>,
    /// Network tags applied to the cluster's nodes.
    pub tags: Vec<String>,
    /// How `gcloud` is invoked.
    pub gcloud: GcloudConfig,
}

impl RunConfig {
    /// Computes the worker pool for this run.
    pub fn sizing(&self) -> Result<ClusterSizing> {
        ClusterSizing::compute(self.cores, &self.machine_type)
    }

    /// Reads and flattens this run's properties files.
    pub fn properties(&self) -> Result<Option<String>> {
        properties::flatten_files(&self.properties_files, "")
    }
}

/// Resolves [`Args`] into a [`RunConfig`].
///
/// The resolver holds the inputs that come from outside the argument parser:
/// the properties file list from the environment and the time used for
/// timestamped cluster names.
#[derive(Debug, Clone)]
pub struct Resolver {
    /// The value of [`PROPS_FILES_ENV`], if set.
    props_env: Option<String>,
    /// The time of resolution.
    now: SystemTime,
}

impl Resolver {
    /// Creates a resolver from explicit inputs.
    pub fn new(props_env: Option<String>, now: SystemTime) -> Self {
        Self { props_env, now }
    }

    /// Creates a resolver from the process environment and the current time.
    pub fn from_env() -> Self {
        Self::new(env::var(PROPS_FILES_ENV).ok(), SystemTime::now())
    }

    /// Resolves the given arguments against the configuration.
    pub fn resolve(&self, args: Args, config: &Config) -> Result<RunConfig> {
        let jar = required(args.jar, "jar", "JAR")?;
        let main = required(args.main, "main", "MAIN")?;
        let cluster = required(args.cluster, "cluster", "CLUSTER")?;

        let cluster = if args.timestamp_cluster_name {
            format!("{cluster}-{secs}", secs = self.epoch_seconds())
        } else {
            cluster
        };

        let properties_files =
            properties::split_file_list(args.properties.as_deref(), self.props_env.as_deref());

        Ok(RunConfig {
            cluster,
            timestamped: args.timestamp_cluster_name,
            cores: args.cores.unwrap_or(config.cluster.cores),
            properties_files,
            jar,
            main,
            machine_type: MachineType::new(
                args.machine_type
                    .unwrap_or_else(|| config.cluster.machine_type.clone()),
            ),
            dry_run: args.dry_run,
            job_only: args.job_only,
            job_args: args.job_args,
            tags: config.cluster.tags.clone(),
            gcloud: config.gcloud.clone(),
        })
    }

    /// Gets the resolution time as whole seconds since the Unix epoch.
    fn epoch_seconds(&self) -> u64 {
        self.now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Unwraps a required setting, treating an empty value as missing.
fn required(value: Option<String>, flag: &'static str, env: &'static str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingRequired { flag, env })
}
