//! Implementation of the `run` command.

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::config::Config;
use crate::resolve::Resolver;
use crate::runner::ProcessExecutor;
use crate::runner::Runner;

/// Arguments to the `run` command.
#[derive(Parser, Debug, Clone, Default)]
pub struct Args {
    /// Name of the Dataproc cluster to use.
    #[arg(long, env = "CLUSTER", value_name = "NAME")]
    pub cluster: Option<String>,

    /// Append `-<TIMESTAMP>` to the cluster name.
    ///
    /// The timestamp is the number of seconds since the Unix epoch at
    /// startup; the same name is used to create, submit to, and delete the
    /// cluster.
    #[arg(short = 't', long = "timestamp-cluster-name")]
    pub timestamp_cluster_name: bool,

    /// Number of CPU cores to use (default: 200).
    #[arg(
        short,
        long,
        env = "CORES",
        value_name = "CORES",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub cores: Option<u64>,

    /// Comma-separated list of Spark properties files.
    ///
    /// These are merged with the files listed in the `SPARK_PROPS_FILES`
    /// environment variable, which come after them.
    #[arg(short, long, value_name = "FILES")]
    pub properties: Option<String>,

    /// URI of the main application JAR.
    #[arg(long, env = "JAR", value_name = "URI")]
    pub jar: Option<String>,

    /// Main class of the application JAR.
    #[arg(short, long, env = "MAIN", value_name = "CLASS")]
    pub main: Option<String>,

    /// Machine type to use for master and worker nodes (default:
    /// n1-standard-4).
    #[arg(long, value_name = "TYPE")]
    pub machine_type: Option<String>,

    /// Print the `gcloud` commands without running them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip cluster setup and teardown; just submit the job.
    #[arg(short, long)]
    pub job_only: bool,

    /// Path to a configuration file.
    ///
    /// Defaults to `dataproc-run.toml` in the working directory, then
    /// `dataproc-run/config.toml` in the user's configuration directory.
    #[arg(long, env = "DATAPROC_RUN_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Arguments passed through to the job.
    #[arg(last = true, value_name = "JOB_ARGS")]
    pub job_args: Vec<String>,
}

/// Runs a job on an ephemeral cluster.
pub fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref()).context("loading configuration")?;
    debug!(?config, "loaded configuration");

    let run_config = Resolver::from_env().resolve(args, &config)?;
    debug!(?run_config, "resolved arguments");

    Runner::new(&run_config, ProcessExecutor).run()?;
    Ok(())
}
