//! The `dataproc-run` command line tool.

use std::io::IsTerminal;
use std::io::stderr;

use clap::Parser;
use clap_verbosity_flag::InfoLevel;
use clap_verbosity_flag::Verbosity;
use colored::Colorize;
use dataproc_run::commands;
use git_testament::git_testament;
use git_testament::render_testament;
use tracing_log::AsTrace;

git_testament!(TESTAMENT);

/// Run a Spark job on an ephemeral Dataproc cluster.
///
/// Creates the cluster, submits the job, and deletes the cluster afterward,
/// even if the job fails.
#[derive(Parser)]
#[command(name = "dataproc-run", author, version = render_testament!(TESTAMENT), about, long_about = None)]
struct Cli {
    #[command(flatten)]
    args: commands::run::Args,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

/// Parses the command line, sets up logging, and runs the job.
fn inner() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_log::LogTracer::init()?;

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(cli.verbose.log_level_filter().as_trace())
        .with_writer(std::io::stderr)
        .with_ansi(stderr().is_terminal())
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    commands::run::run(cli.args)
}

fn main() {
    if let Err(e) = inner() {
        eprintln!(
            "{error}: {e:?}",
            error = if std::io::stderr().is_terminal() {
                "error".red().bold()
            } else {
                "error".normal()
            }
        );
        std::process::exit(1);
    }
}
