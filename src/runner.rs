//! Sequencing of the cluster create, job submit, and cluster delete commands.
//!
//! A run moves through `Creating -> Submitting -> Deleting`, where creating
//! and deleting are skipped in job-only mode. Once the cluster has been
//! created, it is deleted on the way out no matter how submission ends.

use std::io;
use std::io::Stdout;
use std::io::Write;
use std::process::Command;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::Error;
use crate::Result;
use crate::gcloud;
use crate::gcloud::Invocation;
use crate::resolve::RunConfig;

/// Runs external commands.
pub trait Executor {
    /// Runs the invocation to completion.
    ///
    /// Returns an error if the command could not be started or exited
    /// unsuccessfully.
    fn execute(&mut self, invocation: &Invocation) -> Result<()>;
}

/// An [`Executor`] that spawns processes and waits for them to exit.
///
/// The child inherits this process's standard streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&mut self, invocation: &Invocation) -> Result<()> {
        let status = Command::new(invocation.program())
            .args(invocation.get_args())
            .status()
            .map_err(|source| Error::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        debug!(%status, "`{}` exited", invocation.program());
        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                command: invocation.to_string(),
                status,
            })
        }
    }
}

/// The notice printed ahead of the commands of a dry run.
pub const DRY_RUN_NOTICE: &str = "Dry run: commands will only be printed to stdout";

/// Runs a job against an ephemeral cluster.
///
/// Every command is written to `output` (standard output by default) as
/// `+<command line>` before it runs.
#[derive(Debug)]
pub struct Runner<'a, E, W = Stdout> {
    /// The resolved settings for the run.
    config: &'a RunConfig,
    /// Runs the commands when not in dry-run mode.
    executor: E,
    /// Receives the audit lines.
    output: W,
    /// Set once writing to `output` has failed.
    output_closed: bool,
}

impl<'a, E: Executor> Runner<'a, E> {
    /// Creates a new runner that prints commands to standard output.
    pub fn new(config: &'a RunConfig, executor: E) -> Self {
        Self::with_output(config, executor, io::stdout())
    }
}

impl<'a, E: Executor, W: Write> Runner<'a, E, W> {
    /// Creates a new runner that prints commands to `output`.
    pub fn with_output(config: &'a RunConfig, executor: E, output: W) -> Self {
        Self {
            config,
            executor,
            output,
            output_closed: false,
        }
    }

    /// Consumes the runner, returning its executor and output.
    pub fn into_parts(self) -> (E, W) {
        (self.executor, self.output)
    }

    /// Runs the job.
    ///
    /// Sizing and properties are computed before any command runs, so a
    /// malformed machine type or properties file fails without side effects.
    pub fn run(&mut self) -> Result<()> {
        let config = self.config;
        let sizing = config.sizing()?;
        let properties = config.properties()?;

        if config.dry_run {
            self.print(DRY_RUN_NOTICE);
        }

        if config.timestamped {
            info!("using timestamped cluster name `{}`", config.cluster);
        }

        let submit = gcloud::submit_job(config, properties.as_deref());
        if config.job_only {
            info!("submitting job to existing cluster `{}`", config.cluster);
            return self.invoke(&submit);
        }

        info!(
            "setting up cluster `{cluster}` with {workers} workers and {preemptible} preemptible \
             workers",
            cluster = config.cluster,
            workers = sizing.workers,
            preemptible = sizing.preemptible_workers,
        );
        self.invoke(&gcloud::create_cluster(config, &sizing))?;

        let mut guard = ClusterGuard::new(self, gcloud::delete_cluster(config));
        info!("submitting job");
        let submitted = guard.runner().invoke(&submit);
        let deleted = guard.finish();

        match (submitted, deleted) {
            (Ok(()), deleted) => deleted,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown)) => {
                error!(
                    "failed to tear down cluster `{cluster}`: {teardown}",
                    cluster = config.cluster
                );
                Err(e)
            }
        }
    }

    /// Prints the invocation and, unless this is a dry run, executes it.
    fn invoke(&mut self, invocation: &Invocation) -> Result<()> {
        self.print(&format!("+{invocation}"));
        if self.config.dry_run {
            return Ok(());
        }

        self.executor.execute(invocation)
    }

    /// Writes a line to the output.
    ///
    /// A failed write is logged once and further output is dropped. The run
    /// carries on either way.
    fn print(&mut self, line: &str) {
        if self.output_closed {
            return;
        }

        if let Err(e) = writeln!(self.output, "{line}").and_then(|()| self.output.flush()) {
            self.output_closed = true;
            warn!("failed to write to standard output, no longer printing commands: {e}");
        }
    }
}

/// Deletes the cluster when the submission scope is left.
///
/// The normal path calls [`ClusterGuard::finish`] to get the deletion result.
/// If the guard is dropped without finishing, as during a panic, the cluster
/// is still deleted and any failure is logged.
struct ClusterGuard<'r, 'a, E: Executor, W: Write> {
    /// The runner used to issue the delete command.
    runner: &'r mut Runner<'a, E, W>,
    /// The delete command; taken once it has been issued.
    delete: Option<Invocation>,
}

impl<'r, 'a, E: Executor, W: Write> ClusterGuard<'r, 'a, E, W> {
    /// Creates a guard that will issue `delete` on the way out.
    fn new(runner: &'r mut Runner<'a, E, W>, delete: Invocation) -> Self {
        Self {
            runner,
            delete: Some(delete),
        }
    }

    /// Gets the guarded runner.
    fn runner(&mut self) -> &mut Runner<'a, E, W> {
        self.runner
    }

    /// Deletes the cluster, returning the result of the delete command.
    fn finish(mut self) -> Result<()> {
        match self.delete.take() {
            Some(delete) => {
                info!("tearing down cluster");
                self.runner.invoke(&delete)
            }
            None => Ok(()),
        }
    }
}

impl<E: Executor, W: Write> Drop for ClusterGuard<'_, '_, E, W> {
    fn drop(&mut self) {
        if let Some(delete) = self.delete.take() {
            warn!("tearing down cluster after an unexpected exit");
            if let Err(e) = self.runner.invoke(&delete) {
                error!("failed to tear down cluster: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::panic::AssertUnwindSafe;
    use std::panic::catch_unwind;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::resolve::tests::run_config;

    /// How a recorded command should behave.
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Outcome {
        /// Exit successfully.
        Succeed,
        /// Exit unsuccessfully.
        Fail,
        /// Panic while running.
        Panic,
    }

    /// An executor that records the commands it is asked to run.
    #[derive(Default)]
    struct Recorder {
        /// The commands run so far, shared so they survive a panic.
        log: Rc<RefCell<Vec<String>>>,
        /// Behavior overrides keyed by the `gcloud` verb (`create`, `submit`,
        /// or `delete`).
        outcomes: Vec<(&'static str, Outcome)>,
    }

    impl Recorder {
        /// Makes commands with the given verb behave as `outcome`.
        fn with(mut self, verb: &'static str, outcome: Outcome) -> Self {
            self.outcomes.push((verb, outcome));
            self
        }

        /// Gets the verbs of the commands run so far.
        fn verbs(&self) -> Vec<String> {
            self.log.borrow().clone()
        }
    }

    impl Executor for Recorder {
        fn execute(&mut self, invocation: &Invocation) -> Result<()> {
            let verb = ["create", "submit", "delete"]
                .into_iter()
                .find(|v| invocation.get_args().iter().any(|a| a == v))
                .expect("should be a known command");
            self.log.borrow_mut().push(verb.to_string());

            let outcome = self
                .outcomes
                .iter()
                .find(|(v, _)| *v == verb)
                .map(|(_, o)| *o)
                .unwrap_or(Outcome::Succeed);

            match outcome {
                Outcome::Succeed => Ok(()),
                Outcome::Fail => Err(Error::Spawn {
                    command: invocation.to_string(),
                    source: std::io::Error::other(format!("{verb} failed")),
                }),
                Outcome::Panic => panic!("{verb} panicked"),
            }
        }
    }

    /// An output whose reader has gone away, like a pipe into `head`.
    #[derive(Default)]
    struct ClosedPipe {
        /// The number of writes attempted.
        attempts: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Runs the job with the given configuration and executor, returning the
    /// printed output.
    fn run(config: &RunConfig, recorder: Recorder) -> (Result<()>, Recorder, String) {
        let mut runner = Runner::with_output(config, recorder, Vec::new());
        let result = runner.run();
        let (recorder, output) = runner.into_parts();
        (result, recorder, String::from_utf8(output).unwrap())
    }

    #[test]
    fn runs_create_submit_delete_in_order() {
        let (result, recorder, _) = run(&run_config(), Recorder::default());
        result.unwrap();
        assert_eq!(recorder.verbs(), ["create", "submit", "delete"]);
    }

    #[test]
    fn deletes_after_failed_submit() {
        let (result, recorder, _) = run(
            &run_config(),
            Recorder::default().with("submit", Outcome::Fail),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("jobs submit spark"), "{err}");
        assert_eq!(recorder.verbs(), ["create", "submit", "delete"]);
    }

    #[test]
    fn surfaces_submit_error_when_teardown_also_fails() {
        let (result, recorder, _) = run(
            &run_config(),
            Recorder::default()
                .with("submit", Outcome::Fail)
                .with("delete", Outcome::Fail),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("jobs submit spark"), "{err}");
        assert_eq!(recorder.verbs(), ["create", "submit", "delete"]);
    }

    #[test]
    fn surfaces_teardown_error_after_successful_submit() {
        let (result, ..) = run(
            &run_config(),
            Recorder::default().with("delete", Outcome::Fail),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("clusters delete c"), "{err}");
    }

    #[test]
    fn failed_create_skips_submit_and_delete() {
        let (result, recorder, _) = run(
            &run_config(),
            Recorder::default().with("create", Outcome::Fail),
        );
        assert!(result.is_err());
        assert_eq!(recorder.verbs(), ["create"]);
    }

    #[test]
    fn deletes_when_submit_panics() {
        let config = run_config();
        let recorder = Recorder::default().with("submit", Outcome::Panic);
        let log = recorder.log.clone();

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _ = Runner::with_output(&config, recorder, Vec::new()).run();
        }));
        assert!(result.is_err());
        assert_eq!(*log.borrow(), ["create", "submit", "delete"]);
    }

    #[test]
    fn closed_output_does_not_stop_the_run() {
        let config = run_config();
        let mut runner = Runner::with_output(&config, Recorder::default(), ClosedPipe::default());
        runner.run().unwrap();

        let (recorder, output) = runner.into_parts();
        assert_eq!(recorder.verbs(), ["create", "submit", "delete"]);
        assert_eq!(output.attempts, 1);
    }

    #[test]
    fn closed_output_still_deletes_when_submit_panics() {
        let config = run_config();
        let recorder = Recorder::default().with("submit", Outcome::Panic);
        let log = recorder.log.clone();

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _ = Runner::with_output(&config, recorder, ClosedPipe::default()).run();
        }));
        assert!(result.is_err());
        assert_eq!(*log.borrow(), ["create", "submit", "delete"]);
    }

    #[test]
    fn prints_each_command_before_running_it() {
        let (result, _, output) = run(&run_config(), Recorder::default());
        result.unwrap();
        assert_eq!(
            output.lines().collect::<Vec<_>>(),
            [
                "+gcloud dataproc clusters create c --master-machine-type n1-standard-4 \
                 --worker-machine-type n1-standard-4 --num-workers 2 \
                 --num-preemptible-workers 0 --tags http-server",
                "+gcloud dataproc jobs submit spark --cluster c --class y --jars x --",
                "+gcloud dataproc clusters delete c",
            ]
        );
    }

    #[test]
    fn job_only_runs_submit() {
        let mut config = run_config();
        config.job_only = true;
        let (result, recorder, _) = run(&config, Recorder::default());
        result.unwrap();
        assert_eq!(recorder.verbs(), ["submit"]);

        let (result, recorder, _) = run(&config, Recorder::default().with("submit", Outcome::Fail));
        assert!(result.is_err());
        assert_eq!(recorder.verbs(), ["submit"]);
    }

    #[test]
    fn dry_run_executes_nothing() {
        let mut config = run_config();
        config.dry_run = true;
        let (result, recorder, output) = run(
            &config,
            Recorder::default()
                .with("create", Outcome::Fail)
                .with("submit", Outcome::Fail),
        );
        result.unwrap();
        assert!(recorder.verbs().is_empty());

        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 4, "{output}");
        assert_eq!(lines[0], DRY_RUN_NOTICE);
        assert!(lines[1..].iter().all(|l| l.starts_with("+gcloud dataproc ")));
    }

    #[test]
    fn validation_runs_before_any_command() {
        let mut config = run_config();
        config.machine_type = crate::sizing::MachineType::new("n1-standard");
        let (result, recorder, _) = run(&config, Recorder::default());
        assert!(matches!(result, Err(Error::MalformedMachineType(_))));
        assert!(recorder.verbs().is_empty());

        let mut config = run_config();
        config.dry_run = true;
        config.properties_files = vec!["does/not/exist.conf".into()];
        let (result, ..) = run(&config, Recorder::default());
        assert!(matches!(result, Err(Error::ReadProperties { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn process_executor_reports_exit_status() {
        ProcessExecutor
            .execute(&Invocation::new("sh").args(["-c", "exit 0"]))
            .unwrap();

        let err = ProcessExecutor
            .execute(&Invocation::new("sh").args(["-c", "exit 3"]))
            .unwrap_err();
        match err {
            Error::CommandFailed { command, status } => {
                assert_eq!(command, "sh -c 'exit 3'");
                assert_eq!(status.code(), Some(3));
            }
            e => panic!("unexpected error: {e}"),
        }

        let err = ProcessExecutor
            .execute(&Invocation::new("/nonexistent/gcloud"))
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
