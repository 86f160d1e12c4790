//! Error types for resolving and running a job.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors that can occur while resolving or running a job.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required setting was supplied by neither a flag nor the environment.
    #[error("required: --{flag} option or {env} env var")]
    MissingRequired {
        /// The long flag name, without leading dashes.
        flag: &'static str,
        /// The environment variable consulted after the flag.
        env: &'static str,
    },

    /// The machine type has no usable trailing core count.
    #[error("malformed machine type `{0}`: expected a trailing core count such as `n1-standard-4`")]
    MalformedMachineType(String),

    /// A properties file line is neither blank nor `key value`.
    #[error("bad line {} in properties file `{}`: `{}`", .line_number, .path.display(), .line)]
    MalformedPropertyLine {
        /// The properties file containing the line.
        path: PathBuf,
        /// The one-based line number.
        line_number: usize,
        /// The offending line, trimmed.
        line: String,
    },

    /// A properties line without a source file is neither blank nor `key value`.
    #[error("bad properties line: `{0}`")]
    BadLine(String),

    /// A properties file could not be read.
    #[error("failed to read properties file `{}`", .path.display())]
    ReadProperties {
        /// The properties file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be read.
    #[error("failed to read configuration file `{}`", .path.display())]
    ReadConfig {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("failed to parse configuration file `{}`", .path.display())]
    ParseConfig {
        /// The configuration file.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// An external command could not be started.
    #[error("failed to spawn `{command}`")]
    Spawn {
        /// The rendered command line.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An external command exited unsuccessfully.
    #[error("`{command}` failed: {status}")]
    CommandFailed {
        /// The rendered command line.
        command: String,
        /// The exit status of the process.
        status: ExitStatus,
    },
}

/// A result type for resolving and running a job.
pub type Result<T, E = Error> = std::result::Result<T, E>;
