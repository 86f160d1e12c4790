//! Implementation of the configuration module.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::Error;
use crate::Result;

/// The name of the configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "dataproc-run.toml";

/// The directory under the user's configuration directory holding
/// [`USER_CONFIG_FILE`].
pub const USER_CONFIG_DIR: &str = "dataproc-run";

/// The name of the configuration file in the user's configuration directory.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// The default machine type for master and worker nodes.
pub const DEFAULT_MACHINE_TYPE: &str = "n1-standard-4";

/// The default total number of cores to request.
pub const DEFAULT_CORES: u64 = 200;

/// The default network tag applied to cluster nodes.
pub const DEFAULT_TAG: &str = "http-server";

/// The default program used to talk to Dataproc.
pub const DEFAULT_GCLOUD: &str = "gcloud";

/// Represents the configuration for the `dataproc-run` tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields, default)]
pub struct Config {
    /// Defaults for the cluster that gets created.
    pub cluster: ClusterConfig,
    /// How the `gcloud` CLI is invoked.
    pub gcloud: GcloudConfig,
}

/// Defaults for the ephemeral cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields, default)]
pub struct ClusterConfig {
    /// The machine type used when `--machine-type` is not given.
    pub machine_type: String,
    /// The core count used when neither `--cores` nor `CORES` is given.
    pub cores: u64,
    /// Network tags applied to the cluster's nodes.
    pub tags: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            machine_type: DEFAULT_MACHINE_TYPE.to_string(),
            cores: DEFAULT_CORES,
            tags: vec![DEFAULT_TAG.to_string()],
        }
    }
}

/// Settings for invoking `gcloud`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields, default)]
pub struct GcloudConfig {
    /// The program to run.
    pub program: String,
    /// Arguments placed right after the program on every invocation.
    ///
    /// This is typically used for global flags such as `--project` or for
    /// `gcloud` subcommand flags that apply to every call such as `--region`.
    pub global_args: Vec<String>,
}

impl Default for GcloudConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_GCLOUD.to_string(),
            global_args: Vec::new(),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    ///
    /// The `path` is only used for error reporting.
    pub fn from_toml(path: &Path, text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::ParseConfig {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Reads a configuration file from the specified path.
    pub fn read_config(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &text)
    }

    /// Gets the configuration file paths searched when no explicit path is
    /// given, in order of preference.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE));
        }
        paths
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist. Otherwise the first existing file among
    /// [`Config::search_paths`] is read, falling back to the default
    /// configuration if there is none.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!("loading configuration from `{}`", path.display());
            return Self::read_config(path);
        }

        Self::load_first(&Self::search_paths())
    }

    /// Reads the first of `paths` that exists, or returns the default
    /// configuration.
    pub fn load_first(paths: &[PathBuf]) -> Result<Self> {
        match paths.iter().find(|p| p.is_file()) {
            Some(path) => {
                debug!("loading configuration from `{}`", path.display());
                Self::read_config(path)
            }
            None => {
                debug!("no configuration file found; using defaults");
                Ok(Self::default())
            }
        }
    }
}
