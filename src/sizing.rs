//! Worker pool sizing.
//!
//! Dataproc clusters are sized from a total core count: the machine type's
//! trailing integer gives the cores per machine, and the resulting worker
//! count is split between the two non-preemptible workers Dataproc requires
//! and however many preemptible workers make up the rest.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::Error;
use crate::Result;

/// The number of non-preemptible workers every cluster gets.
///
/// This is the minimum Dataproc accepts.
pub const NON_PREEMPTIBLE_WORKERS: u64 = 2;

/// Matches the trailing core count of a machine type.
static TRAILING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?(\d+)$").expect("regex should compile"));

/// A machine type identifier such as `n1-standard-4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineType(String);

impl MachineType {
    /// Creates a new machine type from its identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Gets the machine type identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the number of cores per machine from the identifier's trailing
    /// integer.
    ///
    /// Returns [`Error::MalformedMachineType`] if there is no trailing
    /// integer or if it is zero.
    pub fn cores(&self) -> Result<u64> {
        TRAILING_DIGITS
            .captures(&self.0)
            .and_then(|c| c[1].parse::<u64>().ok())
            .filter(|cores| *cores > 0)
            .ok_or_else(|| Error::MalformedMachineType(self.0.clone()))
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The worker pool derived from a requested core count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterSizing {
    /// The number of cores on each machine.
    pub cores_per_machine: u64,
    /// The total number of workers needed to provide the requested cores.
    pub total_workers: u64,
    /// The number of non-preemptible workers.
    pub workers: u64,
    /// The number of preemptible workers.
    pub preemptible_workers: u64,
}

impl ClusterSizing {
    /// Computes the worker pool for `cores` total cores on machines of the
    /// given type.
    pub fn compute(cores: u64, machine_type: &MachineType) -> Result<Self> {
        let cores_per_machine = machine_type.cores()?;
        let total_workers = cores.div_ceil(cores_per_machine);

        Ok(Self {
            cores_per_machine,
            total_workers,
            workers: NON_PREEMPTIBLE_WORKERS,
            preemptible_workers: total_workers.saturating_sub(NON_PREEMPTIBLE_WORKERS),
        })
    }
}
