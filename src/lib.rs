//! Runs a Spark job on an ephemeral Google Cloud Dataproc cluster.
//!
//! A run creates a cluster sized for the requested number of cores, submits
//! a single Spark job to it, and deletes the cluster again, all by shelling
//! out to `gcloud`. Deletion happens even when the job fails.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod commands;
pub mod config;
mod error;
pub mod gcloud;
pub mod properties;
pub mod resolve;
pub mod runner;
pub mod sizing;

pub use config::Config;
pub use error::Error;
pub use error::Result;
