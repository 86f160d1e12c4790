//! Implementation of the `dataproc-run` command.

pub mod run;
