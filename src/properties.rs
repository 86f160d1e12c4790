//! Flattening of Spark properties files.
//!
//! A properties file holds one `key value` pair per line, in the format of
//! `spark-defaults.conf`. The job submission command instead takes a single
//! comma-separated list of `key=value` pairs, which is what this module
//! produces.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::Error;
use crate::Result;

/// The separator between entries in the flattened properties argument and
/// between paths in a properties file list.
pub const SEPARATOR: &str = ",";

/// A single property parsed from a `key value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    /// The property key.
    key: String,
    /// The property value; may contain whitespace.
    value: String,
}

impl PropertyEntry {
    /// Parses a single properties line.
    ///
    /// Surrounding whitespace is ignored and a blank line yields `None`. The
    /// key ends at the first whitespace; the value is everything after the
    /// whitespace run that follows it.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (key, value) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::BadLine(line.to_string()))?;

        Ok(Some(Self {
            key: key.to_string(),
            value: value.trim_start().to_string(),
        }))
    }

    /// Gets the property key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the property value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Renders the entry as `<prefix><key>=<value>`.
    pub fn render(&self, prefix: &str) -> String {
        format!("{prefix}{key}={value}", key = self.key, value = self.value)
    }
}

/// Flattens the contents of a single properties file into rendered entries.
///
/// The `path` is only used for error reporting.
pub fn flatten_str(path: &Path, contents: &str, prefix: &str) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let entry = PropertyEntry::parse(line).map_err(|_| Error::MalformedPropertyLine {
            path: path.to_path_buf(),
            line_number: index + 1,
            line: line.trim().to_string(),
        })?;

        if let Some(entry) = entry {
            entries.push(entry.render(prefix));
        }
    }

    Ok(entries)
}

/// Reads and flattens the given properties files.
///
/// Entries are joined with commas in file order, then line order. Returns
/// `None` when no files were given, in which case the properties flag should
/// be left off entirely.
pub fn flatten_files(paths: &[PathBuf], prefix: &str) -> Result<Option<String>> {
    if paths.is_empty() {
        return Ok(None);
    }

    let mut entries = Vec::new();
    for path in paths {
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadProperties {
            path: path.clone(),
            source,
        })?;

        let flattened = flatten_str(path, &contents, prefix)?;
        debug!(
            path = %path.display(),
            count = flattened.len(),
            "read properties file"
        );
        entries.extend(flattened);
    }

    Ok(Some(entries.join(SEPARATOR)))
}

/// Merges the comma-separated properties file lists from the command line
/// and the environment.
///
/// Command line entries come first. Duplicates are kept; empty items are
/// skipped.
pub fn split_file_list(flag: Option<&str>, env: Option<&str>) -> Vec<PathBuf> {
    flag.into_iter()
        .chain(env)
        .flat_map(|list| list.split(SEPARATOR))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(PathBuf::from)
        .collect()
}
