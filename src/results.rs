//! Result record store
//!
//! [`BenchmarkResult`] is the per-benchmark record built once by the runner and
//! never mutated afterwards. [`ResultSet`] keeps the records in execution order
//! and moves them to and from JSON without losing any precision.

use crate::error::Result;
use crate::reporter;
use crate::stats::{self, SideSummary};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Aggregated outcome of one benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    name: String,
    description: String,
    runs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    baseline: Option<SideSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    candidate: Option<SideSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    speedup: Option<f64>,
}

impl BenchmarkResult {
    /// Assemble a result; the speedup is derived from the two sides
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        runs: u32,
        baseline: Option<SideSummary>,
        candidate: Option<SideSummary>,
    ) -> Self {
        let speedup = match (&baseline, &candidate) {
            (Some(baseline), Some(candidate)) => stats::speedup(baseline, candidate),
            _ => None,
        };
        Self {
            name: name.into(),
            description: description.into(),
            runs,
            baseline,
            candidate,
            speedup,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Requested repeat count per side
    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Baseline summary; `None` when the side had no artifact
    pub fn baseline(&self) -> Option<&SideSummary> {
        self.baseline.as_ref()
    }

    /// Candidate summary; `None` when the side had no artifact
    pub fn candidate(&self) -> Option<&SideSummary> {
        self.candidate.as_ref()
    }

    /// Baseline mean over candidate mean, when both sides were measured
    pub fn speedup(&self) -> Option<f64> {
        self.speedup
    }

    /// Both sides carry statistics
    pub fn is_comparable(&self) -> bool {
        let measured = |side: Option<&SideSummary>| side.and_then(SideSummary::stats).is_some();
        measured(self.baseline()) && measured(self.candidate())
    }
}

/// Ordered collection of results, in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    results: Vec<BenchmarkResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result after all previously appended ones
    pub fn append(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BenchmarkResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Only the results whose two sides both carry statistics
    pub fn filter_comparable(&self) -> ResultSet {
        self.iter()
            .filter(|result| result.is_comparable())
            .cloned()
            .collect()
    }

    /// Pretty JSON array with a trailing newline
    pub fn serialize(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Parse a document produced by [`ResultSet::serialize`]
    pub fn deserialize(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Write the JSON document to `path`, replacing it atomically
    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_atomically(path, &self.serialize()?)?;
        debug!("wrote {} result(s) to {}", self.len(), path.display());
        Ok(())
    }

    /// Write the Markdown report to `path`, replacing it atomically
    pub fn write_markdown(&self, path: &Path) -> Result<()> {
        write_atomically(path, &reporter::render_markdown(self))?;
        debug!("wrote report for {} result(s) to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a JSON document written by [`ResultSet::write_json`]
    pub fn read_json(path: &Path) -> Result<Self> {
        Self::deserialize(&fs::read_to_string(path)?)
    }
}

/// Replace `path` with `contents` through a synced temp file in the same directory
///
/// Readers see either the old file or the complete new one. The target
/// directory must already exist.
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl FromIterator<BenchmarkResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = BenchmarkResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ResultSet {
    type Item = BenchmarkResult;
    type IntoIter = std::vec::IntoIter<BenchmarkResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a BenchmarkResult;
    type IntoIter = std::slice::Iter<'a, BenchmarkResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
