//! Benchmark catalog module
//!
//! A catalog is a directory whose immediate subdirectories are benchmarks. A
//! subdirectory counts as a benchmark iff it holds a [`METADATA_FILE`]; anything
//! else is ignored. Side artifacts sit next to the metadata file under
//! conventional names given by each side's [`SideLayout`].
//!
//! Metadata is a static TOML record and is only ever parsed, never executed.

use crate::environment::Side;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Metadata file marking a directory as a benchmark
pub const METADATA_FILE: &str = "bench.toml";

/// Where one side's artifact and optional input live inside a benchmark directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideLayout {
    artifact: String,
    input: Option<String>,
    default_input: Option<String>,
}

impl SideLayout {
    /// Layout with just an artifact file name
    pub fn new(artifact: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            input: None,
            default_input: None,
        }
    }

    /// Optional sibling input file name
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Value substituted for the input when the input file is absent
    #[must_use]
    pub fn with_default_input(mut self, default_input: impl Into<String>) -> Self {
        self.default_input = Some(default_input.into());
        self
    }

    fn locate(&self, dir: &Path) -> Option<SideArtifact> {
        let path = dir.join(&self.artifact);
        if !path.is_file() {
            return None;
        }

        let input = self
            .input
            .as_ref()
            .map(|name| dir.join(name))
            .filter(|input| input.is_file())
            .map(|input| input.to_string_lossy().into_owned())
            .or_else(|| self.default_input.clone());

        Some(SideArtifact { path, input })
    }
}

/// A located side artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideArtifact {
    /// Artifact path handed to the environment's entry point
    pub path: PathBuf,
    /// Resolved input (sibling file path or configured default)
    pub input: Option<String>,
}

/// One benchmark as found in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkDefinition {
    /// Unique name, the directory name
    pub name: String,
    /// Human-readable description from the metadata file
    pub description: String,
    /// Benchmark directory
    pub dir: PathBuf,
    /// Baseline artifact, if present
    pub baseline: Option<SideArtifact>,
    /// Candidate artifact, if present
    pub candidate: Option<SideArtifact>,
}

impl BenchmarkDefinition {
    /// Artifact for `side`, if present
    pub fn artifact(&self, side: Side) -> Option<&SideArtifact> {
        match side {
            Side::Baseline => self.baseline.as_ref(),
            Side::Candidate => self.candidate.as_ref(),
        }
    }

    /// At least one side has something to run
    pub fn is_runnable(&self) -> bool {
        self.baseline.is_some() || self.candidate.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
struct BenchmarkMetadata {
    description: Option<String>,
}

/// Directory-backed benchmark catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    baseline: SideLayout,
    candidate: SideLayout,
}

impl Catalog {
    /// Catalog at `root` with the conventional artifact names
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            baseline: SideLayout::new("playbook.yml")
                .with_input("inventory")
                .with_default_input("localhost,"),
            candidate: SideLayout::new("script.py"),
        }
    }

    /// Replace the layout used for `side`
    #[must_use]
    pub fn with_layout(mut self, side: Side, layout: SideLayout) -> Self {
        match side {
            Side::Baseline => self.baseline = layout,
            Side::Candidate => self.candidate = layout,
        }
        self
    }

    /// Catalog root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of all benchmarks, sorted; a missing root is an empty catalog
    pub fn discover(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("catalog root {} does not exist", self.root.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_dir() || !path.join(METADATA_FILE).is_file() {
                continue;
            }
            match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => names.push(name.to_owned()),
                None => debug!("skipping non UTF-8 benchmark directory {}", path.display()),
            }
        }

        names.sort();
        Ok(names)
    }

    /// Description from the metadata file, falling back to the name
    pub fn describe(&self, name: &str) -> Result<String> {
        self.ensure_known(name)?;
        self.load_description(name)
    }

    /// Full definition of a discovered benchmark
    pub fn resolve(&self, name: &str) -> Result<BenchmarkDefinition> {
        self.ensure_known(name)?;
        self.build_definition(name)
    }

    /// Resolve every requested name before anything runs; no names means all
    pub fn resolve_all(&self, names: &[String]) -> Result<Vec<BenchmarkDefinition>> {
        let available = self.discover()?;
        let selected: Vec<&String> = if names.is_empty() {
            available.iter().collect()
        } else {
            names.iter().collect()
        };

        selected
            .into_iter()
            .map(|name| {
                if available.contains(name) {
                    self.build_definition(name)
                } else {
                    Err(Error::not_found(name.as_str(), available.clone()))
                }
            })
            .collect()
    }

    fn ensure_known(&self, name: &str) -> Result<()> {
        let available = self.discover()?;
        if available.iter().any(|known| known == name) {
            Ok(())
        } else {
            Err(Error::not_found(name, available))
        }
    }

    fn build_definition(&self, name: &str) -> Result<BenchmarkDefinition> {
        let dir = self.root.join(name);
        let definition = BenchmarkDefinition {
            name: name.to_owned(),
            description: self.load_description(name)?,
            baseline: self.baseline.locate(&dir),
            candidate: self.candidate.locate(&dir),
            dir,
        };

        if !definition.is_runnable() {
            debug!("{name} has metadata but no side artifacts");
        }
        Ok(definition)
    }

    fn load_description(&self, name: &str) -> Result<String> {
        let path = self.root.join(name).join(METADATA_FILE);
        let content = fs::read_to_string(&path)?;
        let metadata: BenchmarkMetadata =
            toml::from_str(&content).map_err(|e| Error::InvalidMetadata {
                path: path.clone(),
                message: e.message().to_owned(),
            })?;

        Ok(metadata
            .description
            .map(|description| description.trim().to_owned())
            .filter(|description| !description.is_empty())
            .unwrap_or_else(|| name.to_owned()))
    }
}
