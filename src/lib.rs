//! dual-bench library
//!
//! Side-by-side wall-clock benchmarks of two tools that cannot share an
//! installation. Each tool lives in its own environment; every benchmark in the
//! catalog is run `N` times per side, strictly sequentially, and reduced to
//! mean/min/max plus a speedup ratio.
//!
//! # Examples
//!
//! Aggregating and storing results:
//!
//! ```rust
//! use dual_bench::{stats, BenchmarkResult, ResultSet, RunOutcome};
//!
//! let baseline = stats::aggregate(&[
//!     RunOutcome::succeeded(1.0, None),
//!     RunOutcome::succeeded(1.2, None),
//!     RunOutcome::succeeded(0.8, None),
//! ]);
//! let candidate = stats::aggregate(&[
//!     RunOutcome::succeeded(0.5, None),
//!     RunOutcome::failed(0.1, Some("boom".to_owned())),
//! ]);
//!
//! let mut results = ResultSet::new();
//! results.append(BenchmarkResult::new("a", "Scenario A", 3, baseline, candidate));
//!
//! let text = results.serialize()?;
//! assert_eq!(ResultSet::deserialize(&text)?, results);
//! let speedup = results.iter().next().and_then(|r| r.speedup());
//! assert!(speedup.is_some_and(|s| (s - 2.0).abs() < 1e-9));
//! # Ok::<(), dual_bench::Error>(())
//! ```

pub mod catalog;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod reporter;
pub mod results;
pub mod runner;
pub mod stats;

pub use catalog::{BenchmarkDefinition, Catalog};
pub use config::{ConfigError, HarnessConfig};
pub use environment::{EnvironmentRegistry, ExecutionEnvironment, Side};
pub use error::{Error, Result};
pub use executor::{ProcessExecutor, SystemProcessExecutor};
pub use results::{BenchmarkResult, ResultSet};
pub use runner::{DualRunner, RunOutcome};
pub use stats::{SideStats, SideSummary};
