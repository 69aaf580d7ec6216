//! Statistics module
//!
//! Reduces one side's run outcomes to descriptive statistics and compares the
//! two sides of a benchmark.

use crate::runner::RunOutcome;
use serde::{Deserialize, Serialize};

/// Marker text for a side whose every attempted run failed
pub const ALL_RUNS_FAILED: &str = "all runs failed";

/// Descriptive statistics over the successful runs of one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    /// Successful elapsed times in seconds, in run order
    pub times: Vec<f64>,
    /// Arithmetic mean of `times`
    pub mean: f64,
    /// Smallest of `times`
    pub min: f64,
    /// Largest of `times`
    pub max: f64,
}

impl SideStats {
    /// Compute statistics over `times`; `None` for an empty sequence
    pub fn from_times(times: Vec<f64>) -> Option<Self> {
        if times.is_empty() {
            return None;
        }

        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Rounding in the sum can push the mean a hair outside [min, max].
        let mean = (times.iter().sum::<f64>() / times.len() as f64).clamp(min, max);

        Some(Self {
            times,
            mean,
            min,
            max,
        })
    }
}

/// Side marker replacing statistics when no run succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMarker {
    /// Why no statistics exist
    pub error: String,
}

impl ErrorMarker {
    /// The marker for a side whose every run failed
    pub fn all_runs_failed() -> Self {
        Self {
            error: ALL_RUNS_FAILED.to_owned(),
        }
    }
}

/// What is known about one attempted side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SideSummary {
    /// At least one run succeeded
    Stats(SideStats),
    /// Runs were attempted and all failed
    Failed(ErrorMarker),
}

impl SideSummary {
    /// Statistics, if this side produced any
    pub fn stats(&self) -> Option<&SideStats> {
        match self {
            SideSummary::Stats(stats) => Some(stats),
            SideSummary::Failed(_) => None,
        }
    }

    /// Mean elapsed time, if this side produced statistics
    pub fn mean(&self) -> Option<f64> {
        self.stats().map(|stats| stats.mean)
    }
}

/// Aggregate one side's outcomes
///
/// Returns `None` when nothing was attempted (the side is absent), an
/// [`ErrorMarker`] when everything failed, and [`SideStats`] otherwise.
pub fn aggregate(outcomes: &[RunOutcome]) -> Option<SideSummary> {
    if outcomes.is_empty() {
        return None;
    }

    let times = outcomes
        .iter()
        .filter(|outcome| outcome.success)
        .map(|outcome| outcome.elapsed_secs)
        .collect();

    Some(match SideStats::from_times(times) {
        Some(stats) => SideSummary::Stats(stats),
        None => SideSummary::Failed(ErrorMarker::all_runs_failed()),
    })
}

/// Baseline mean over candidate mean; above 1 means the candidate is faster
///
/// Defined only when both sides have statistics and the candidate mean is
/// positive, so the ratio is always finite.
pub fn speedup(baseline: &SideSummary, candidate: &SideSummary) -> Option<f64> {
    let baseline = baseline.stats()?;
    let candidate = candidate.stats()?;
    (candidate.mean > 0.0).then(|| baseline.mean / candidate.mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn successes(times: &[f64]) -> Vec<RunOutcome> {
        times.iter().map(|t| RunOutcome::succeeded(*t, None)).collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    /// **What is tested:** Mean, min and max of a simple sequence
    /// **Why it is tested:** Core aggregation used for every benchmark
    /// **Test conditions:** Baseline times 1.0, 1.2, 0.8
    /// **Expectations:** mean 1.0, min 0.8, max 1.2, times kept in run order
    #[test]
    fn test_side_stats_scenario() {
        let stats = SideStats::from_times(vec![1.0, 1.2, 0.8]).expect("non-empty");
        assert_close(stats.mean, 1.0);
        assert_eq!(stats.min, 0.8);
        assert_eq!(stats.max, 1.2);
        assert_eq!(stats.times, vec![1.0, 1.2, 0.8]);
    }

    /// **What is tested:** Mean stays within [min, max] for repeated values
    /// **Why it is tested:** 0.1 * 3 / 3 is slightly above 0.1 in floating point
    #[test]
    fn test_mean_clamped_for_equal_values() {
        let stats = SideStats::from_times(vec![0.1, 0.1, 0.1]).expect("non-empty");
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
        assert_eq!(stats.mean, 0.1);
    }

    /// **What is tested:** Empty input gives no statistics
    #[test]
    fn test_side_stats_empty() {
        assert!(SideStats::from_times(Vec::new()).is_none());
    }

    /// **What is tested:** aggregate distinguishes absent, failed and measured sides
    /// **Why it is tested:** An absent side and a failed side are reported differently
    /// **Test conditions:** No outcomes; three failures; a mix of failures and successes
    /// **Expectations:** None; ErrorMarker; stats over the successes only
    #[test]
    fn test_aggregate_cases() {
        assert_eq!(aggregate(&[]), None);

        let failures = vec![RunOutcome::failed(0.3, Some("boom".to_owned())); 3];
        assert_eq!(
            aggregate(&failures),
            Some(SideSummary::Failed(ErrorMarker::all_runs_failed()))
        );

        let mixed = vec![
            RunOutcome::failed(9.0, None),
            RunOutcome::succeeded(0.5, None),
            RunOutcome::succeeded(0.7, None),
        ];
        let summary = aggregate(&mixed).expect("attempted");
        let stats = summary.stats().expect("has successes");
        assert_eq!(stats.times, vec![0.5, 0.7]);
        assert_close(stats.mean, 0.6);
        assert_eq!(stats.max, 0.7);
    }

    /// **What is tested:** Speedup from the documented scenario
    /// **Test conditions:** Baseline 1.0/1.2/0.8, candidate 0.5/0.4/0.6
    /// **Expectations:** Speedup 2.0, equal to the ratio of the two means
    #[test]
    fn test_speedup_scenario() {
        let baseline = aggregate(&successes(&[1.0, 1.2, 0.8])).expect("baseline");
        let candidate = aggregate(&successes(&[0.5, 0.4, 0.6])).expect("candidate");

        let ratio = speedup(&baseline, &candidate).expect("both sides measured");
        assert_close(ratio, 2.0);
        assert_eq!(
            ratio,
            baseline.mean().expect("mean") / candidate.mean().expect("mean")
        );
    }

    /// **What is tested:** Speedup is absent, never zero or one, when a side has no statistics
    #[test]
    fn test_speedup_absent() {
        let measured = aggregate(&successes(&[1.0])).expect("measured");
        let failed = SideSummary::Failed(ErrorMarker::all_runs_failed());
        let zero = aggregate(&successes(&[0.0])).expect("measured");

        assert_eq!(speedup(&measured, &failed), None);
        assert_eq!(speedup(&failed, &measured), None);
        assert_eq!(speedup(&failed, &failed), None);
        assert_eq!(speedup(&measured, &zero), None);
    }

    /// **What is tested:** Untagged serialization of both summary shapes
    /// **Why it is tested:** External chart tooling reads `{times, mean, min, max}` or `{error}` objects
    #[test]
    fn test_summary_json_shape() {
        let stats = aggregate(&successes(&[2.0])).expect("measured");
        let json = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(json["mean"], 2.0);
        assert_eq!(json["times"][0], 2.0);

        let failed = SideSummary::Failed(ErrorMarker::all_runs_failed());
        assert_eq!(
            serde_json::to_string(&failed).expect("serialize"),
            r#"{"error":"all runs failed"}"#
        );
    }
}
