//! Summary reporter
//!
//! Pure renderers over a [`ResultSet`]: the console summary table and a
//! Markdown report. Neither touches the data model.

use crate::results::{BenchmarkResult, ResultSet};
use crate::stats::SideSummary;

/// Placeholder for any value that could not be computed
pub const NOT_AVAILABLE: &str = "n/a";

const NAME_WIDTH: usize = 30;
const VALUE_WIDTH: usize = 10;

fn format_mean(side: Option<&SideSummary>) -> String {
    side.and_then(SideSummary::mean)
        .map_or_else(|| NOT_AVAILABLE.to_owned(), |mean| format!("{mean:.3}s"))
}

fn format_speedup(result: &BenchmarkResult) -> String {
    result
        .speedup()
        .map_or_else(|| NOT_AVAILABLE.to_owned(), |speedup| format!("{speedup:.1}x"))
}

fn table_row(cells: [&str; 4]) -> String {
    let [name, baseline, candidate, speedup] = cells;
    format!("  {name:<NAME_WIDTH$} {baseline:>VALUE_WIDTH$} {candidate:>VALUE_WIDTH$} {speedup:>VALUE_WIDTH$}")
}

/// Console summary: header, separator, then one row per result
///
/// Each row shows the baseline mean, the candidate mean and the speedup, with
/// `n/a` wherever a side or the speedup is unavailable.
pub fn render_table(results: &ResultSet) -> String {
    let name_rule = "-".repeat(NAME_WIDTH);
    let value_rule = "-".repeat(VALUE_WIDTH);

    let mut lines = vec![
        table_row(["Benchmark", "Baseline", "Candidate", "Speedup"]),
        table_row([&name_rule, &value_rule, &value_rule, &value_rule]),
    ];
    lines.extend(results.iter().map(|result| {
        table_row([
            result.name(),
            &format_mean(result.baseline()),
            &format_mean(result.candidate()),
            &format_speedup(result),
        ])
    }));

    let mut table = lines.join("\n");
    table.push('\n');
    table
}

fn format_times(side: Option<&SideSummary>) -> String {
    match side {
        None => "not run".to_owned(),
        Some(SideSummary::Failed(marker)) => marker.error.clone(),
        Some(SideSummary::Stats(stats)) => {
            let times: Vec<String> = stats.times.iter().map(|t| format!("{t:.3}s")).collect();
            format!(
                "{} (min {:.3}s, max {:.3}s)",
                times.join(", "),
                stats.min,
                stats.max
            )
        }
    }
}

/// Markdown report with the summary table and each side's raw times
pub fn render_markdown(results: &ResultSet) -> String {
    let mut lines = vec![
        "# Benchmark Summary".to_owned(),
        String::new(),
        "| Benchmark | Baseline | Candidate | Speedup |".to_owned(),
        "|-----------|---------:|----------:|--------:|".to_owned(),
    ];

    for result in results {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            result.name(),
            format_mean(result.baseline()),
            format_mean(result.candidate()),
            format_speedup(result)
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "Comparable benchmarks: {} of {}",
        results.filter_comparable().len(),
        results.len()
    ));

    for result in results {
        lines.push(String::new());
        lines.push(format!("## {}", result.name()));
        lines.push(String::new());
        if !result.description().is_empty() {
            lines.push(result.description().to_owned());
            lines.push(String::new());
        }
        lines.push(format!("- **Runs requested:** {}", result.runs()));
        lines.push(format!("- **Baseline:** {}", format_times(result.baseline())));
        lines.push(format!("- **Candidate:** {}", format_times(result.candidate())));
    }

    let mut report = lines.join("\n");
    report.push('\n');
    report
}
