//! Report rendering for analysis results.
//!
//! Pure formatting over [`AnalysisResult`] values: the console report, the
//! saved markdown report, and the multi-file batch summary. All writers are
//! generic over [`io::Write`] so tests capture output in memory.

use std::io;

use crate::analyze::AnalysisResult;

const RULE_WIDTH: usize = 70;

/// Format seconds as a compact human-readable duration: `2h 3m 4s`,
/// `3m 4s`, or `4s`.
pub fn format_duration(seconds: f64) -> String {
    let hours = (seconds / 3600.0) as i64;
    let minutes = ((seconds % 3600.0) / 60.0) as i64;
    let secs = (seconds % 60.0) as i64;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Write the console report for one analyzed file.
///
/// Anomaly details are truncated to the first 10 entries; `verbose` adds a
/// listing of every interval.
pub fn write_report<W: io::Write>(
    out: &mut W,
    result: &AnalysisResult,
    verbose: bool,
) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{rule}")?;
    writeln!(out, "GPX Analysis: {}", result.source)?;
    writeln!(out, "{rule}")?;

    writeln!(out, "\n[STATISTICS] General Statistics:")?;
    writeln!(out, "  Total waypoints: {}", result.total_waypoints)?;
    writeln!(
        out,
        "  Total duration: {}",
        format_duration(result.total_duration_seconds)
    )?;
    writeln!(
        out,
        "  Total distance: {:.2} km",
        result.stats.total_distance_m / 1000.0
    )?;

    writeln!(out, "\n[INTERVALS] Interval Statistics:")?;
    writeln!(out, "  Mean interval: {:.2}s", result.stats.mean_interval)?;
    writeln!(out, "  Median interval: {:.2}s", result.stats.median_interval)?;
    writeln!(
        out,
        "  Standard deviation: {:.2}s",
        result.stats.stdev_interval
    )?;
    writeln!(out, "  Min interval: {:.2}s", result.stats.min_interval)?;
    writeln!(
        out,
        "  Max interval: {}",
        format_duration(result.stats.max_interval)
    )?;

    writeln!(out, "\n[ANOMALIES] Anomalies:")?;
    writeln!(out, "  Total anomalies: {}", result.stats.anomaly_count)?;
    writeln!(
        out,
        "  Anomaly percentage: {:.1}%",
        result.stats.anomaly_percentage
    )?;

    if !result.anomalies.is_empty() {
        writeln!(out, "\n  Detailed anomalies:")?;
        for (i, anomaly) in result.anomalies.iter().take(10).enumerate() {
            let description = anomaly
                .anomaly
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_default();
            writeln!(out, "    {}. {description}", i + 1)?;
            writeln!(out, "       From: {}", anomaly.from.timestamp.format("%H:%M:%S"))?;
            writeln!(out, "       To:   {}", anomaly.to.timestamp.format("%H:%M:%S"))?;
            writeln!(out, "       Distance: {:.1}m", anomaly.distance_m)?;
            if anomaly.speed_ms > 0.0 {
                writeln!(out, "       Speed: {:.1} km/h", anomaly.speed_ms * 3.6)?;
            }
            writeln!(out)?;
        }

        if result.anomalies.len() > 10 {
            writeln!(
                out,
                "    ... and {} more anomalies",
                result.anomalies.len() - 10
            )?;
        }
    }

    if verbose && !result.intervals.is_empty() {
        writeln!(out, "\n[DETAILS] All Intervals:")?;
        for (i, interval) in result.intervals.iter().enumerate() {
            let marker = if interval.is_anomaly() { "[!]" } else { "[ ]" };
            writeln!(
                out,
                "{marker} [{}] {:.2}s | {:.1}m | {:.1} km/h",
                i + 1,
                interval.seconds,
                interval.distance_m,
                interval.speed_ms * 3.6
            )?;
        }
    }

    Ok(())
}

/// Write the saved report artifact for a batch of results, in markdown.
pub fn write_markdown<W: io::Write>(out: &mut W, results: &[AnalysisResult]) -> io::Result<()> {
    writeln!(out, "# GPX Interval Analysis Report\n")?;

    for result in results {
        writeln!(out, "## {}\n", result.source)?;
        writeln!(out, "- Total waypoints: {}", result.total_waypoints)?;
        writeln!(
            out,
            "- Total duration: {}",
            format_duration(result.total_duration_seconds)
        )?;
        writeln!(out, "- Mean interval: {:.2}s", result.stats.mean_interval)?;
        writeln!(out, "- Anomalies: {}\n", result.stats.anomaly_count)?;

        if !result.anomalies.is_empty() {
            writeln!(out, "### Anomalies:\n")?;
            for anomaly in &result.anomalies {
                let description = anomaly
                    .anomaly
                    .as_ref()
                    .map(|a| a.to_string())
                    .unwrap_or_default();
                writeln!(out, "- {description}")?;
                writeln!(
                    out,
                    "  Time: {} -> {}",
                    anomaly.from.timestamp.to_rfc3339(),
                    anomaly.to.timestamp.to_rfc3339()
                )?;
                writeln!(out, "  Interval: {:.2}s\n", anomaly.seconds)?;
            }
        }
    }

    Ok(())
}

/// Write the cross-file summary shown after a multi-file batch.
pub fn write_batch_summary<W: io::Write>(
    out: &mut W,
    results: &[AnalysisResult],
) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{rule}")?;
    writeln!(out, "SUMMARY: Analyzed {} files", results.len())?;
    writeln!(out, "{rule}")?;

    let total_waypoints: usize = results.iter().map(|r| r.total_waypoints).sum();
    let total_anomalies: usize = results.iter().map(|r| r.stats.anomaly_count).sum();
    let files_with_anomalies = results.iter().filter(|r| !r.anomalies.is_empty()).count();

    writeln!(out, "  Total waypoints: {total_waypoints}")?;
    writeln!(out, "  Total anomalies: {total_anomalies}")?;
    writeln!(
        out,
        "  Files with anomalies: {files_with_anomalies}/{}",
        results.len()
    )?;

    Ok(())
}
