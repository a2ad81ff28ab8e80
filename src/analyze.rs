//! Interval construction, anomaly classification, and summary statistics.
//!
//! The analyzer is purely computational: given an ordered waypoint sequence
//! and two thresholds it produces an immutable [`AnalysisResult`], never
//! raising for any well-formed input. Classification runs in two passes:
//! threshold rules first (large gap, too-frequent), then a statistical pass
//! that flags intervals deviating more than three standard deviations from
//! the mean cadence.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::{AnalysisConfig, Waypoint};

/// Why an interval was flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Anomaly {
    /// Elapsed time exceeded the gap threshold.
    LargeGap { seconds: f64, threshold: f64 },
    /// Positive elapsed time below the minimum expected interval.
    TooFrequent { seconds: f64, minimum: f64 },
    /// Elapsed time more than three standard deviations from the mean.
    Erratic { z_score: f64 },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::LargeGap { seconds, threshold } => {
                write!(f, "Large gap ({seconds:.1}s > {threshold}s threshold)")
            }
            Anomaly::TooFrequent { seconds, minimum } => {
                write!(f, "Very short interval ({seconds:.2}s < {minimum}s minimum)")
            }
            Anomaly::Erratic { z_score } => {
                write!(f, "Inconsistent interval (z-score: {z_score:.2})")
            }
        }
    }
}

/// The derived relationship between two temporally adjacent waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub from: Waypoint,
    pub to: Waypoint,
    /// Elapsed time in seconds (zero or negative only for pathological input)
    pub seconds: f64,
    /// Great-circle distance in meters
    pub distance_m: f64,
    /// Computed average speed in m/s (0 when elapsed time is not positive)
    pub speed_ms: f64,
    /// Set at most once across the two classification passes
    pub anomaly: Option<Anomaly>,
}

impl Interval {
    pub fn is_anomaly(&self) -> bool {
        self.anomaly.is_some()
    }
}

/// Summary statistics over a track's intervals.
///
/// Mean, median, standard deviation, min, and max cover only intervals with
/// strictly positive elapsed time; total distance covers every interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub mean_interval: f64,
    pub median_interval: f64,
    /// Sample standard deviation (n-1 divisor), 0 below 2 samples
    pub stdev_interval: f64,
    pub min_interval: f64,
    pub max_interval: f64,
    pub total_distance_m: f64,
    pub anomaly_count: usize,
    /// Share of flagged intervals, as a percentage of the interval count
    pub anomaly_percentage: f64,
}

/// Complete analysis of one track, constructed once analysis finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Source identifier (typically the file path)
    pub source: String,
    pub total_waypoints: usize,
    /// Last timestamp minus first, in seconds
    pub total_duration_seconds: f64,
    /// All intervals in chronological order
    pub intervals: Vec<Interval>,
    /// Flagged intervals: threshold-rule flags in chronological order,
    /// statistical flags appended after
    pub anomalies: Vec<Interval>,
    pub stats: IntervalStats,
}

/// Analyze the intervals between consecutive waypoints.
///
/// Pure function of the waypoint sequence and the configured thresholds:
/// repeated runs yield identical results. Fewer than two waypoints produce
/// a zero-valued result rather than an error.
pub fn analyze_intervals(
    source: &str,
    waypoints: &[Waypoint],
    config: &AnalysisConfig,
) -> AnalysisResult {
    if waypoints.len() < 2 {
        return AnalysisResult {
            source: source.to_string(),
            total_waypoints: waypoints.len(),
            total_duration_seconds: 0.0,
            intervals: Vec::new(),
            anomalies: Vec::new(),
            stats: IntervalStats::default(),
        };
    }

    let mut intervals: Vec<Interval> = Vec::with_capacity(waypoints.len() - 1);
    for pair in waypoints.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let seconds = elapsed_seconds(from, to);
        let distance_m = haversine_distance(from.lat, from.lon, to.lat, to.lon);
        let speed_ms = if seconds > 0.0 { distance_m / seconds } else { 0.0 };

        // First-pass classification; first matching rule wins. Intervals
        // with non-positive elapsed time fall through unflagged.
        let anomaly = if seconds > config.gap_threshold_seconds {
            Some(Anomaly::LargeGap {
                seconds,
                threshold: config.gap_threshold_seconds,
            })
        } else if seconds > 0.0 && seconds < config.min_interval_seconds {
            Some(Anomaly::TooFrequent {
                seconds,
                minimum: config.min_interval_seconds,
            })
        } else {
            None
        };

        intervals.push(Interval {
            from: from.clone(),
            to: to.clone(),
            seconds,
            distance_m,
            speed_ms,
            anomaly,
        });
    }

    // Statistics cover only intervals with strictly positive elapsed time.
    let positive: Vec<f64> = intervals
        .iter()
        .map(|i| i.seconds)
        .filter(|&s| s > 0.0)
        .collect();

    let mean_interval = mean(&positive);
    let stdev_interval = sample_stdev(&positive);

    // Second pass: flag intervals that deviate from the established cadence.
    // Requires enough samples and spread for a meaningful z-score; already
    // flagged intervals are never re-evaluated.
    if positive.len() > 2 && stdev_interval > 0.0 {
        for interval in &mut intervals {
            if interval.anomaly.is_none() && interval.seconds > 0.0 {
                let z_score = (interval.seconds - mean_interval).abs() / stdev_interval;
                if z_score > 3.0 {
                    interval.anomaly = Some(Anomaly::Erratic { z_score });
                }
            }
        }
    }

    let anomalies = collect_anomalies(&intervals);
    debug!(
        "{source}: {} intervals, {} anomalies",
        intervals.len(),
        anomalies.len()
    );

    let total_distance_m = intervals.iter().map(|i| i.distance_m).sum();
    let anomaly_percentage = if intervals.is_empty() {
        0.0
    } else {
        anomalies.len() as f64 / intervals.len() as f64 * 100.0
    };

    let stats = IntervalStats {
        mean_interval,
        median_interval: median(&positive),
        stdev_interval,
        min_interval: positive.iter().copied().reduce(f64::min).unwrap_or(0.0),
        max_interval: positive.iter().copied().reduce(f64::max).unwrap_or(0.0),
        total_distance_m,
        anomaly_count: anomalies.len(),
        anomaly_percentage,
    };

    let first = &waypoints[0];
    let last = &waypoints[waypoints.len() - 1];

    AnalysisResult {
        source: source.to_string(),
        total_waypoints: waypoints.len(),
        total_duration_seconds: elapsed_seconds(first, last),
        intervals,
        anomalies,
        stats,
    }
}

/// Flagged intervals in report order: threshold-rule flags first, in
/// chronological order, then statistical flags.
fn collect_anomalies(intervals: &[Interval]) -> Vec<Interval> {
    let mut anomalies: Vec<Interval> = intervals
        .iter()
        .filter(|i| {
            matches!(
                i.anomaly,
                Some(Anomaly::LargeGap { .. }) | Some(Anomaly::TooFrequent { .. })
            )
        })
        .cloned()
        .collect();
    anomalies.extend(
        intervals
            .iter()
            .filter(|i| matches!(i.anomaly, Some(Anomaly::Erratic { .. })))
            .cloned(),
    );
    anomalies
}

fn elapsed_seconds(from: &Waypoint, to: &Waypoint) -> f64 {
    let delta = to.timestamp.signed_duration_since(from.timestamp);
    delta.num_milliseconds() as f64 / 1000.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation (n-1 divisor); 0 below two samples.
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
    }

    /// Waypoints at the given offsets (in milliseconds) from the base time,
    /// stepping slightly north each sample.
    fn track(offsets_ms: &[i64]) -> Vec<Waypoint> {
        offsets_ms
            .iter()
            .enumerate()
            .map(|(i, &ms)| {
                Waypoint::new(
                    47.0 + i as f64 * 0.0001,
                    8.5,
                    base_time() + Duration::milliseconds(ms),
                )
            })
            .collect()
    }

    #[test]
    fn test_uniform_cadence_has_no_anomalies() {
        // Scenario A: 5 waypoints at 10-second spacing
        let waypoints = track(&[0, 10_000, 20_000, 30_000, 40_000]);
        let result = analyze_intervals("a.gpx", &waypoints, &AnalysisConfig::default());

        assert_eq!(result.total_waypoints, 5);
        assert_eq!(result.intervals.len(), 4);
        assert_eq!(result.anomalies.len(), 0);
        assert_eq!(result.stats.anomaly_count, 0);
        assert!((result.stats.mean_interval - 10.0).abs() < 1e-9);
        assert!((result.stats.median_interval - 10.0).abs() < 1e-9);
        assert!((result.stats.stdev_interval).abs() < 1e-9);
        assert!((result.total_duration_seconds - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_large_gap_flagged() {
        // Scenario B: t = 0, 10, 200, 210 with the default 120s threshold
        let waypoints = track(&[0, 10_000, 200_000, 210_000]);
        let result = analyze_intervals("b.gpx", &waypoints, &AnalysisConfig::default());

        assert_eq!(result.intervals.len(), 3);
        assert_eq!(result.anomalies.len(), 1);
        let gap = &result.anomalies[0];
        assert!((gap.seconds - 190.0).abs() < 1e-9);
        assert!(matches!(
            gap.anomaly,
            Some(Anomaly::LargeGap { threshold, .. }) if threshold == 120.0
        ));
        assert!(!result.intervals[0].is_anomaly());
        assert!(!result.intervals[2].is_anomaly());
    }

    #[test]
    fn test_too_frequent_flagged() {
        // Scenario C: two samples 0.1s apart
        let waypoints = track(&[0, 100]);
        let result = analyze_intervals("c.gpx", &waypoints, &AnalysisConfig::default());

        assert_eq!(result.anomalies.len(), 1);
        assert!(matches!(
            result.anomalies[0].anomaly,
            Some(Anomaly::TooFrequent { minimum, .. }) if minimum == 0.5
        ));
        assert_eq!(
            result.anomalies[0].anomaly.as_ref().unwrap().to_string(),
            "Very short interval (0.10s < 0.5s minimum)"
        );
    }

    #[test]
    fn test_degenerate_inputs() {
        // Scenario D: zero or one waypoint
        for waypoints in [Vec::new(), track(&[0])] {
            let result = analyze_intervals("d.gpx", &waypoints, &AnalysisConfig::default());
            assert_eq!(result.total_waypoints, waypoints.len());
            assert!(result.intervals.is_empty());
            assert!(result.anomalies.is_empty());
            assert_eq!(result.stats, IntervalStats::default());
            assert_eq!(result.total_duration_seconds, 0.0);
        }
    }

    #[test]
    fn test_statistical_outlier_second_pass() {
        // Steady 10s cadence with one 100s interval: below the gap
        // threshold, but far outside the established pattern.
        let mut offsets: Vec<i64> = (0..20).map(|i| i * 10_000).collect();
        offsets.push(190_000 + 100_000);
        let waypoints = track(&offsets);
        let result = analyze_intervals("e.gpx", &waypoints, &AnalysisConfig::default());

        assert_eq!(result.anomalies.len(), 1);
        match &result.anomalies[0].anomaly {
            Some(Anomaly::Erratic { z_score }) => assert!(*z_score > 3.0),
            other => panic!("expected statistical flag, got {other:?}"),
        }
    }

    #[test]
    fn test_second_pass_skips_already_flagged() {
        // The 190s interval is flagged as a gap in pass one; pass two must
        // not reclassify it even though its z-score is extreme.
        let offsets: Vec<i64> = vec![0, 10_000, 20_000, 30_000, 220_000, 230_000];
        let waypoints = track(&offsets);
        let result = analyze_intervals("f.gpx", &waypoints, &AnalysisConfig::default());

        let gaps = result
            .anomalies
            .iter()
            .filter(|i| matches!(i.anomaly, Some(Anomaly::LargeGap { .. })))
            .count();
        assert_eq!(gaps, 1);
        assert_eq!(result.anomalies.len(), 1);
    }

    #[test]
    fn test_zero_elapsed_interval_boundary_policy() {
        // Duplicate timestamps: not a gap, not too-frequent (that rule
        // requires elapsed > 0), excluded from cadence statistics, but the
        // distance still counts.
        let waypoints = track(&[0, 0, 10_000]);
        let result = analyze_intervals("g.gpx", &waypoints, &AnalysisConfig::default());

        assert_eq!(result.intervals.len(), 2);
        assert!(!result.intervals[0].is_anomaly());
        assert_eq!(result.intervals[0].speed_ms, 0.0);
        assert_eq!(result.anomalies.len(), 0);
        assert!((result.stats.mean_interval - 10.0).abs() < 1e-9);
        assert!(result.stats.total_distance_m > result.intervals[1].distance_m);
    }

    #[test]
    fn test_negative_elapsed_interval_unflagged() {
        // Pathological unsorted input handed straight to the analyzer.
        let mut waypoints = track(&[0, 10_000]);
        waypoints.swap(0, 1);
        let result = analyze_intervals("h.gpx", &waypoints, &AnalysisConfig::default());

        assert_eq!(result.intervals.len(), 1);
        assert!((result.intervals[0].seconds + 10.0).abs() < 1e-9);
        assert!(!result.intervals[0].is_anomaly());
        assert_eq!(result.intervals[0].speed_ms, 0.0);
        assert_eq!(result.stats.mean_interval, 0.0);
        assert!(result.stats.total_distance_m > 0.0);
    }

    #[test]
    fn test_total_distance_includes_anomalous_intervals() {
        let waypoints = track(&[0, 10_000, 200_000]);
        let result = analyze_intervals("i.gpx", &waypoints, &AnalysisConfig::default());

        let summed: f64 = result.intervals.iter().map(|i| i.distance_m).sum();
        assert!((result.stats.total_distance_m - summed).abs() < 1e-9);
        assert_eq!(result.stats.anomaly_count, 1);
    }

    #[test]
    fn test_anomaly_percentage() {
        let waypoints = track(&[0, 10_000, 200_000, 210_000]);
        let result = analyze_intervals("j.gpx", &waypoints, &AnalysisConfig::default());
        assert!((result.stats.anomaly_percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_thresholds() {
        let waypoints = track(&[0, 10_000, 75_000]);
        let config = AnalysisConfig {
            gap_threshold_seconds: 60.0,
            min_interval_seconds: 15.0,
        };
        let result = analyze_intervals("k.gpx", &waypoints, &config);

        assert_eq!(result.anomalies.len(), 2);
        assert!(matches!(
            result.anomalies[0].anomaly,
            Some(Anomaly::TooFrequent { .. })
        ));
        assert!(matches!(
            result.anomalies[1].anomaly,
            Some(Anomaly::LargeGap { .. })
        ));
    }

    #[test]
    fn test_idempotence() {
        let waypoints = track(&[0, 10_000, 20_500, 200_000, 200_100]);
        let config = AnalysisConfig::default();
        let first = analyze_intervals("l.gpx", &waypoints, &config);
        let second = analyze_intervals("l.gpx", &waypoints, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_anomaly_display_strings() {
        let gap = Anomaly::LargeGap {
            seconds: 190.0,
            threshold: 120.0,
        };
        assert_eq!(gap.to_string(), "Large gap (190.0s > 120s threshold)");

        let erratic = Anomaly::Erratic { z_score: 4.257 };
        assert_eq!(erratic.to_string(), "Inconsistent interval (z-score: 4.26)");
    }

    #[test]
    fn test_stats_helpers() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(sample_stdev(&[5.0]), 0.0);
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
        assert!((median(&[4.0, 1.0, 2.0, 3.0]) - 2.5).abs() < 1e-12);
        // Sample stdev of [2, 4, 4, 4, 5, 5, 7, 9] is ~2.138
        let s = sample_stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((s - 2.138).abs() < 0.001);
    }
}
