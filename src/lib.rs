//! # GPX Cadence
//!
//! Waypoint interval analysis and recording-cadence anomaly detection for
//! GPX track logs.
//!
//! This library provides:
//! - Tolerant waypoint extraction from GPX documents whose namespace and
//!   tag conventions vary by producer
//! - Interval statistics (mean/median/stdev cadence, distance, speed)
//! - Two-pass anomaly classification: large gaps, too-frequent samples,
//!   and statistically inconsistent intervals
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use gpx_cadence::{analyze_intervals, AnalysisConfig, Waypoint};
//!
//! // Five waypoints recorded 10 seconds apart
//! let waypoints: Vec<Waypoint> = (0u32..5)
//!     .map(|i| {
//!         Waypoint::new(
//!             51.5074 + i as f64 * 0.0001,
//!             -0.1278,
//!             Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, i * 10).unwrap(),
//!         )
//!     })
//!     .collect();
//!
//! let result = analyze_intervals("track.gpx", &waypoints, &AnalysisConfig::default());
//! assert_eq!(result.intervals.len(), 4);
//! assert_eq!(result.stats.anomaly_count, 0);
//! assert!((result.stats.mean_interval - 10.0).abs() < 1e-9);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{CadenceError, Result};

// Timestamp normalization (heterogeneous producer formats -> UTC)
pub mod timestamp;
pub use timestamp::parse_timestamp;

// Geographic utilities (great-circle distance)
pub mod geo_utils;
pub use geo_utils::haversine_distance;

// Waypoint extraction from GPX documents
pub mod extract;
pub use extract::{extract_waypoints, extract_waypoints_from_str};

// Interval construction, anomaly classification, statistics
pub mod analyze;
pub use analyze::{analyze_intervals, AnalysisResult, Anomaly, Interval, IntervalStats};

// Report rendering (console text, saved markdown, batch summary)
pub mod report;
pub use report::{format_duration, write_batch_summary, write_markdown, write_report};

// Structural diagnostics for GPX documents
pub mod inspect;
pub use inspect::{inspect_document, write_summary, DocumentSummary};

// ============================================================================
// Core Types
// ============================================================================

/// A single timestamped GPS sample from a track log.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use gpx_cadence::Waypoint;
///
/// let wp = Waypoint::new(51.5074, -0.1278, Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap());
/// assert_eq!(wp.elevation, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Elevation in meters (0.0 when the document carries none)
    pub elevation: f64,
    /// Sample instant, normalized to UTC
    pub timestamp: DateTime<Utc>,
    /// Device-reported horizontal accuracy in meters (optional)
    pub accuracy: Option<f64>,
    /// Device-reported speed in m/s (optional, distinct from computed speed)
    pub speed: Option<f64>,
}

impl Waypoint {
    /// Create a waypoint with no elevation or device extensions.
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            elevation: 0.0,
            timestamp,
            accuracy: None,
            speed: None,
        }
    }
}

/// Configuration for interval anomaly classification.
///
/// Both thresholds are explicit inputs to [`analyze_intervals`]; there are
/// no module-level defaults beyond this struct's [`Default`] impl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Intervals longer than this many seconds are flagged as gaps.
    /// Default: 120.0
    pub gap_threshold_seconds: f64,

    /// Positive intervals shorter than this many seconds are flagged as
    /// too-frequent sampling. Default: 0.5
    pub min_interval_seconds: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gap_threshold_seconds: 120.0,
            min_interval_seconds: 0.5,
        }
    }
}
