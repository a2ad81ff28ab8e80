//! Timestamp normalization for heterogeneous GPX producers.
//!
//! Track recorders disagree on timestamp shape: fractional vs whole seconds,
//! a literal `Z` suffix, a numeric offset, or no zone marker at all. Parsing
//! walks an ordered table of known shapes and stops at the first match, so a
//! new producer format is one table entry away.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Calendar semantics attached to a timestamp pattern.
#[derive(Debug, Clone, Copy)]
enum Flavor {
    /// Pattern carries no zone information (or a literal `Z`); the wall
    /// time is taken as UTC.
    AssumeUtc,
    /// Pattern carries an explicit numeric offset; the instant is converted
    /// to UTC.
    WithOffset,
}

/// One recognized timestamp shape. Ordered first-match-wins.
struct TimestampFormat {
    pattern: &'static str,
    flavor: Flavor,
}

/// Known producer formats, most specific first.
const FORMATS: &[TimestampFormat] = &[
    // Fractional seconds, literal Z suffix: 2024-03-10T09:00:00.350Z
    TimestampFormat {
        pattern: "%Y-%m-%dT%H:%M:%S%.fZ",
        flavor: Flavor::AssumeUtc,
    },
    // Whole seconds, literal Z suffix: 2024-03-10T09:00:00Z
    TimestampFormat {
        pattern: "%Y-%m-%dT%H:%M:%SZ",
        flavor: Flavor::AssumeUtc,
    },
    // Fractional seconds, numeric offset: 2024-03-10T09:00:00.350+02:00
    TimestampFormat {
        pattern: "%Y-%m-%dT%H:%M:%S%.f%z",
        flavor: Flavor::WithOffset,
    },
    // Whole seconds, numeric offset: 2024-03-10T09:00:00+02:00
    TimestampFormat {
        pattern: "%Y-%m-%dT%H:%M:%S%z",
        flavor: Flavor::WithOffset,
    },
    // Fractional seconds, no zone marker: 2024-03-10T09:00:00.350
    TimestampFormat {
        pattern: "%Y-%m-%dT%H:%M:%S%.f",
        flavor: Flavor::AssumeUtc,
    },
    // Whole seconds, no zone marker: 2024-03-10T09:00:00
    TimestampFormat {
        pattern: "%Y-%m-%dT%H:%M:%S",
        flavor: Flavor::AssumeUtc,
    },
];

/// Parse a GPX timestamp string into a UTC instant.
///
/// Tries each entry of the format table in order; the first pattern that
/// parses wins. Strings no table entry accepts fall through to a generic
/// RFC 3339 parse with a trailing `Z` rewritten to `+00:00`. Returns `None`
/// for empty input or when nothing matches; never panics.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in FORMATS {
        let parsed = match format.flavor {
            Flavor::AssumeUtc => NaiveDateTime::parse_from_str(raw, format.pattern)
                .ok()
                .map(|naive| naive.and_utc()),
            Flavor::WithOffset => DateTime::parse_from_str(raw, format.pattern)
                .ok()
                .map(|fixed| fixed.with_timezone(&Utc)),
        };
        if let Some(instant) = parsed {
            return Some(instant);
        }
    }

    // Generic ISO-8601 fallback; a trailing literal Z means +00:00.
    DateTime::parse_from_rfc3339(&raw.replace('Z', "+00:00"))
        .ok()
        .map(|fixed| fixed.with_timezone(&Utc))
}
