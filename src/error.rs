//! Unified error handling for gpx-cadence operations.
//!
//! Only document-level failures are errors: a file that cannot be read or a
//! document that is not well-formed XML. Per-point problems (a missing
//! timestamp, an unparseable coordinate) degrade instead of failing, and the
//! analyzer itself has no failure path.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating or parsing a GPX document.
///
/// Both variants are recoverable per file: a batch reports the failed file
/// and continues with the rest.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// The source path does not resolve to readable content.
    #[error("file not found: {}", path.display())]
    DocumentNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not parseable as an XML document.
    #[error("failed to parse GPX file {}: {message}", path.display())]
    MalformedDocument { path: PathBuf, message: String },
}

/// Result type alias for gpx-cadence operations.
pub type Result<T> = std::result::Result<T, CadenceError>;
