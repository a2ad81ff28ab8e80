//! Structural diagnostics for GPX documents.
//!
//! When a producer's file extracts fewer points than expected, the first
//! question is usually "which namespace did it actually write?". The
//! inspector collects the raw structural facts needed to answer that by
//! hand, without running any analysis.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};
use crate::extract::{parse_document, read_document, GPX_NAMESPACE, GPX_NAMESPACE_SLASH};

/// Raw structural facts about one GPX document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub path: String,
    pub byte_size: usize,
    pub line_count: usize,
    /// Local name of the document element
    pub root_local: String,
    /// Resolved namespace of the document element, if any
    pub root_namespace: Option<String>,
    /// Track points in the primary GPX 1.1 namespace
    pub trkpt_primary: usize,
    /// Track points in the trailing-slash namespace variant
    pub trkpt_alternate: usize,
    /// Track points regardless of namespace
    pub trkpt_total: usize,
    /// Track points carrying a `time` element
    pub trkpt_timed: usize,
    /// Local names of the document element's direct children
    pub root_children: Vec<String>,
}

/// Collect structural facts about a GPX file.
///
/// Shares the extractor's error taxonomy: unreadable paths and
/// non-well-formed content are the only failures.
pub fn inspect_document(path: &Path) -> Result<DocumentSummary> {
    let content = read_document(path)?;
    let root = parse_document(&content).map_err(|message| CadenceError::MalformedDocument {
        path: path.to_path_buf(),
        message,
    })?;

    let track_points: Vec<_> = root.descendants().filter(|e| e.local == "trkpt").collect();
    let trkpt_primary = track_points
        .iter()
        .filter(|e| e.namespace.as_deref() == Some(GPX_NAMESPACE))
        .count();
    let trkpt_alternate = track_points
        .iter()
        .filter(|e| e.namespace.as_deref() == Some(GPX_NAMESPACE_SLASH))
        .count();
    let trkpt_timed = track_points
        .iter()
        .filter(|e| e.descendants().any(|c| c.local == "time"))
        .count();

    Ok(DocumentSummary {
        path: path.display().to_string(),
        byte_size: content.len(),
        line_count: content.lines().count(),
        root_local: root.local.clone(),
        root_namespace: root.namespace.clone(),
        trkpt_primary,
        trkpt_alternate,
        trkpt_total: track_points.len(),
        trkpt_timed,
        root_children: root.children.iter().map(|c| c.local.clone()).collect(),
    })
}

/// Render the numbered diagnostic dump for one document.
pub fn write_summary<W: std::io::Write>(
    out: &mut W,
    summary: &DocumentSummary,
) -> std::io::Result<()> {
    let rule = "=".repeat(60);
    writeln!(out, "\n{rule}")?;
    writeln!(out, "INSPECTING: {}", summary.path)?;
    writeln!(out, "{rule}")?;

    writeln!(out, "\n1. File content")?;
    writeln!(out, "   - Size: {} bytes", summary.byte_size)?;
    writeln!(out, "   - Lines: {}", summary.line_count)?;

    writeln!(out, "\n2. Document structure")?;
    writeln!(out, "   - Root element: {}", summary.root_local)?;
    match &summary.root_namespace {
        Some(ns) => writeln!(out, "   - Root namespace: {ns}")?,
        None => writeln!(out, "   - Root namespace: (none)")?,
    }

    writeln!(out, "\n3. Track point discovery")?;
    writeln!(
        out,
        "   - {GPX_NAMESPACE} : {} points",
        summary.trkpt_primary
    )?;
    writeln!(
        out,
        "   - {GPX_NAMESPACE_SLASH} (trailing slash): {} points",
        summary.trkpt_alternate
    )?;
    writeln!(out, "   - Any namespace: {} points", summary.trkpt_total)?;
    writeln!(
        out,
        "   - With a time element: {} points",
        summary.trkpt_timed
    )?;

    writeln!(out, "\n4. Direct children of root")?;
    if summary.root_children.is_empty() {
        writeln!(out, "   (none)")?;
    }
    for child in &summary.root_children {
        writeln!(out, "   - {child}")?;
    }

    Ok(())
}
