//! Waypoint extraction from GPX documents.
//!
//! Producers disagree on namespace spelling (with or without a trailing
//! slash), on prefixing, and on where point sub-fields live. Extraction
//! therefore works in two steps: the document is read once into a
//! lightweight element tree, then track points and their sub-fields are
//! located through ordered lookup strategies, first success wins, never
//! merged.

use std::fs;
use std::io;
use std::path::Path;

use log::debug;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::{CadenceError, Result};
use crate::timestamp::parse_timestamp;
use crate::Waypoint;

/// Primary GPX 1.1 namespace identifier.
pub(crate) const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// Trailing-slash namespace variant some producers emit.
pub(crate) const GPX_NAMESPACE_SLASH: &str = "http://www.topografix.com/GPX/1/1/";

// ============================================================================
// Element tree
// ============================================================================

/// One element from the document: resolved namespace, local name,
/// attributes, accumulated text, and child elements. Just enough structure
/// for the cascading lookups below.
#[derive(Debug, Clone)]
pub(crate) struct XmlElement {
    pub(crate) namespace: Option<String>,
    pub(crate) local: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) text: String,
    pub(crate) children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(namespace: Option<String>, local: String) -> Self {
        Self {
            namespace,
            local,
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Value of an attribute by local name.
    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child with the given local name, any namespace.
    fn child(&self, local: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.local == local)
    }

    /// First direct child with the given local name in the given namespace.
    fn child_in_namespace(&self, local: &str, namespace: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find(|c| c.local == local && c.namespace.as_deref() == Some(namespace))
    }

    /// Depth-first iterator over all descendants (excluding self).
    pub(crate) fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// First descendant with the given local name in the given namespace.
    fn descendant_in_namespace(&self, local: &str, namespace: &str) -> Option<&XmlElement> {
        self.descendants()
            .find(|e| e.local == local && e.namespace.as_deref() == Some(namespace))
    }
}

/// Depth-first traversal over an element's subtree.
pub(crate) struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

/// Parse document content into an element tree rooted at the document
/// element. Returns a message describing the defect when the content is not
/// a well-formed document.
pub(crate) fn parse_document(content: &str) -> std::result::Result<XmlElement, String> {
    let mut reader = NsReader::from_str(content);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (resolve, event) = match reader.read_resolved_event() {
            Ok(pair) => pair,
            Err(e) => {
                return Err(format!(
                    "error at position {}: {e}",
                    reader.buffer_position()
                ))
            }
        };

        match event {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err("junk after document element".to_string());
                }
                let mut element = XmlElement::new(
                    resolved_namespace(&resolve),
                    local_name_of(start.local_name().into_inner()),
                );
                for attr in start.attributes().flatten() {
                    let key = local_name_of(attr.key.local_name().into_inner());
                    if let Ok(value) = attr.unescape_value() {
                        element.attributes.push((key, value.into_owned()));
                    }
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err("junk after document element".to_string());
                }
                let mut element = XmlElement::new(
                    resolved_namespace(&resolve),
                    local_name_of(start.local_name().into_inner()),
                );
                for attr in start.attributes().flatten() {
                    let key = local_name_of(attr.key.local_name().into_inner());
                    if let Ok(value) = attr.unescape_value() {
                        element.attributes.push((key, value.into_owned()));
                    }
                }
                attach(element, &mut stack, &mut root);
            }
            Event::End(end) => {
                let local = local_name_of(end.local_name().into_inner());
                let element = match stack.pop() {
                    Some(e) => e,
                    None => return Err(format!("unexpected closing tag </{local}>")),
                };
                if element.local != local {
                    return Err(format!(
                        "mismatched closing tag: expected </{}>, found </{}>",
                        element.local, local
                    ));
                }
                attach(element, &mut stack, &mut root);
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().unwrap_or_default());
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    root.ok_or_else(|| "no element found".to_string())
}

fn attach(element: XmlElement, stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn resolved_namespace(resolve: &ResolveResult<'_>) -> Option<String> {
    match resolve {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    }
}

fn local_name_of(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ============================================================================
// Track-point discovery and field lookup
// ============================================================================

/// Locate track points, trying each discovery strategy in order: primary
/// namespace, trailing-slash variant, then namespace-agnostic by local name.
/// The first strategy yielding one or more nodes is used exclusively.
/// Returns the matched points and the namespace sub-field lookups should use.
pub(crate) fn discover_track_points(root: &XmlElement) -> (Vec<&XmlElement>, &'static str) {
    let candidates: Vec<&XmlElement> = root.descendants().filter(|e| e.local == "trkpt").collect();

    for namespace in [GPX_NAMESPACE, GPX_NAMESPACE_SLASH] {
        let matched: Vec<&XmlElement> = candidates
            .iter()
            .copied()
            .filter(|e| e.namespace.as_deref() == Some(namespace))
            .collect();
        if !matched.is_empty() {
            return (matched, namespace);
        }
    }

    (candidates, GPX_NAMESPACE)
}

/// Locate a track-point sub-field through the lookup cascade: direct child
/// in the discovered namespace, any descendant in the primary namespace,
/// then a namespace-agnostic direct child by bare tag name.
fn find_field<'a>(
    trkpt: &'a XmlElement,
    local: &str,
    discovered_ns: &str,
) -> Option<&'a XmlElement> {
    trkpt
        .child_in_namespace(local, discovered_ns)
        .or_else(|| trkpt.descendant_in_namespace(local, GPX_NAMESPACE))
        .or_else(|| trkpt.child(local))
}

/// Build a waypoint from one track-point element. Returns `None` when the
/// point has no parseable timestamp; such points are invisible to the rest
/// of the pipeline.
fn build_waypoint(trkpt: &XmlElement, discovered_ns: &str) -> Option<Waypoint> {
    // Coordinates come from attributes; absent or unparseable means 0.0,
    // never a failure.
    let lat = trkpt
        .attribute("lat")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    let lon = trkpt
        .attribute("lon")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    let elevation = find_field(trkpt, "ele", discovered_ns)
        .and_then(|e| e.text.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    let timestamp = find_field(trkpt, "time", discovered_ns)
        .and_then(|e| parse_timestamp(&e.text))?;

    let mut accuracy = None;
    let mut speed = None;
    if let Some(extensions) = find_field(trkpt, "extensions", discovered_ns) {
        // Extension fields are matched on the tag's local name; anything
        // unrecognized is ignored.
        for child in &extensions.children {
            let tag = child.local.to_ascii_lowercase();
            let value = child.text.trim().parse::<f64>().ok();
            if tag.contains("accuracy") {
                accuracy = value;
            } else if tag.contains("speed") && tag != "speed" {
                speed = value;
            } else if child.local == "speed" || tag.ends_with("speed") {
                speed = value;
            }
        }
    }

    Some(Waypoint {
        lat,
        lon,
        elevation,
        timestamp,
        accuracy,
        speed,
    })
}

// ============================================================================
// Entry points
// ============================================================================

/// Extract all waypoints from in-memory GPX content.
///
/// `source` names the content in errors and logs. Track points without a
/// parseable timestamp are dropped silently. The returned sequence is
/// stably sorted by timestamp ascending regardless of document order.
pub fn extract_waypoints_from_str(source: &str, content: &str) -> Result<Vec<Waypoint>> {
    let root = parse_document(content).map_err(|message| CadenceError::MalformedDocument {
        path: source.into(),
        message,
    })?;

    let (track_points, discovered_ns) = discover_track_points(&root);

    let mut waypoints = Vec::with_capacity(track_points.len());
    let mut dropped = 0usize;
    for trkpt in track_points {
        match build_waypoint(trkpt, discovered_ns) {
            Some(wp) => waypoints.push(wp),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("{source}: dropped {dropped} track points without parseable timestamps");
    }

    // Producers may emit points out of chronological order.
    waypoints.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    debug!("{source}: extracted {} waypoints", waypoints.len());
    Ok(waypoints)
}

/// Read document content from disk, mapping failures to the two
/// document-level error conditions.
pub(crate) fn read_document(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(CadenceError::MalformedDocument {
            path: path.to_path_buf(),
            message: "content is not valid UTF-8".to_string(),
        }),
        Err(e) => Err(CadenceError::DocumentNotFound {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Extract all waypoints from a GPX file on disk.
///
/// Fails with [`CadenceError::DocumentNotFound`] when the path does not
/// resolve to readable content and [`CadenceError::MalformedDocument`] when
/// the content is not a well-formed document. Both are recoverable per file.
pub fn extract_waypoints(path: &Path) -> Result<Vec<Waypoint>> {
    let content = read_document(path)?;
    extract_waypoints_from_str(&path.display().to_string(), &content)
}
