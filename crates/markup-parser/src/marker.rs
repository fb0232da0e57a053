//! Component-marker recognition.
//!
//! Markers are directives embedded in comment nodes:
//!
//! - single: `::in-content-ad title="Hello"`
//! - range start: `::start:tabs title="Install"`
//! - range end: `::end:tabs`
//!
//! Classification is purely textual; the raw tag text of a single or range
//! start marker is resolved into a name and attribute map by wrapping it as
//! a synthetic self-closing tag and running it through the fragment parser.

use crate::error::{ParseError, ParseErrorKind};
use crate::parser::parse_fragment;
use doc_tree::{AttrMap, Node, Span};
use smol_str::SmolStr;

/// The prefix shared by all markers.
pub const MARKER_PREFIX: &str = "::";
/// The prefix of a range start marker (after trimming).
pub const RANGE_START_PREFIX: &str = "::start:";
/// The prefix of a range end marker (after trimming).
pub const RANGE_END_PREFIX: &str = "::end:";

/// A marker recognized in a comment node. Markers are ephemeral: they exist
/// only during a scan pass and are never stored in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// A single-shot marker; `raw` is the tag text after `::`.
    Single {
        /// The raw tag text, e.g. `in-content-ad title="Hello"`.
        raw: String,
    },
    /// The start of a ranged marker; `raw` is the tag text after `::start:`.
    RangeStart {
        /// The raw tag text.
        raw: String,
    },
    /// The end of a ranged marker.
    RangeEnd {
        /// The component name after `::end:`.
        name: SmolStr,
    },
}

/// A marker's tag text resolved into a component name and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTag {
    /// The component name.
    pub name: SmolStr,
    /// The attributes, string-valued and in source order.
    pub attributes: AttrMap,
}

/// Classifies a comment's text as a marker, if it is one.
///
/// Returns `None` for ordinary comments (anything whose trimmed text does
/// not start with `::`).
pub fn classify_marker(comment_text: &str) -> Option<Marker> {
    let trimmed = comment_text.trim();
    if !trimmed.starts_with(MARKER_PREFIX) {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix(RANGE_START_PREFIX) {
        return Some(Marker::RangeStart {
            raw: rest.to_string(),
        });
    }
    if let Some(rest) = trimmed.strip_prefix(RANGE_END_PREFIX) {
        return Some(Marker::RangeEnd {
            name: SmolStr::new(rest.trim()),
        });
    }

    Some(Marker::Single {
        raw: trimmed[MARKER_PREFIX.len()..].to_string(),
    })
}

/// Returns true if a comment's trimmed text is exactly the end marker for
/// the given component name.
pub fn is_range_end_for(comment_text: &str, name: &str) -> bool {
    let trimmed = comment_text.trim();
    trimmed
        .strip_prefix(RANGE_END_PREFIX)
        .map(|rest| rest.trim() == name)
        .unwrap_or(false)
}

/// Parses a marker's raw tag text into a name and attribute map.
///
/// The text is wrapped as a synthetic self-closing tag (`<raw/>`) and run
/// through the fragment parser; the resulting element's name and attributes
/// become the invocation. Malformed tag text is an error scoped to this
/// marker only. `span` locates the originating comment for reporting.
pub fn parse_marker_tag(raw: &str, span: Span) -> Result<MarkerTag, ParseError> {
    let invalid = |message: String| ParseError::new(ParseErrorKind::InvalidMarker { message }, span);

    if raw.trim().is_empty() {
        return Err(invalid("marker has no component name".to_string()));
    }

    let synthetic = format!("<{raw}/>");
    let result = parse_fragment(&synthetic);

    if let Some(error) = result.errors.first() {
        return Err(invalid(error.to_string()));
    }

    match result.root.children.as_slice() {
        [Node::Element(element)] => Ok(MarkerTag {
            name: element.name.clone(),
            attributes: element.attributes.clone(),
        }),
        _ => Err(invalid(format!("`{raw}` is not a single tag"))),
    }
}
