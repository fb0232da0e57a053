//! Document tree for markweave.
//!
//! This crate defines:
//! - the HTML-like [`Node`] tree that documents are parsed into and that
//!   component expansion rewrites,
//! - byte-offset [`Span`]s and a [`LineIndex`] for reporting positions,
//! - HTML rendering, both flat and split into partial-hydration
//!   [`render::RenderPart`] runs.
//!
//! # Example
//!
//! ```
//! use doc_tree::{AttrMap, Node};
//!
//! let tree = Node::element("p", AttrMap::new(), vec![Node::text("hello")]);
//! assert_eq!(doc_tree::render::render_to_string(&[tree]), "<p>hello</p>");
//! ```

mod node;
pub mod render;
mod span;

pub use node::{AttrMap, Comment, ComponentNode, Element, Node, NodeId, Root, Text};
pub use span::{ByteOffset, LineCol, LineIndex, Span};
