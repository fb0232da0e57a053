//! Component-marker expansion for markweave documents.
//!
//! Markdown authors drop component markers into their content as HTML
//! comments: `<!-- ::in-content-ad placement="top" -->` for a single-shot
//! component, or a `<!-- ::start:tabs -->` / `<!-- ::end:tabs -->` pair
//! wrapping a region the component consumes. This crate recognizes those
//! markers in a parsed tree, runs the registered async transforms, and
//! splices their output back in, preserving sibling order regardless of
//! which transform finishes first.
//!
//! ```
//! use std::sync::Arc;
//! use doc_tree::Node;
//! use marker_expand::{ComponentRegistry, Expander};
//! use markup_parser::parse_fragment;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), marker_expand::ExpandError> {
//! let mut registry = ComponentRegistry::new();
//! registry.register_fn("greeting", |_invocation| async {
//!     Ok(Some(vec![Node::text("hello")]))
//! });
//!
//! let parsed = parse_fragment("<p>before</p><!-- ::greeting -->");
//! let expander = Expander::new(Arc::new(registry));
//! let outcome = expander.expand_document(parsed.root).await?;
//! assert_eq!(outcome.used_components, vec!["greeting"]);
//! # Ok(())
//! # }
//! ```

mod error;
mod expand;
mod registry;
mod scripts;
mod tracker;
mod validate;

pub use error::{ExpandError, ExpandWarning, ExpandWarningKind};
pub use expand::{ExpandOutcome, Expander};
pub use registry::{
    ComponentInvocation, ComponentRegistry, ComponentTransform, RegistryEntry, RuntimeScript,
    TransformError, TransformFuture, TransformResult,
};
pub use scripts::{ScriptEmitter, ScriptError};
pub use tracker::ConsumedRegions;
pub use validate::{check_placement, PlacementPolicy, PlacementViolation};
