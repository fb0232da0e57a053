//! HTML fragment parsing and component-marker recognition for markweave.
//!
//! This crate provides:
//! - a logos-based lexer and recursive-descent parser turning HTML fragment
//!   source into `doc-tree` nodes, with error recovery,
//! - marker classification for `::name`, `::start:name` and `::end:name`
//!   comment directives,
//! - invocation-tag parsing, which resolves a marker's raw tag text by
//!   parsing it as a synthetic self-closing tag.
//!
//! # Example
//!
//! ```
//! use markup_parser::parse_fragment;
//!
//! let result = parse_fragment(r#"<p>intro</p><!-- ::quiz title="Q1" -->"#);
//! assert!(result.errors.is_empty());
//! assert_eq!(result.root.children.len(), 2);
//! ```

mod error;
mod lexer;
pub mod marker;
mod parser;

pub use error::{ParseError, ParseErrorKind};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse_fragment, ParseResult, Parser};
