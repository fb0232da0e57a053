//! Recursive descent parser for HTML fragments.
//!
//! Produces a `doc-tree` fragment with error recovery: malformed markup is
//! reported and skipped rather than failing the whole parse. Structure comes
//! from the lexer; text content, comment bodies and attribute values are
//! read straight from the source between structural tokens.

use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Lexer, Token, TokenKind};
use doc_tree::render::is_void_element;
use doc_tree::{AttrMap, Comment, Element, Node, NodeId, Root, Span, Text};
use smol_str::SmolStr;
use text_size::TextSize;

/// Elements whose content is raw text rather than nested markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// The result of parsing a fragment.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed fragment under a fresh root.
    pub root: Root,
    /// Any errors encountered during parsing.
    pub errors: Vec<ParseError>,
}

/// Parses HTML fragment source into a document tree.
pub fn parse_fragment(source: &str) -> ParseResult {
    Parser::new(source).parse()
}

/// The fragment parser.
pub struct Parser<'src> {
    /// The source being parsed.
    source: &'src str,
    /// The token stream, ending in an Eof token.
    tokens: Vec<Token>,
    /// Current position in the token stream.
    pos: usize,
    /// End offset of the most recently consumed token.
    last_end: TextSize,
    /// Parse errors collected during parsing.
    errors: Vec<ParseError>,
    /// EOF token for when we're past the end.
    eof_token: Token,
}

impl<'src> Parser<'src> {
    /// Creates a new parser.
    pub fn new(source: &'src str) -> Self {
        let tokens: Vec<Token> = Lexer::new(source).collect();
        let eof_token = Token {
            kind: TokenKind::Eof,
            span: Span::empty(TextSize::from(source.len() as u32)),
        };
        Self {
            source,
            tokens,
            pos: 0,
            last_end: TextSize::from(0),
            errors: Vec::new(),
            eof_token,
        }
    }

    /// Parses the source into a fragment.
    pub fn parse(mut self) -> ParseResult {
        let children = self.parse_nodes(None);
        let mut root = Root::new(children);
        root.span = Span::new(TextSize::from(0), TextSize::from(self.source.len() as u32));
        ParseResult {
            root,
            errors: self.errors,
        }
    }

    // === Token helpers ===

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof_token)
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn current_text(&self) -> &str {
        let span = self.current().span;
        &self.source[u32::from(span.start) as usize..u32::from(span.end) as usize]
    }

    fn advance(&mut self) {
        self.last_end = self.current().span.end;
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            self.error(ParseErrorKind::UnexpectedToken {
                expected: kind.name().to_string(),
                found: self.current_kind().name().to_string(),
            });
            false
        }
    }

    fn error(&mut self, kind: ParseErrorKind) {
        self.errors.push(ParseError::new(kind, self.current().span));
    }

    /// Skips whitespace and newline tokens (inside tags only).
    fn skip_space(&mut self) {
        while matches!(
            self.current_kind(),
            TokenKind::Whitespace | TokenKind::Newline
        ) {
            self.advance();
        }
    }

    /// Reads raw source from the current position until the nearest of the
    /// given delimiters (exclusive), advancing past the tokens covered.
    fn read_until(&mut self, delimiters: &[&str]) -> (String, Span) {
        let start = self.current().span.start;
        let start_offset = u32::from(start) as usize;
        let remaining = &self.source[start_offset..];
        let end_pos = delimiters
            .iter()
            .filter_map(|d| remaining.find(d))
            .min()
            .unwrap_or(remaining.len());
        let end = TextSize::from((start_offset + end_pos) as u32);
        self.skip_past(end);
        (remaining[..end_pos].to_string(), Span::new(start, end))
    }

    /// Advances past every token that starts before `offset`.
    fn skip_past(&mut self, offset: TextSize) {
        while self.current().span.start < offset && !self.check(TokenKind::Eof) {
            self.advance();
        }
    }

    // === Node parsing ===

    /// Parses sibling nodes until end of input or the matching close tag.
    fn parse_nodes(&mut self, closing: Option<&str>) -> Vec<Node> {
        let mut nodes = Vec::new();

        loop {
            match self.current_kind() {
                TokenKind::Eof => {
                    if let Some(tag) = closing {
                        self.error(ParseErrorKind::UnclosedTag {
                            tag_name: tag.to_string(),
                        });
                    }
                    return nodes;
                }
                TokenKind::CommentStart => nodes.push(self.parse_comment()),
                TokenKind::LAngleSlash => {
                    let Some(found) = self.peek_close_name() else {
                        self.error(ParseErrorKind::UnexpectedToken {
                            expected: "tag name".to_string(),
                            found: "'>'".to_string(),
                        });
                        self.advance();
                        continue;
                    };

                    match closing {
                        Some(expected) if found == expected => {
                            self.consume_close_tag();
                            return nodes;
                        }
                        Some(expected) => {
                            self.error(ParseErrorKind::MismatchedClosingTag {
                                expected: expected.to_string(),
                                found,
                            });
                            // Implicit close; the outer scope may still
                            // consume this tag as its own.
                            return nodes;
                        }
                        None => {
                            self.error(ParseErrorKind::UnexpectedToken {
                                expected: "markup content".to_string(),
                                found: format!("</{found}>"),
                            });
                            self.consume_close_tag();
                        }
                    }
                }
                TokenKind::LAngle => {
                    if let Some(node) = self.parse_element() {
                        nodes.push(node);
                    }
                }
                _ => {
                    let (data, span) = self.read_until(&["<"]);
                    if data.is_empty() {
                        self.advance();
                    } else {
                        nodes.push(Node::Text(Text { data, span }));
                    }
                }
            }
        }
    }

    /// Returns the name of the close tag at the current position without
    /// consuming anything.
    fn peek_close_name(&self) -> Option<String> {
        let next = self.tokens.get(self.pos + 1)?;
        if next.kind != TokenKind::Ident {
            return None;
        }
        let span = next.span;
        Some(self.source[u32::from(span.start) as usize..u32::from(span.end) as usize].to_string())
    }

    /// Consumes `</name>` at the current position.
    fn consume_close_tag(&mut self) {
        self.advance(); // `</`
        self.advance(); // name
        self.skip_space();
        self.expect(TokenKind::RAngle);
    }

    fn parse_element(&mut self) -> Option<Node> {
        let start = self.current().span.start;
        self.advance(); // `<`

        if !self.check(TokenKind::Ident) {
            self.error(ParseErrorKind::UnexpectedToken {
                expected: "tag name".to_string(),
                found: self.current_kind().name().to_string(),
            });
            self.advance();
            return None;
        }

        let name = SmolStr::new(self.current_text());
        self.advance();

        let attributes = self.parse_attributes();

        let mut self_closing = false;
        if self.eat(TokenKind::SlashRAngle) {
            self_closing = true;
        } else if !self.expect(TokenKind::RAngle) {
            // Skip to the end of the malformed tag.
            while !matches!(
                self.current_kind(),
                TokenKind::RAngle | TokenKind::SlashRAngle | TokenKind::Eof
            ) {
                self.advance();
            }
            if self.eat(TokenKind::SlashRAngle) {
                self_closing = true;
            } else {
                self.eat(TokenKind::RAngle);
            }
        }

        let mut children = Vec::new();
        if !self_closing && !is_void_element(&name) {
            if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                children = self.parse_raw_text(&name);
            } else {
                children = self.parse_nodes(Some(&name));
            }
        }

        Some(Node::Element(Element {
            id: NodeId::fresh(),
            name,
            attributes,
            children,
            self_closing,
            span: Span::new(start, self.last_end),
        }))
    }

    /// Parses the content of a raw-text element up to its close tag.
    fn parse_raw_text(&mut self, name: &str) -> Vec<Node> {
        let close = format!("</{name}");
        let (data, span) = self.read_until(&[close.as_str()]);

        if self.check(TokenKind::LAngleSlash) {
            self.consume_close_tag();
        } else {
            self.error(ParseErrorKind::UnclosedTag {
                tag_name: name.to_string(),
            });
        }

        if data.is_empty() {
            Vec::new()
        } else {
            vec![Node::Text(Text { data, span })]
        }
    }

    fn parse_comment(&mut self) -> Node {
        let start = self.current().span.start;
        self.advance(); // `<!--`

        let (data, span) = self.read_until(&["-->"]);
        if (u32::from(span.end) as usize) < self.source.len() {
            // Consume the `-->`; tokens may straddle it, so skip by offset.
            self.skip_past(span.end + TextSize::from(3));
        } else {
            self.error(ParseErrorKind::UnexpectedEof {
                expected: "'-->'".to_string(),
            });
        }

        Node::Comment(Comment {
            data,
            span: Span::new(start, self.last_end),
        })
    }

    fn parse_attributes(&mut self) -> AttrMap {
        let mut attributes = AttrMap::new();

        loop {
            self.skip_space();
            if !self.check(TokenKind::Ident) {
                return attributes;
            }

            let name = SmolStr::new(self.current_text());
            self.advance();
            self.skip_space();

            let value = if self.eat(TokenKind::Eq) {
                self.skip_space();
                match self.parse_attribute_value() {
                    Some(value) => value,
                    None => continue,
                }
            } else {
                // Boolean attribute: string coercion of `true`.
                "true".to_string()
            };

            match attributes.entry(name) {
                indexmap::map::Entry::Occupied(mut entry) => {
                    // Multi-valued attributes flatten to space-joined strings.
                    let joined = entry.get_mut();
                    joined.push(' ');
                    joined.push_str(&value);
                }
                indexmap::map::Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
    }

    fn parse_attribute_value(&mut self) -> Option<String> {
        let quote = match self.current_kind() {
            TokenKind::DoubleQuote => "\"",
            TokenKind::SingleQuote => "'",
            _ => {
                self.error(ParseErrorKind::InvalidAttribute {
                    message: "attribute values must be quoted".to_string(),
                });
                return None;
            }
        };
        self.advance();

        let (value, span) = self.read_until(&[quote]);
        if (u32::from(span.end) as usize) >= self.source.len() {
            self.error(ParseErrorKind::UnexpectedEof {
                expected: "closing quote".to_string(),
            });
            return None;
        }
        self.advance(); // closing quote

        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Vec<Node> {
        let result = parse_fragment(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors: {:?}",
            result.errors
        );
        result.root.children
    }

    #[test]
    fn test_parse_empty() {
        let result = parse_fragment("");
        assert!(result.errors.is_empty());
        assert!(result.root.children.is_empty());
    }

    #[test]
    fn test_parse_element_with_text() {
        let nodes = parse_ok("<p>hello world</p>");
        assert_eq!(
            nodes,
            vec![Node::element(
                "p",
                AttrMap::new(),
                vec![Node::text("hello world")]
            )]
        );
    }

    #[test]
    fn test_parse_nested_elements() {
        let nodes = parse_ok("<div><span>x</span><em>y</em></div>");
        assert_eq!(
            nodes,
            vec![Node::element(
                "div",
                AttrMap::new(),
                vec![
                    Node::element("span", AttrMap::new(), vec![Node::text("x")]),
                    Node::element("em", AttrMap::new(), vec![Node::text("y")]),
                ]
            )]
        );
    }

    #[test]
    fn test_parse_attributes() {
        let nodes = parse_ok(r#"<a href="/x" title='Hi there'>go</a>"#);
        let Node::Element(element) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(element.attributes.get("href").map(String::as_str), Some("/x"));
        assert_eq!(
            element.attributes.get("title").map(String::as_str),
            Some("Hi there")
        );
    }

    #[test]
    fn test_boolean_attribute_coerces_to_true() {
        let nodes = parse_ok("<input disabled>");
        let Node::Element(element) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(
            element.attributes.get("disabled").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_duplicate_attribute_joins_with_space() {
        let nodes = parse_ok(r#"<div class="a" class="b"></div>"#);
        let Node::Element(element) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(element.attributes.get("class").map(String::as_str), Some("a b"));
    }

    #[test]
    fn test_parse_comment() {
        let nodes = parse_ok("<!-- ::tabs title=\"T\" -->");
        assert_eq!(nodes, vec![Node::comment(" ::tabs title=\"T\" ")]);
    }

    #[test]
    fn test_comment_body_with_hyphens() {
        let nodes = parse_ok("<!--a--b-->");
        assert_eq!(nodes, vec![Node::comment("a--b")]);
    }

    #[test]
    fn test_void_element_has_no_children() {
        let nodes = parse_ok("<img src=\"x.png\"><p>after</p>");
        assert_eq!(nodes.len(), 2);
        let Node::Element(img) = &nodes[0] else {
            panic!("expected element");
        };
        assert!(img.children.is_empty());
    }

    #[test]
    fn test_self_closing_element() {
        let nodes = parse_ok("<thing a=\"1\"/>");
        let Node::Element(element) = &nodes[0] else {
            panic!("expected element");
        };
        assert!(element.self_closing);
        assert!(element.children.is_empty());
    }

    #[test]
    fn test_whitespace_between_elements_is_preserved() {
        let nodes = parse_ok("<b>a</b> <i>b</i>");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1], Node::text(" "));
    }

    #[test]
    fn test_raw_text_script_content() {
        let nodes = parse_ok("<script>if (a < b) { go(); }</script>");
        let Node::Element(script) = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(
            script.children,
            vec![Node::text("if (a < b) { go(); }")]
        );
    }

    #[test]
    fn test_unclosed_tag_reports_error() {
        let result = parse_fragment("<div><p>text");
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ParseErrorKind::UnclosedTag { .. })));
    }

    #[test]
    fn test_mismatched_close_recovers() {
        let result = parse_fragment("<div><span>x</div>");
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ParseErrorKind::MismatchedClosingTag { .. })));
        // The div still closes and keeps its content.
        assert_eq!(result.root.children.len(), 1);
    }

    #[test]
    fn test_unquoted_attribute_is_error() {
        let result = parse_fragment("<a href=x>go</a>");
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ParseErrorKind::InvalidAttribute { .. })));
    }

    #[test]
    fn test_unterminated_comment() {
        let result = parse_fragment("<!-- never closed");
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ParseErrorKind::UnexpectedEof { .. })));
        assert_eq!(result.root.children, vec![Node::comment(" never closed")]);
    }

    #[test]
    fn test_element_span_covers_tags() {
        let source = "<p>hi</p>";
        let result = parse_fragment(source);
        let span = result.root.children[0].span();
        assert_eq!(u32::from(span.start), 0);
        assert_eq!(u32::from(span.end), source.len() as u32);
    }
}
