//! The document tree.
//!
//! Nodes form an HTML-like tree produced from parsed markdown. The tree is
//! owned (`Vec<Node>` children); node identity for bookkeeping across passes
//! comes from `NodeId`, not from pointers.

use crate::Span;
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// A stable identity for a tree node.
///
/// Ids are allocated from a process-wide counter, so two nodes never share
/// an id even across documents. Equality of [`Node`]s deliberately ignores
/// ids (and spans): two trees are equal when their content is equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocates a fresh id.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An ordered, string-valued attribute or prop map.
pub type AttrMap = IndexMap<SmolStr, String>;

/// A node in the document tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// The document root.
    Root(Root),
    /// A markup element.
    Element(Element),
    /// Text content.
    Text(Text),
    /// A comment (markers live here until expanded).
    Comment(Comment),
    /// A resolved component, opaque to further expansion.
    Component(ComponentNode),
}

/// The document root.
#[derive(Debug, Clone)]
pub struct Root {
    /// Identity for per-document bookkeeping.
    pub id: NodeId,
    /// The child nodes.
    pub children: Vec<Node>,
    /// The span of the whole document.
    pub span: Span,
}

/// A markup element.
#[derive(Debug, Clone)]
pub struct Element {
    /// Identity for per-document bookkeeping.
    pub id: NodeId,
    /// The tag name.
    pub name: SmolStr,
    /// The attributes, in source order.
    pub attributes: AttrMap,
    /// The child nodes.
    pub children: Vec<Node>,
    /// Whether the source tag was self-closing.
    pub self_closing: bool,
    /// The span of the element in the source.
    pub span: Span,
}

/// Text content.
#[derive(Debug, Clone)]
pub struct Text {
    /// The text data.
    pub data: String,
    /// The span of the text in the source.
    pub span: Span,
}

/// A comment node (without `<!--` and `-->`).
#[derive(Debug, Clone)]
pub struct Comment {
    /// The comment data.
    pub data: String,
    /// The span of the comment in the source.
    pub span: Span,
}

/// A resolved component: a terminal leaf carrying a name and string props,
/// ready for client-side hydration.
#[derive(Debug, Clone)]
pub struct ComponentNode {
    /// The component name.
    pub name: SmolStr,
    /// The component props.
    pub props: AttrMap,
    /// The span of the marker this component came from.
    pub span: Span,
}

impl Node {
    /// Creates an element node with a fresh id and no source span.
    pub fn element(
        name: impl Into<SmolStr>,
        attributes: AttrMap,
        children: Vec<Node>,
    ) -> Self {
        Node::Element(Element {
            id: NodeId::fresh(),
            name: name.into(),
            attributes,
            children,
            self_closing: false,
            span: Span::default(),
        })
    }

    /// Creates a text node with no source span.
    pub fn text(data: impl Into<String>) -> Self {
        Node::Text(Text {
            data: data.into(),
            span: Span::default(),
        })
    }

    /// Creates a comment node with no source span.
    pub fn comment(data: impl Into<String>) -> Self {
        Node::Comment(Comment {
            data: data.into(),
            span: Span::default(),
        })
    }

    /// Creates a component node with no source span.
    pub fn component(name: impl Into<SmolStr>, props: AttrMap) -> Self {
        Node::Component(ComponentNode {
            name: name.into(),
            props,
            span: Span::default(),
        })
    }

    /// Returns the source span of this node.
    pub fn span(&self) -> Span {
        match self {
            Node::Root(n) => n.span,
            Node::Element(n) => n.span,
            Node::Text(n) => n.span,
            Node::Comment(n) => n.span,
            Node::Component(n) => n.span,
        }
    }

    /// Returns the children of this node, if it can have any.
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Root(n) => Some(&n.children),
            Node::Element(n) => Some(&n.children),
            _ => None,
        }
    }

    /// Returns this node as an element, if it is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(n) => Some(n),
            _ => None,
        }
    }

    /// Returns this node as a comment, if it is one.
    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Node::Comment(n) => Some(n),
            _ => None,
        }
    }

    /// Returns this node as a component, if it is one.
    pub fn as_component(&self) -> Option<&ComponentNode> {
        match self {
            Node::Component(n) => Some(n),
            _ => None,
        }
    }

    /// Returns true for a text node that is only whitespace.
    pub fn is_whitespace_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.data.chars().all(char::is_whitespace))
    }
}

impl Root {
    /// Creates a root with a fresh id and no source span.
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            id: NodeId::fresh(),
            children,
            span: Span::default(),
        }
    }
}

// Equality is structural content equality: ids are identity and spans are
// provenance, neither makes two trees different documents.

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Root(a), Node::Root(b)) => a == b,
            (Node::Element(a), Node::Element(b)) => a == b,
            (Node::Text(a), Node::Text(b)) => a.data == b.data,
            (Node::Comment(a), Node::Comment(b)) => a.data == b.data,
            (Node::Component(a), Node::Component(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Node {}

impl PartialEq for Root {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children
    }
}

impl Eq for Root {}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.children == other.children
            && self.self_closing == other.self_closing
    }
}

impl Eq for Element {}

impl PartialEq for ComponentNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.props == other.props
    }
}

impl Eq for ComponentNode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = NodeId::fresh();
        let b = NodeId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_ignores_identity() {
        let a = Node::element("div", AttrMap::new(), vec![Node::text("hi")]);
        let b = Node::element("div", AttrMap::new(), vec![Node::text("hi")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_sees_content() {
        let a = Node::element("div", AttrMap::new(), vec![]);
        let b = Node::element("span", AttrMap::new(), vec![]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_whitespace_text() {
        assert!(Node::text("  \n\t").is_whitespace_text());
        assert!(!Node::text(" x ").is_whitespace_text());
        assert!(!Node::comment("  ").is_whitespace_text());
    }
}
