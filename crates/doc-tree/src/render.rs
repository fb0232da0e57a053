//! HTML rendering of document trees.
//!
//! Two output shapes: a flat HTML string (components rendered as hydration
//! placeholders), and a partial-hydration split where top-level component
//! nodes are kept structured and the literal markup between them is
//! flattened into runs.

use crate::node::{AttrMap, ComponentNode, Element, Node};
use smol_str::SmolStr;

/// HTML void elements: no closing tag, no children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Returns true if the given tag name is an HTML void element.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

/// Elements whose text content is emitted verbatim, never entity-escaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

/// One run of renderer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderPart {
    /// A literal markup fragment.
    Markup(String),
    /// A structured component, ready for client-side hydration.
    Component {
        /// The component name.
        name: SmolStr,
        /// The component props.
        props: AttrMap,
    },
}

/// Renders a node sequence to a single HTML string.
///
/// Component nodes become `<div data-component data-props>` placeholders
/// that the per-component runtime scripts hydrate.
pub fn render_to_string(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, &mut out);
    }
    out
}

/// Renders a node sequence as alternating markup runs and structured
/// components. Only components at the top level of `nodes` are split out;
/// components nested inside markup render as placeholders within the run.
pub fn render_parts(nodes: &[Node]) -> Vec<RenderPart> {
    let mut parts = Vec::new();
    let mut run = String::new();

    for node in nodes {
        match node {
            Node::Component(component) => {
                if !run.is_empty() {
                    parts.push(RenderPart::Markup(std::mem::take(&mut run)));
                }
                parts.push(RenderPart::Component {
                    name: component.name.clone(),
                    props: component.props.clone(),
                });
            }
            other => render_node(other, &mut run),
        }
    }

    if !run.is_empty() {
        parts.push(RenderPart::Markup(run));
    }

    parts
}

fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Root(root) => {
            for child in &root.children {
                render_node(child, out);
            }
        }
        Node::Element(element) => render_element(element, out),
        Node::Text(text) => out.push_str(&escape_text(&text.data)),
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(&comment.data);
            out.push_str("-->");
        }
        Node::Component(component) => render_component_placeholder(component, out),
    }
}

fn render_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }

    if is_void_element(&element.name) {
        out.push('>');
        return;
    }

    if element.self_closing && element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    if is_raw_text_element(&element.name) {
        for child in &element.children {
            if let Node::Text(text) = child {
                out.push_str(&text.data);
            }
        }
    } else {
        for child in &element.children {
            render_node(child, out);
        }
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn render_component_placeholder(component: &ComponentNode, out: &mut String) {
    out.push_str("<div data-component=\"");
    out.push_str(&escape_attr(&component.name));
    out.push_str("\" data-props=\"");
    out.push_str(&escape_attr(&props_json(&component.props)));
    out.push_str("\"></div>");
}

/// Serializes props as a JSON object, preserving insertion order.
pub fn props_json(props: &AttrMap) -> String {
    let map: serde_json::Map<String, serde_json::Value> = props
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
        .collect();
    serde_json::Value::Object(map).to_string()
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attrs(pairs: &[(&str, &str)]) -> AttrMap {
        pairs
            .iter()
            .map(|(k, v)| (SmolStr::new(k), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_element_with_text() {
        let node = Node::element("p", attrs(&[("class", "note")]), vec![Node::text("a & b")]);
        assert_eq!(
            render_to_string(&[node]),
            "<p class=\"note\">a &amp; b</p>"
        );
    }

    #[test]
    fn test_render_void_element() {
        let node = Node::element("img", attrs(&[("src", "x.png")]), vec![]);
        assert_eq!(render_to_string(&[node]), "<img src=\"x.png\">");
    }

    #[test]
    fn test_render_comment() {
        let node = Node::comment(" keep me ");
        assert_eq!(render_to_string(&[node]), "<!-- keep me -->");
    }

    #[test]
    fn test_render_component_placeholder() {
        let node = Node::component("quiz", attrs(&[("title", "Q1")]));
        let html = render_to_string(&[node]);
        assert_eq!(
            html,
            "<div data-component=\"quiz\" data-props=\"{&quot;title&quot;:&quot;Q1&quot;}\"></div>"
        );
    }

    #[test]
    fn test_render_parts_splits_on_components() {
        let nodes = vec![
            Node::element("p", AttrMap::new(), vec![Node::text("before")]),
            Node::component("in-content-ad", attrs(&[("title", "Hello")])),
            Node::element("p", AttrMap::new(), vec![Node::text("after")]),
        ];
        let parts = render_parts(&nodes);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], RenderPart::Markup("<p>before</p>".to_string()));
        assert!(matches!(
            &parts[1],
            RenderPart::Component { name, .. } if name == "in-content-ad"
        ));
        assert_eq!(parts[2], RenderPart::Markup("<p>after</p>".to_string()));
    }

    #[test]
    fn test_render_parts_no_components_is_one_run() {
        let nodes = vec![Node::text("x"), Node::text("y")];
        let parts = render_parts(&nodes);
        assert_eq!(parts, vec![RenderPart::Markup("xy".to_string())]);
    }

    #[test]
    fn test_script_text_is_not_escaped() {
        let node = Node::element(
            "script",
            AttrMap::new(),
            vec![Node::text("if (a < b && c > d) {}")],
        );
        assert_eq!(
            render_to_string(&[node]),
            "<script>if (a < b && c > d) {}</script>"
        );
    }

    #[test]
    fn test_attr_escaping() {
        let node = Node::element("a", attrs(&[("title", "say \"hi\" & go")]), vec![]);
        assert_eq!(
            render_to_string(&[node]),
            "<a title=\"say &quot;hi&quot; &amp; go\"></a>"
        );
    }
}
