//! Placement validation.
//!
//! Component nodes and marker-shaped comments may only sit directly under
//! the document root or under an element on the allow-list. Everything else
//! is a violation; markdown authors routinely indent a marker into a
//! paragraph or list item by accident, and catching that at build time
//! beats shipping a component that never mounts.

use doc_tree::{Node, Root, Span};
use markup_parser::marker::{classify_marker, Marker};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use thiserror::Error;

/// Which element names may directly contain components.
#[derive(Debug, Clone)]
pub struct PlacementPolicy {
    allowed_parents: FxHashSet<SmolStr>,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        let mut allowed_parents = FxHashSet::default();
        allowed_parents.insert(SmolStr::new("details"));
        allowed_parents.insert(SmolStr::new("tab-panel"));
        Self { allowed_parents }
    }
}

impl PlacementPolicy {
    pub fn allow(&mut self, element: impl Into<SmolStr>) {
        self.allowed_parents.insert(element.into());
    }

    pub fn allows_element(&self, element: &str) -> bool {
        self.allowed_parents.contains(element)
    }
}

#[derive(Debug, Clone, Error)]
#[error("component `{component}` may not appear under <{parent}>")]
pub struct PlacementViolation {
    pub component: SmolStr,
    pub parent: SmolStr,
    pub span: Span,
}

/// Walks the expanded tree and reports every component (or leftover marker
/// comment) sitting under a disallowed element.
pub fn check_placement(root: &Root, policy: &PlacementPolicy) -> Vec<PlacementViolation> {
    let mut violations = Vec::new();
    // Root children are always fine; descend straight into elements.
    for node in &root.children {
        if let Node::Element(element) = node {
            check_element(element, policy, &mut violations);
        }
    }
    violations
}

fn check_element(
    element: &doc_tree::Element,
    policy: &PlacementPolicy,
    violations: &mut Vec<PlacementViolation>,
) {
    let allowed = policy.allows_element(&element.name);
    for child in &element.children {
        match child {
            Node::Component(component) if !allowed => {
                violations.push(PlacementViolation {
                    component: component.name.clone(),
                    parent: element.name.clone(),
                    span: component.span,
                });
            }
            Node::Comment(comment) if !allowed => {
                if let Some(marker) = classify_marker(&comment.data) {
                    violations.push(PlacementViolation {
                        component: marker_name(&marker),
                        parent: element.name.clone(),
                        span: comment.span,
                    });
                }
            }
            Node::Element(inner) => check_element(inner, policy, violations),
            _ => {}
        }
    }
}

fn marker_name(marker: &Marker) -> SmolStr {
    match marker {
        Marker::Single { raw } | Marker::RangeStart { raw } => raw
            .split_whitespace()
            .next()
            .map(SmolStr::new)
            .unwrap_or_default(),
        Marker::RangeEnd { name } => name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_tree::AttrMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn component_under_root_is_valid() {
        let root = Root::new(vec![Node::component("quiz", AttrMap::default())]);
        assert!(check_placement(&root, &PlacementPolicy::default()).is_empty());
    }

    #[test]
    fn component_under_paragraph_is_flagged() {
        let root = Root::new(vec![Node::element(
            "p",
            AttrMap::default(),
            vec![Node::component("quiz", AttrMap::default())],
        )]);
        let violations = check_placement(&root, &PlacementPolicy::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].component, "quiz");
        assert_eq!(violations[0].parent, "p");
    }

    #[test]
    fn component_under_details_is_valid_by_default() {
        let root = Root::new(vec![Node::element(
            "details",
            AttrMap::default(),
            vec![Node::component("quiz", AttrMap::default())],
        )]);
        assert!(check_placement(&root, &PlacementPolicy::default()).is_empty());
    }

    #[test]
    fn component_under_tab_panel_is_valid_by_default() {
        let root = Root::new(vec![Node::element(
            "tab-panel",
            AttrMap::default(),
            vec![Node::component("quiz", AttrMap::default())],
        )]);
        assert!(check_placement(&root, &PlacementPolicy::default()).is_empty());
    }

    #[test]
    fn leftover_marker_comment_counts_as_component() {
        let root = Root::new(vec![Node::element(
            "section",
            AttrMap::default(),
            vec![Node::comment(" ::in-content-ad placement=\"top\" ")],
        )]);
        let violations = check_placement(&root, &PlacementPolicy::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].component, "in-content-ad");
        assert_eq!(violations[0].parent, "section");
    }

    #[test]
    fn allow_list_is_extensible() {
        let mut policy = PlacementPolicy::default();
        policy.allow("aside");
        let root = Root::new(vec![Node::element(
            "aside",
            AttrMap::default(),
            vec![Node::component("quiz", AttrMap::default())],
        )]);
        assert!(check_placement(&root, &policy).is_empty());
    }

    #[test]
    fn ordinary_comments_are_ignored() {
        let root = Root::new(vec![Node::element(
            "p",
            AttrMap::default(),
            vec![Node::comment(" just a note ")],
        )]);
        assert!(check_placement(&root, &PlacementPolicy::default()).is_empty());
    }
}
