//! Built-in components.
//!
//! The registry shipped with the CLI. Interactive components (quiz, tabs,
//! in-content-ad) carry runtime scripts and only render on the web target;
//! an ebook build drops them or flattens them to static markup.

use camino::Utf8PathBuf;
use doc_tree::{AttrMap, Node};
use marker_expand::{
    ComponentInvocation, ComponentRegistry, RuntimeScript, TransformError, TransformResult,
};

use crate::cli::BuildTarget;
use crate::markdown::markdown_to_html;
use markup_parser::parse_fragment;

const QUIZ_SCRIPT: &str = include_str!("runtime/quiz.js");
const TABS_SCRIPT: &str = include_str!("runtime/tabs.js");
const AD_SCRIPT: &str = include_str!("runtime/in-content-ad.js");

/// Builds the registry of built-in components for one build target.
pub fn built_in_registry(workspace: Utf8PathBuf, target: BuildTarget) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    let web = target == BuildTarget::Web;

    registry.register_fn_with_script(
        "in-content-ad",
        move |inv: ComponentInvocation| async move {
            if !web {
                return Ok(None);
            }
            Ok(Some(vec![Node::component("in-content-ad", inv.attributes)]))
        },
        RuntimeScript::new(AD_SCRIPT),
    );

    registry.register_fn_with_script(
        "quiz",
        move |inv: ComponentInvocation| async move {
            if !web {
                return Ok(None);
            }
            Ok(Some(vec![Node::component("quiz", inv.attributes)]))
        },
        RuntimeScript::new(QUIZ_SCRIPT),
    );

    registry.register_fn_with_script(
        "tabs",
        move |inv: ComponentInvocation| async move { expand_tabs(inv, web) },
        RuntimeScript::new(TABS_SCRIPT),
    );

    registry.register_fn("details", |inv: ComponentInvocation| async move {
        expand_details(inv)
    });

    registry.register_fn("web-only", move |inv: ComponentInvocation| async move {
        if web {
            Ok(Some(inv.children))
        } else {
            Ok(None)
        }
    });

    registry.register_fn("ebook-only", move |inv: ComponentInvocation| async move {
        if web {
            Ok(None)
        } else {
            Ok(Some(inv.children))
        }
    });

    registry.register_fn("include", move |inv: ComponentInvocation| {
        let workspace = workspace.clone();
        async move { expand_include(inv, workspace).await }
    });

    registry
}

fn expand_tabs(inv: ComponentInvocation, web: bool) -> TransformResult {
    let mut attributes = AttrMap::default();
    if let Some(title) = inv.attr("title") {
        attributes.insert("data-title".into(), title.to_string());
    }
    if !web {
        // Static flattening: keep the content, skip the tab chrome.
        attributes.insert("data-static".into(), "true".to_string());
    }
    // The tab-panel wrapper is on the default placement allow-list, so
    // interactive components may nest inside a tabs region.
    Ok(Some(vec![Node::element(
        "tab-panel",
        attributes,
        inv.children,
    )]))
}

fn expand_details(inv: ComponentInvocation) -> TransformResult {
    let summary = inv
        .attr("summary")
        .or_else(|| inv.attr("title"))
        .unwrap_or("Details")
        .to_string();
    let mut children = vec![Node::element(
        "summary",
        AttrMap::default(),
        vec![Node::text(summary)],
    )];
    children.extend(inv.children);
    Ok(Some(vec![Node::element(
        "details",
        AttrMap::default(),
        children,
    )]))
}

async fn expand_include(inv: ComponentInvocation, workspace: Utf8PathBuf) -> TransformResult {
    let Some(src) = inv.attr("src") else {
        return Err(TransformError::new("include requires a `src` attribute"));
    };
    let path = workspace.join(src);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| TransformError::with_source(format!("failed to read include {path}"), e))?;

    let html = if path.extension() == Some("md") {
        markdown_to_html(&content)
    } else {
        content
    };

    let parsed = parse_fragment(&html);
    if let Some(error) = parsed.errors.first() {
        return Err(TransformError::new(format!(
            "include {path} did not parse: {error}"
        )));
    }
    Ok(Some(parsed.root.children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_tree::Span;
    use pretty_assertions::assert_eq;

    fn invocation(attrs: &[(&str, &str)], children: Vec<Node>) -> ComponentInvocation {
        ComponentInvocation {
            name: "test".into(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (smol_str::SmolStr::new(k), v.to_string()))
                .collect(),
            children,
            position: Span::default(),
        }
    }

    #[test]
    fn test_details_wraps_children_with_summary() {
        let result = expand_details(invocation(
            &[("summary", "More info")],
            vec![Node::text("body")],
        ))
        .unwrap()
        .unwrap();

        assert_eq!(
            result,
            vec![Node::element(
                "details",
                AttrMap::default(),
                vec![
                    Node::element("summary", AttrMap::default(), vec![Node::text("More info")]),
                    Node::text("body"),
                ],
            )]
        );
    }

    #[test]
    fn test_tabs_keeps_content_on_ebook() {
        let result = expand_tabs(invocation(&[], vec![Node::text("content")]), false)
            .unwrap()
            .unwrap();
        let element = result[0].as_element().unwrap();
        assert_eq!(element.name, "tab-panel");
        assert_eq!(element.attributes.get("data-static").map(String::as_str), Some("true"));
        assert_eq!(element.children, vec![Node::text("content")]);
    }

    #[tokio::test]
    async fn test_web_only_drops_on_ebook() {
        let registry = built_in_registry(Utf8PathBuf::from("."), BuildTarget::Ebook);
        let entry = registry.get("web-only").unwrap();
        let result = entry
            .transform
            .expand(invocation(&[], vec![Node::text("web stuff")]))
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_ebook_only_keeps_children_on_ebook() {
        let registry = built_in_registry(Utf8PathBuf::from("."), BuildTarget::Ebook);
        let entry = registry.get("ebook-only").unwrap();
        let result = entry
            .transform
            .expand(invocation(&[], vec![Node::text("print stuff")]))
            .await
            .unwrap();
        assert_eq!(result, Some(vec![Node::text("print stuff")]));
    }

    #[tokio::test]
    async fn test_include_reads_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::write(workspace.join("part.md"), "# Included").unwrap();

        let result = expand_include(invocation(&[("src", "part.md")], Vec::new()), workspace)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            result,
            vec![
                Node::element("h1", AttrMap::default(), vec![Node::text("Included")]),
                Node::text("\n"),
            ]
        );
    }

    #[tokio::test]
    async fn test_include_without_src_is_fatal() {
        let err = expand_include(invocation(&[], Vec::new()), Utf8PathBuf::from("."))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("src"));
    }

    #[tokio::test]
    async fn test_include_missing_file_is_fatal() {
        let err = expand_include(
            invocation(&[("src", "nope.md")], Vec::new()),
            Utf8PathBuf::from("."),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
