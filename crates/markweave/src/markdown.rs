//! Markdown to HTML conversion.
//!
//! Marker comments pass through pulldown-cmark as raw HTML events, so a
//! `<!-- ::quiz -->` written in markdown arrives intact in the HTML that
//! the fragment parser then turns into a tree.

use pulldown_cmark::{html, Options, Parser};

pub fn markdown_to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let html = markdown_to_html("# Title\n\nSome *text*.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn test_marker_comments_survive() {
        let html = markdown_to_html("before\n\n<!-- ::quiz title=\"Q1\" -->\n\nafter");
        assert!(html.contains("<!-- ::quiz title=\"Q1\" -->"));
    }

    #[test]
    fn test_tables_enabled() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
    }
}
