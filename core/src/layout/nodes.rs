//! Splitting a chapter body into the top-level nodes pagination works on.

use kuchiki::NodeRef;
use kuchiki::traits::*;

/// Elements that are never moved as "small" content; they get a page of their own when they
/// do not fit next to existing content.
const LARGE_TAGS: &[&str] = &["img", "figure", "table", "picture", "svg", "video"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Small,
    Large,
}

/// One top-level node of a chapter body, serialized back to markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    pub markup: String,
    pub kind: NodeKind,
    /// Lowercase tag name, `None` for text.
    pub tag: Option<String>,
}

impl ContentNode {
    pub fn is_large(&self) -> bool {
        self.kind == NodeKind::Large
    }
}

/// Parse `body` and return its top-level content nodes in document order.
///
/// Comments, doctypes and whitespace-only text between blocks are not content and are skipped.
pub fn parse_nodes(body: &str) -> Vec<ContentNode> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let document = kuchiki::parse_html().one(body.to_string());
    // The tree builder hoists leading <style>, <link>, <meta>, <script> and <title> into <head>;
    // walking head before body keeps them, in their original order.
    let mut nodes = Vec::new();
    for section in ["head", "body"] {
        let Ok(root) = document.select_first(section) else {
            continue;
        };
        nodes.extend(root.as_node().children().filter_map(|child| content_node(&child)));
    }
    nodes
}

/// Concatenate node markup into one fragment.
pub fn join_markup(nodes: &[ContentNode]) -> String {
    let capacity = nodes.iter().map(|node| node.markup.len()).sum();
    nodes.iter().fold(String::with_capacity(capacity), |mut markup, node| {
        markup.push_str(&node.markup);
        markup
    })
}

fn content_node(node: &NodeRef) -> Option<ContentNode> {
    if let Some(text) = node.as_text() {
        if text.borrow().trim().is_empty() {
            return None;
        }
        return Some(ContentNode { markup: node.to_string(), kind: NodeKind::Small, tag: None });
    }

    let element = node.as_element()?;
    let tag = element.name.local.to_lowercase();
    let kind = if LARGE_TAGS.contains(&tag.as_str()) { NodeKind::Large } else { NodeKind::Small };
    Some(ContentNode { markup: node.to_string(), kind, tag: Some(tag) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_classifies_nodes() {
        let nodes = parse_nodes("<h2>Title</h2>\n<p>One</p>\n<!-- ad -->\n<img src=\"a.png\">loose text<table><tr><td>x</td></tr></table>");
        let tags: Vec<_> = nodes.iter().map(|node| node.tag.as_deref()).collect();
        assert_eq!(tags, vec![Some("h2"), Some("p"), Some("img"), None, Some("table")]);
        assert!(nodes[2].is_large());
        assert!(!nodes[3].is_large());
        assert!(nodes[4].is_large());
        assert_eq!(nodes[1].markup, "<p>One</p>");
    }

    #[test]
    fn leading_head_elements_stay_in_order() {
        let nodes = parse_nodes("<style>p { color: red }</style><link rel=\"stylesheet\" href=\"x.css\"><p>One</p><script>x()</script>");
        let tags: Vec<_> = nodes.iter().map(|node| node.tag.as_deref()).collect();
        assert_eq!(tags, vec![Some("style"), Some("link"), Some("p"), Some("script")]);
        assert_eq!(nodes[0].markup, "<style>p { color: red }</style>");
    }

    #[test]
    fn blank_body_has_no_nodes() {
        assert!(parse_nodes("").is_empty());
        assert!(parse_nodes("  \n\t ").is_empty());
        assert!(parse_nodes("<!-- nothing here -->").is_empty());
    }

    #[test]
    fn joined_markup_reparses_to_the_same_nodes() {
        let nodes = parse_nodes("<p>a &amp; b</p><p><em>c</em></p>");
        let again = parse_nodes(&join_markup(&nodes));
        assert_eq!(nodes, again);
    }
}
