use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use std::sync::LazyLock;

static JUMP_TO_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"jumptosection\('([a-zA-Z0-9_-]+)'\)").expect("static regex")
});

/// Parses `input` leniently. html5ever synthesizes `<html>`, `<head>` and
/// `<body>` for fragments.
pub fn parse_html(input: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(input)
}

fn find_element(node: &Handle, name: &str) -> Option<Handle> {
    if let Some(tag) = tag_lower(node) {
        if tag == name {
            return Some(node.clone());
        }
    }
    for c in node.children.borrow().iter() {
        if let Some(found) = find_element(c, name) {
            return Some(found);
        }
    }
    None
}

pub fn body_children(dom: &RcDom) -> Vec<Handle> {
    match find_element(&dom.document, "body") {
        Some(body) => body.children.borrow().iter().cloned().collect(),
        None => dom.document.children.borrow().iter().cloned().collect(),
    }
}

pub fn document_title(dom: &RcDom) -> Option<String> {
    let title = find_element(&dom.document, "title")?;
    let text = flatten_text(&title);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn tag_lower(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

pub fn attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(name))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Whitespace-separated tokens of the `class` attribute.
pub fn class_tokens(node: &Handle) -> Vec<String> {
    attr(node, "class")
        .map(|c| c.split_ascii_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(node: &Handle, class: &str) -> bool {
    class_tokens(node).iter().any(|c| c == class)
}

pub fn is_anchor(node: &Handle) -> bool {
    tag_lower(node).as_deref() == Some("a")
}

/// Resolves the href of an anchor. Anchors wired through a
/// `jumptosection('x')` click handler are treated as `#x`.
pub fn anchor_href(node: &Handle) -> Option<String> {
    if let Some(href) = attr(node, "href") {
        return Some(href);
    }
    ["onclick", "ng-click"].iter().find_map(|handler| {
        let script = attr(node, handler)?;
        let caps = JUMP_TO_SECTION.captures(&script)?;
        Some(format!("#{}", &caps[1]))
    })
}

pub fn sanitize_href(href: &str) -> Option<String> {
    let h = href.trim();
    if h.is_empty() {
        return None;
    }
    let low = h.to_ascii_lowercase();
    if low.starts_with("javascript:") || low.starts_with("data:") || low.starts_with("vbscript:") {
        return None;
    }
    Some(h.to_string())
}

pub fn collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !in_ws {
                out.push(' ');
                in_ws = true;
            }
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

/// Descendant text, each piece collapsed and trimmed, joined by single spaces.
pub fn flatten_text(node: &Handle) -> String {
    fn walk(node: &Handle, parts: &mut Vec<String>) {
        match &node.data {
            NodeData::Text { contents } => {
                let piece = collapse_ws(&contents.borrow());
                let piece = piece.trim();
                if !piece.is_empty() {
                    parts.push(piece.to_string());
                }
            }
            NodeData::Element { .. } => {
                if matches!(tag_lower(node).as_deref(), Some("script" | "style")) {
                    return;
                }
                for c in node.children.borrow().iter() {
                    walk(c, parts);
                }
            }
            _ => {}
        }
    }

    let mut parts = Vec::new();
    walk(node, &mut parts);
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_gets_a_body() {
        let dom = parse_html("<p>one</p>\n<p>two</p>");
        let children = body_children(&dom);
        let tags: Vec<_> = children.iter().filter_map(tag_lower).collect();
        assert_eq!(tags, vec!["p", "p"]);
    }

    #[test]
    fn fragment_mentioning_html_in_a_comment_still_has_a_body() {
        let dom = parse_html("<!-- pasted from <html> export --><p id=\"a\">one</p>");
        let children = body_children(&dom);
        let tags: Vec<_> = children.iter().filter_map(tag_lower).collect();
        assert_eq!(tags, vec!["p"]);
    }

    #[test]
    fn attribute_lookup_ignores_case() {
        let dom = parse_html(r#"<p ID="Upper">x</p>"#);
        let p = body_children(&dom).remove(0);
        assert_eq!(attr(&p, "id").as_deref(), Some("Upper"));
        assert_eq!(attr(&p, "ID").as_deref(), Some("Upper"));
    }

    #[test]
    fn class_tokens_split_on_whitespace() {
        let dom = parse_html(r#"<a class=" sec-2  anchor-link ">x</a>"#);
        let a = body_children(&dom).remove(0);
        assert_eq!(class_tokens(&a), vec!["sec-2", "anchor-link"]);
        assert!(has_class(&a, "anchor-link"));
        assert!(!has_class(&a, "anchor"));
    }

    #[test]
    fn flatten_joins_descendants_with_single_spaces() {
        let dom = parse_html("<div>  Hello<b>bold\n\n text</b>  <i> end </i></div>");
        let div = body_children(&dom).remove(0);
        assert_eq!(flatten_text(&div), "Hello bold text end");
    }

    #[test]
    fn onclick_jump_is_rewritten_to_fragment() {
        let dom = parse_html(r#"<a onclick="jumptosection('part-2');">Part 2</a>"#);
        let a = body_children(&dom).remove(0);
        assert_eq!(anchor_href(&a).as_deref(), Some("#part-2"));
    }

    #[test]
    fn href_wins_over_onclick() {
        let dom = parse_html(r##"<a href="#a" onclick="jumptosection('b');">x</a>"##);
        let a = body_children(&dom).remove(0);
        assert_eq!(anchor_href(&a).as_deref(), Some("#a"));
    }

    #[test]
    fn script_hrefs_are_refused() {
        assert_eq!(sanitize_href(" javascript:alert(1)"), None);
        assert_eq!(sanitize_href(""), None);
        assert_eq!(
            sanitize_href(" https://example.com ").as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn title_is_read_from_head() {
        let dom = parse_html("<html><head><title> My  Doc </title></head><body></body></html>");
        assert_eq!(document_title(&dom).as_deref(), Some("My Doc"));
    }
}
