// src/page/serialize.rs
//
// Emits a parsed document back out as HTML, applying a MutationSet along the
// way. This keeps the whole pipeline read-only until the very last step: the
// tree produced by the parser is never modified in place.

use super::mutation::{MutationSet, NodeEdits};
use ego_tree::NodeRef;
use scraper::{Html, Node};
use std::collections::BTreeMap;

/// Elements with no closing tag and no children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serialize `html` with `edits` applied. Attributes come out sorted by name
/// so repeated runs produce identical bytes.
pub fn render(html: &Html, edits: &MutationSet) -> String {
    let mut out = String::new();
    render_node(html.tree.root(), edits, false, &mut out);
    out
}

fn render_node(node: NodeRef<Node>, edits: &MutationSet, raw_text: bool, out: &mut String) {
    match node.value() {
        Node::Document | Node::Fragment => {
            for child in node.children() {
                render_node(child, edits, raw_text, out);
            }
        }
        Node::Doctype(doctype) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype.name());
            out.push('>');
        }
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                push_escaped_text(text, out);
            }
        }
        Node::Element(element) => {
            let name = element.name();
            let node_edits = edits.get(node.id());

            out.push('<');
            out.push_str(name);
            let merged = merge_attrs(element, node_edits);
            for (attr_name, value) in &merged {
                out.push(' ');
                out.push_str(attr_name);
                out.push_str("=\"");
                push_escaped_attr(value, out);
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&name) {
                return;
            }

            let children_raw = RAW_TEXT_ELEMENTS.contains(&name);
            match node_edits.and_then(|e| e.text.as_deref()) {
                Some(replacement) => {
                    if children_raw {
                        out.push_str(replacement);
                    } else {
                        push_escaped_text(replacement, out);
                    }
                }
                None => {
                    for child in node.children() {
                        render_node(child, edits, children_raw, out);
                    }
                }
            }
            if let Some(e) = node_edits {
                for fragment in &e.append_html {
                    out.push_str(fragment);
                }
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Node::ProcessingInstruction(_) => {}
    }
}

/// Original attributes overlaid with edits, classes merged, sorted by name.
fn merge_attrs(
    element: &scraper::node::Element,
    edits: Option<&NodeEdits>,
) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = element
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    if let Some(e) = edits {
        for (k, v) in &e.attrs {
            merged.insert(k.clone(), v.clone());
        }
        if !e.classes.is_empty() {
            // classes() is set-backed; split the attribute text instead so
            // the source order survives a re-run.
            let mut classes: Vec<String> = element
                .attr("class")
                .map(|value| value.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            for class in &e.classes {
                if !classes.iter().any(|c| c == class) {
                    classes.push(class.clone());
                }
            }
            merged.insert("class".to_string(), classes.join(" "));
        }
    }
    merged
}

/// Attribute-escape a value for callers building HTML fragments by hand.
pub fn escape_attr_value(value: &str) -> String {
    let mut out = String::new();
    push_escaped_attr(value, &mut out);
    out
}

fn push_escaped_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn push_escaped_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::mutation::MutationSet;
    use scraper::{Html, Selector};

    fn first_id(html: &Html, selector: &str) -> ego_tree::NodeId {
        let sel = Selector::parse(selector).expect("selector should parse");
        html.select(&sel).next().expect("element present").id()
    }

    #[test]
    fn untouched_document_round_trips() {
        let html = Html::parse_document(
            "<!DOCTYPE html><html><head></head><body><p>hi</p></body></html>",
        );
        let out = render(&html, &MutationSet::new());
        assert_eq!(
            out,
            "<!DOCTYPE html><html><head></head><body><p>hi</p></body></html>"
        );
    }

    #[test]
    fn attributes_come_out_sorted() {
        let html = Html::parse_document(r#"<p title="t" id="x" class="c">hi</p>"#);
        let out = render(&html, &MutationSet::new());
        assert!(out.contains(r#"<p class="c" id="x" title="t">hi</p>"#));
    }

    #[test]
    fn set_text_replaces_children() {
        let html = Html::parse_document(r#"<div id="t"><span>old</span></div>"#);
        let mut edits = MutationSet::new();
        edits.set_text(first_id(&html, "#t"), "new & improved");
        let out = render(&html, &edits);
        assert!(out.contains(r#"<div id="t">new &amp; improved</div>"#));
        assert!(!out.contains("old"));
    }

    #[test]
    fn set_attr_overwrites_and_escapes() {
        let html = Html::parse_document(r#"<a id="l" target="_self" href="/x">x</a>"#);
        let mut edits = MutationSet::new();
        let id = first_id(&html, "#l");
        edits.set_attr(id, "target", "_blank");
        edits.set_attr(id, "data-enhance", r#"{"paging":false}"#);
        let out = render(&html, &edits);
        assert!(out.contains(r#"data-enhance="{&quot;paging&quot;:false}""#));
        assert!(out.contains(r#"target="_blank""#));
        assert!(!out.contains("_self"));
    }

    #[test]
    fn classes_merge_without_duplicates() {
        let html = Html::parse_document(r#"<table class="table wide"><tr><td>x</td></tr></table>"#);
        let mut edits = MutationSet::new();
        let id = first_id(&html, "table");
        edits.add_class(id, "table");
        edits.add_class(id, "table-striped");
        let out = render(&html, &edits);
        // source classes keep their order, additions follow
        assert!(out.contains(r#"class="table wide table-striped""#));

        // a second pass over the merged output leaves the list alone
        let again = render(&Html::parse_document(&out), &MutationSet::new());
        assert!(again.contains(r#"class="table wide table-striped""#));
    }

    #[test]
    fn append_lands_before_closing_tag() {
        let html = Html::parse_document("<body><p>content</p></body>");
        let mut edits = MutationSet::new();
        edits.append_html(first_id(&html, "body"), r#"<script id="x">run();</script>"#);
        let out = render(&html, &edits);
        assert!(out.contains(r#"<p>content</p><script id="x">run();</script></body>"#));
    }

    #[test]
    fn script_text_is_not_escaped() {
        let html = Html::parse_document("<body><script>if (a < b && c) { go(); }</script></body>");
        let out = render(&html, &MutationSet::new());
        assert!(out.contains("<script>if (a < b && c) { go(); }</script>"));
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let html = Html::parse_document(r#"<head><link rel="stylesheet" href="a.css"></head>"#);
        let out = render(&html, &MutationSet::new());
        assert!(out.contains(r#"<link href="a.css" rel="stylesheet">"#));
        assert!(!out.contains("</link>"));
    }

    #[test]
    fn rendering_is_a_fixed_point() {
        let html = Html::parse_document(
            r#"<!DOCTYPE html><html><head><title>R</title></head>
            <body><table class="z a"><tbody><tr><td>1 &amp; 2</td></tr></tbody></table>
            <script>var x = 1 < 2;</script></body></html>"#,
        );
        let once = render(&html, &MutationSet::new());
        let twice = render(&Html::parse_document(&once), &MutationSet::new());
        assert_eq!(once, twice);
    }
}
