// src/page/mutation.rs

use ego_tree::NodeId;
use std::collections::{BTreeMap, HashMap};

/// One planned change to a single node.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Replace the node's children with a lone text node.
    SetText(String),
    /// Set (or overwrite) an attribute.
    SetAttr { name: String, value: String },
    /// Add a class, keeping existing ones.
    AddClass(String),
    /// Append raw HTML before the node's closing tag.
    AppendHtml(String),
}

/// Accumulated edits for one node. Attribute writes are last-wins; classes
/// and appended fragments keep insertion order.
#[derive(Debug, Default)]
pub struct NodeEdits {
    pub text: Option<String>,
    pub attrs: BTreeMap<String, String>,
    pub classes: Vec<String>,
    pub append_html: Vec<String>,
}

/// The full set of planned document changes, keyed by node. Planners build
/// this up; [`super::serialize::render`] applies it while emitting HTML. The
/// parsed tree itself is never touched.
#[derive(Debug, Default)]
pub struct MutationSet {
    edits: HashMap<NodeId, NodeEdits>,
}

impl MutationSet {
    pub fn new() -> MutationSet {
        MutationSet::default()
    }

    pub fn push(&mut self, node: NodeId, mutation: Mutation) {
        let edits = self.edits.entry(node).or_default();
        match mutation {
            Mutation::SetText(text) => edits.text = Some(text),
            Mutation::SetAttr { name, value } => {
                edits.attrs.insert(name, value);
            }
            Mutation::AddClass(class) => {
                if !edits.classes.iter().any(|c| c == &class) {
                    edits.classes.push(class);
                }
            }
            Mutation::AppendHtml(html) => edits.append_html.push(html),
        }
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        self.push(node, Mutation::SetText(text.into()));
    }

    pub fn set_attr(&mut self, node: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.push(
            node,
            Mutation::SetAttr {
                name: name.into(),
                value: value.into(),
            },
        );
    }

    pub fn add_class(&mut self, node: NodeId, class: impl Into<String>) {
        self.push(node, Mutation::AddClass(class.into()));
    }

    pub fn append_html(&mut self, node: NodeId, html: impl Into<String>) {
        self.push(node, Mutation::AppendHtml(html.into()));
    }

    pub fn get(&self, node: NodeId) -> Option<&NodeEdits> {
        self.edits.get(&node)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn some_node_id() -> NodeId {
        Html::parse_fragment("<p></p>").tree.root().id()
    }

    #[test]
    fn attr_writes_are_last_wins() {
        let mut set = MutationSet::new();
        let id = some_node_id();
        set.set_attr(id, "target", "_self");
        set.set_attr(id, "target", "_blank");
        let edits = set.get(id).expect("edits recorded");
        assert_eq!(edits.attrs.get("target").map(String::as_str), Some("_blank"));
    }

    #[test]
    fn classes_deduplicate() {
        let mut set = MutationSet::new();
        let id = some_node_id();
        set.add_class(id, "table");
        set.add_class(id, "table-striped");
        set.add_class(id, "table");
        assert_eq!(set.get(id).expect("edits").classes, vec!["table", "table-striped"]);
    }

    #[test]
    fn appended_fragments_keep_order() {
        let mut set = MutationSet::new();
        let id = some_node_id();
        set.append_html(id, "<b>one</b>");
        set.append_html(id, "<i>two</i>");
        let edits = set.get(id).expect("edits");
        assert_eq!(edits.append_html, vec!["<b>one</b>", "<i>two</i>"]);
    }
}
