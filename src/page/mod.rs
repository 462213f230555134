// src/page/mod.rs

pub mod mutation;
pub mod serialize;

use ego_tree::{NodeId, NodeRef};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("selector should parse"));
static HEAD_CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("thead th").expect("selector should parse"));
static BODY_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tbody tr").expect("selector should parse"));
static CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, td").expect("selector should parse"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("selector should parse"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("selector should parse"));
static HEAD: Lazy<Selector> = Lazy::new(|| Selector::parse("head").expect("selector should parse"));
static STYLESHEET: Lazy<Selector> =
    Lazy::new(|| Selector::parse("link[rel=stylesheet]").expect("selector should parse"));
static SCRIPT_SRC: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[src]").expect("selector should parse"));
static ANY_ID: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[id]").expect("selector should parse"));

/// A parsed report page. The tree is never mutated; planners read it and
/// record changes in a [`mutation::MutationSet`] which the serializer applies
/// on the way out.
pub struct Page {
    html: Html,
}

/// Everything the table planner needs to know about one `<table>`.
#[derive(Debug)]
pub struct TableShape {
    pub node: NodeId,
    /// Normalized text of the nearest preceding heading, if any.
    pub heading: Option<String>,
    /// Normalized `<thead>` cell texts; empty when the table has no head.
    pub headers: Vec<String>,
    pub body_rows: Vec<Vec<CellShape>>,
    /// Anchors anywhere inside the table, with their `href` if present.
    pub links: Vec<LinkShape>,
}

#[derive(Debug)]
pub struct CellShape {
    pub node: NodeId,
    pub text: String,
}

#[derive(Debug)]
pub struct LinkShape {
    pub node: NodeId,
    pub href: Option<String>,
}

impl Page {
    pub fn parse(text: &str) -> Page {
        Page {
            html: Html::parse_document(text),
        }
    }

    pub fn document(&self) -> &Html {
        &self.html
    }

    /// Node id of the first element matching `selector`, if any.
    pub fn select_first(&self, selector: &Selector) -> Option<NodeId> {
        self.html.select(selector).next().map(|el| el.id())
    }

    /// Normalized text content of the first element matching `selector`.
    pub fn select_first_text(&self, selector: &Selector) -> Option<String> {
        self.html.select(selector).next().map(|el| normalized_text(&el))
    }

    pub fn body_id(&self) -> Option<NodeId> {
        self.select_first(&BODY)
    }

    pub fn head_id(&self) -> Option<NodeId> {
        self.select_first(&HEAD)
    }

    /// True when some element already carries the given `id` attribute.
    pub fn has_element_id(&self, id: &str) -> bool {
        self.html
            .select(&ANY_ID)
            .any(|el| el.value().attr("id") == Some(id))
    }

    pub fn has_stylesheet(&self, href: &str) -> bool {
        self.html
            .select(&STYLESHEET)
            .any(|el| el.value().attr("href") == Some(href))
    }

    pub fn has_script(&self, src: &str) -> bool {
        self.html
            .select(&SCRIPT_SRC)
            .any(|el| el.value().attr("src") == Some(src))
    }

    /// Visible text of the whole document, for timestamp discovery when the
    /// dedicated element is missing. Script and style bodies are skipped.
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        collect_visible_text(self.html.tree.root(), &mut out);
        out
    }

    /// Extract the shape of every `<table>` in document order.
    pub fn table_shapes(&self) -> Vec<TableShape> {
        self.html
            .select(&TABLE)
            .map(|table| {
                // Tables without an explicit <thead> deliberately report zero
                // header columns, which classifies them static by threshold.
                let headers: Vec<String> = table
                    .select(&HEAD_CELL)
                    .map(|th| normalized_text(&th))
                    .collect();
                let body_rows: Vec<Vec<CellShape>> = table
                    .select(&BODY_ROW)
                    .map(|tr| row_cells(&tr))
                    .collect();
                let links = table
                    .select(&ANCHOR)
                    .map(|a| LinkShape {
                        node: a.id(),
                        href: a.value().attr("href").map(str::to_string),
                    })
                    .collect();
                TableShape {
                    node: table.id(),
                    heading: preceding_heading_text(*table),
                    headers,
                    body_rows,
                    links,
                }
            })
            .collect()
    }
}

fn row_cells(tr: &ElementRef) -> Vec<CellShape> {
    tr.select(&CELL)
        .map(|cell| CellShape {
            node: cell.id(),
            text: normalized_text(&cell),
        })
        .collect()
}

/// Element text with runs of whitespace collapsed to single spaces.
pub fn normalized_text(el: &ElementRef) -> String {
    let mut out = String::new();
    for piece in el.text() {
        for word in piece.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

/// Walk backwards from `node` looking for the closest heading that precedes
/// it: previous siblings first, then the parent's previous siblings, and so
/// on up the tree. Stops at `body`/`html` so a page title far above an
/// unrelated section is not picked up through them.
fn preceding_heading_text(node: NodeRef<Node>) -> Option<String> {
    let mut current = node;
    loop {
        let mut sibling = current.prev_sibling();
        while let Some(s) = sibling {
            if let Some(el) = ElementRef::wrap(s) {
                if is_heading(el.value().name()) {
                    return Some(normalized_text(&el));
                }
                // A sibling container may end with a heading (e.g. a div
                // wrapping the section title).
                if let Some(found) = last_heading_within(el) {
                    return Some(found);
                }
            }
            sibling = s.prev_sibling();
        }
        let parent = current.parent()?;
        let parent_el = ElementRef::wrap(parent)?;
        if matches!(parent_el.value().name(), "body" | "html") {
            return None;
        }
        current = parent;
    }
}

fn last_heading_within(el: ElementRef) -> Option<String> {
    static HEADINGS: Lazy<Selector> =
        Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("selector should parse"));
    el.select(&HEADINGS).last().map(|h| normalized_text(&h))
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn collect_visible_text(node: NodeRef<Node>, out: &mut String) {
    if let Some(el) = node.value().as_element() {
        if matches!(el.name(), "script" | "style") {
            return;
        }
    }
    if let Some(text) = node.value().as_text() {
        out.push_str(text);
        out.push(' ');
    }
    for child in node.children() {
        collect_visible_text(child, out);
    }
}
