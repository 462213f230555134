// src/enhance/options.rs
//
// The declarative option block for one table. The block is serialized into
// the table's data-enhance attribute; a small loader script hands it to the
// table library at DOMContentLoaded. No page logic beyond that loader.

use crate::page::serialize::escape_attr_value;
use serde::Serialize;
use serde_json::{json, Value};

/// Control layout for static tables: table only.
pub const LAYOUT_STATIC: &str = "t";
/// Control layout for static-but-searchable tables: filter box above the
/// table.
pub const LAYOUT_STATIC_SEARCH: &str = "ft";
/// Control layout for interactive tables: length picker and filter on top,
/// info and paging below.
pub const LAYOUT_INTERACTIVE: &str = r#"<"top"lf>rt<"bottom"ip><"clear">"#;

/// Attribute holding the serialized options on each enhanced table.
pub const ENHANCE_ATTR: &str = "data-enhance";
/// Element id of the injected loader script, which doubles as the guard
/// against injecting it twice.
pub const LOADER_ID: &str = "reportlift-loader";

/// Table-library options, named to serialize straight into the client-side
/// option object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    pub paging: bool,
    pub length_change: bool,
    pub searching: bool,
    pub info: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_menu: Option<Value>,
    /// Always serialized; the library treats a missing `order` as
    /// first-column ascending, not as unsorted.
    pub order: Vec<(usize, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub column_defs: Vec<ColumnDef>,
    pub responsive: bool,
    pub dom: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub orderable: bool,
    pub targets: String,
}

impl TableOptions {
    /// A table that just sits there: no paging, no length picker, no info
    /// line. `searchable` keeps the filter box.
    pub fn static_table(searchable: bool) -> TableOptions {
        TableOptions {
            paging: false,
            length_change: false,
            searching: searchable,
            info: false,
            page_length: None,
            length_menu: None,
            order: Vec::new(),
            column_defs: Vec::new(),
            responsive: true,
            dom: if searchable {
                LAYOUT_STATIC_SEARCH
            } else {
                LAYOUT_STATIC
            }
            .to_string(),
        }
    }

    /// The full treatment: paging, length menu with an All entry, search,
    /// info line, every column orderable.
    pub fn interactive(
        page_length: u32,
        length_sizes: &[u32],
        order: Vec<(usize, String)>,
    ) -> TableOptions {
        TableOptions {
            paging: true,
            length_change: true,
            searching: true,
            info: true,
            page_length: Some(page_length),
            length_menu: Some(length_menu(length_sizes)),
            order,
            column_defs: vec![ColumnDef {
                orderable: true,
                targets: "_all".to_string(),
            }],
            responsive: true,
            dom: LAYOUT_INTERACTIVE.to_string(),
        }
    }
}

/// `[[10, 25, 50, 100, -1], [10, 25, 50, 100, "All"]]`
fn length_menu(sizes: &[u32]) -> Value {
    let mut values: Vec<Value> = sizes.iter().map(|s| json!(s)).collect();
    values.push(json!(-1));
    let mut labels: Vec<Value> = sizes.iter().map(|s| json!(s)).collect();
    labels.push(json!("All"));
    json!([values, labels])
}

/// The loader script appended before `</body>`. It finds every table
/// carrying the options attribute and hands it to `constructor` (validated
/// at config load to be a plain identifier path).
pub fn loader_snippet(constructor: &str) -> String {
    format!(
        r#"<script id="{id}">document.addEventListener("DOMContentLoaded",function(){{document.querySelectorAll("table[data-enhance]").forEach(function(el){{new {ctor}(el,JSON.parse(el.dataset.enhance));}});}});</script>"#,
        id = LOADER_ID,
        ctor = constructor
    )
}

/// Attributes are written name-sorted, the serializer's normal form, so a
/// re-run emits the injected tag unchanged.
pub fn stylesheet_tag(href: &str) -> String {
    format!(r#"<link href="{}" rel="stylesheet">"#, escape_attr_value(href))
}

pub fn script_tag(src: &str) -> String {
    format!(r#"<script src="{}"></script>"#, escape_attr_value(src))
}
