// src/enhance/mod.rs

pub mod columns;
pub mod options;

use crate::config::{ClassificationConfig, Config};
use crate::page::mutation::MutationSet;
use crate::page::TableShape;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use columns::ColumnRule;
use options::TableOptions;

/// How a table is treated after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Reference material: everything stays visible, optionally filterable.
    Static { searchable: bool },
    /// Working data: paged, searchable, sortable.
    Interactive,
}

impl TableKind {
    pub fn label(&self) -> &'static str {
        match self {
            TableKind::Static { searchable: false } => "static",
            TableKind::Static { searchable: true } => "static-searchable",
            TableKind::Interactive => "interactive",
        }
    }
}

/// What one table got out of planning, for logging and inspection.
#[derive(Debug)]
pub struct TableSummary {
    pub heading: Option<String>,
    pub kind: TableKind,
    pub columns: usize,
    pub rows: usize,
    pub keyed_cells: usize,
    pub links_rewritten: usize,
}

/// Decide a table's kind from its preceding heading and column count.
/// Heading rules run in order, first hit wins; the column threshold only
/// applies when no rule matched.
pub fn classify(
    heading: Option<&str>,
    column_count: usize,
    rules: &ClassificationConfig,
) -> TableKind {
    if let Some(text) = heading {
        for rule in &rules.static_headings {
            if text.contains(&rule.contains) {
                return TableKind::Static {
                    searchable: rule.searchable,
                };
            }
        }
    }
    if column_count <= rules.max_static_columns {
        return TableKind::Static { searchable: false };
    }
    TableKind::Interactive
}

/// Plan every change for one table: visual classes, sort keys, the options
/// attribute, and link targets.
pub fn plan_table(
    shape: &TableShape,
    cfg: &Config,
    now: DateTime<Utc>,
    edits: &mut MutationSet,
) -> Result<TableSummary> {
    // 1) shared visual classes on every table
    for class in &cfg.table_classes {
        edits.add_class(shape.node, class.clone());
    }

    // 2) classify
    let kind = classify(
        shape.heading.as_deref(),
        shape.headers.len(),
        &cfg.classification,
    );

    // 3) sort keys and default order, interactive tables only
    let mut keyed_cells = 0;
    let table_options = match kind {
        TableKind::Static { searchable } => TableOptions::static_table(searchable),
        TableKind::Interactive => {
            let rules: Vec<Option<ColumnRule>> = shape
                .headers
                .iter()
                .map(|header| ColumnRule::for_header(header))
                .collect();
            for row in &shape.body_rows {
                for (idx, cell) in row.iter().enumerate() {
                    if let Some(Some(rule)) = rules.get(idx) {
                        edits.set_attr(cell.node, "data-order", rule.sort_key(&cell.text, now));
                        keyed_cells += 1;
                    }
                }
            }
            TableOptions::interactive(
                cfg.interactive.page_length,
                &cfg.interactive.length_sizes,
                default_order(&shape.headers, &cfg.interactive.default_order_column),
            )
        }
    };

    // 4) attach the serialized options
    let encoded = serde_json::to_string(&table_options)
        .context("serializing table options to JSON")?;
    edits.set_attr(shape.node, options::ENHANCE_ATTR, encoded);

    // 5) open table links in a new tab, leaving in-page anchors alone
    let mut links_rewritten = 0;
    for link in &shape.links {
        match link.href.as_deref() {
            Some(href) if !href.is_empty() && !href.starts_with('#') => {}
            _ => continue,
        }
        edits.set_attr(link.node, "target", "_blank");
        edits.set_attr(link.node, "rel", "noopener noreferrer");
        links_rewritten += 1;
    }

    Ok(TableSummary {
        heading: shape.heading.clone(),
        kind,
        columns: shape.headers.len(),
        rows: shape.body_rows.len(),
        keyed_cells,
        links_rewritten,
    })
}

/// `[[idx, "asc"]]` for the configured default column, when present.
fn default_order(headers: &[String], wanted: &str) -> Vec<(usize, String)> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        .map(|idx| vec![(idx, "asc".to_string())])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 26, 5, 5, 43).single().expect("valid")
    }

    fn default_rules() -> ClassificationConfig {
        Config::default().classification
    }

    #[test]
    fn heading_rules_classify_in_order() {
        let rules = default_rules();
        assert_eq!(
            classify(Some("Historical Releases of Extensions"), 8, &rules),
            TableKind::Static { searchable: true }
        );
        assert_eq!(
            classify(Some("Summary"), 8, &rules),
            TableKind::Static { searchable: false }
        );
        assert_eq!(
            classify(Some("Current Release Context"), 8, &rules),
            TableKind::Static { searchable: false }
        );
        // Both substrings present: the earlier rule wins, keeping search.
        assert_eq!(
            classify(Some("Historical Releases Summary"), 8, &rules),
            TableKind::Static { searchable: true }
        );
    }

    #[test]
    fn narrow_tables_stay_static_without_a_matching_heading() {
        let rules = default_rules();
        assert_eq!(
            classify(Some("Extension Details"), 3, &rules),
            TableKind::Static { searchable: false }
        );
        assert_eq!(
            classify(None, 2, &rules),
            TableKind::Static { searchable: false }
        );
        assert_eq!(classify(None, 4, &rules), TableKind::Interactive);
        assert_eq!(classify(Some("Extension Details"), 5, &rules), TableKind::Interactive);
    }

    fn interactive_fixture() -> Page {
        Page::parse(
            r##"<html><body>
            <h2>Extension Overview</h2>
            <table>
              <thead><tr>
                <th>Extension</th><th>Status</th><th>Stars</th>
                <th>Last Activity</th><th>Repository</th>
              </tr></thead>
              <tbody>
                <tr>
                  <td><a href="https://github.com/org/x">x</a></td>
                  <td>🟢 Ongoing</td>
                  <td>1,234</td>
                  <td>3 days ago</td>
                  <td><a href="#notes">notes</a></td>
                </tr>
              </tbody>
            </table>
            </body></html>"##,
        )
    }

    #[test]
    fn interactive_table_gets_the_full_plan() -> Result<()> {
        let page = interactive_fixture();
        let shapes = page.table_shapes();
        let mut edits = MutationSet::new();
        let summary = plan_table(&shapes[0], &Config::default(), now(), &mut edits)?;

        assert_eq!(summary.kind, TableKind::Interactive);
        assert_eq!(summary.columns, 5);
        assert_eq!(summary.keyed_cells, 3);
        assert_eq!(summary.links_rewritten, 1);

        let table_edits = edits.get(shapes[0].node).expect("table edited");
        assert_eq!(table_edits.classes, vec!["table", "table-striped", "table-hover"]);
        let encoded = table_edits.attrs.get("data-enhance").expect("options attached");
        assert!(encoded.contains(r#""pageLength":25"#));
        assert!(encoded.contains(r#""order":[[0,"asc"]]"#));

        let row = &shapes[0].body_rows[0];
        assert!(edits.get(row[0].node).is_none());
        assert_eq!(
            edits.get(row[1].node).expect("status keyed").attrs["data-order"],
            "0-ongoing"
        );
        assert_eq!(
            edits.get(row[2].node).expect("stars keyed").attrs["data-order"],
            "1234"
        );
        let activity = &edits.get(row[3].node).expect("activity keyed").attrs["data-order"];
        let expected = now() - chrono::Duration::try_days(3).expect("in range");
        assert_eq!(activity, &expected.timestamp_millis().to_string());
        Ok(())
    }

    #[test]
    fn external_links_open_in_new_tabs_but_anchors_do_not() -> Result<()> {
        let page = interactive_fixture();
        let shapes = page.table_shapes();
        let mut edits = MutationSet::new();
        plan_table(&shapes[0], &Config::default(), now(), &mut edits)?;

        let external = shapes[0]
            .links
            .iter()
            .find(|l| l.href.as_deref() == Some("https://github.com/org/x"))
            .expect("external link present");
        let rewritten = edits.get(external.node).expect("rewritten");
        assert_eq!(rewritten.attrs["target"], "_blank");
        assert_eq!(rewritten.attrs["rel"], "noopener noreferrer");

        let anchor = shapes[0]
            .links
            .iter()
            .find(|l| l.href.as_deref() == Some("#notes"))
            .expect("fragment link present");
        assert!(edits.get(anchor.node).is_none());
        Ok(())
    }

    #[test]
    fn summary_table_is_planned_static() -> Result<()> {
        let page = Page::parse(
            r#"<body><h2>Summary</h2>
            <table><thead><tr><th>Metric</th><th>Value</th></tr></thead>
            <tbody><tr><td>Total</td><td>47</td></tr></tbody></table></body>"#,
        );
        let shapes = page.table_shapes();
        let mut edits = MutationSet::new();
        let summary = plan_table(&shapes[0], &Config::default(), now(), &mut edits)?;

        assert_eq!(summary.kind, TableKind::Static { searchable: false });
        assert_eq!(summary.keyed_cells, 0);
        let encoded = &edits.get(shapes[0].node).expect("table edited").attrs["data-enhance"];
        assert!(encoded.contains(r#""dom":"t""#));
        assert!(encoded.contains(r#""searching":false"#));
        assert!(edits.get(shapes[0].body_rows[0][1].node).is_none());
        Ok(())
    }

    #[test]
    fn historical_table_keeps_search() -> Result<()> {
        let page = Page::parse(
            r#"<body><h2>Historical Releases</h2>
            <table><thead><tr><th>Version</th><th>Date</th><th>Notes</th><th>Link</th></tr></thead>
            <tbody><tr><td>1.0</td><td>2024-01-01</td><td>first</td><td></td></tr></tbody>
            </table></body>"#,
        );
        let shapes = page.table_shapes();
        let mut edits = MutationSet::new();
        let summary = plan_table(&shapes[0], &Config::default(), now(), &mut edits)?;

        assert_eq!(summary.kind, TableKind::Static { searchable: true });
        let encoded = &edits.get(shapes[0].node).expect("table edited").attrs["data-enhance"];
        assert!(encoded.contains(r#""dom":"ft""#));
        assert!(encoded.contains(r#""searching":true"#));
        Ok(())
    }

    #[test]
    fn order_defaults_to_the_extension_column_position() {
        let headers: Vec<String> = ["Status", "Extension", "Stars"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(default_order(&headers, "Extension"), vec![(1, "asc".to_string())]);
        assert!(default_order(&headers, "Missing").is_empty());
    }
}
