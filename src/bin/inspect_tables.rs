use reportlift::config::Config;
use reportlift::enhance::classify;
use reportlift::localize::{discover_timestamp, scan_timestamp};
use reportlift::page::Page;
use scraper::Selector;
use std::{env, fs, path::Path, process::exit};

fn main() {
    // Expect exactly one CLI argument: path to an HTML report.
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <HTML_FILE>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect_tables(Path::new(&args[1])) {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

/// Parse the report and print what the enhancer would decide for it, without
/// writing anything. Handy when a table lands in the wrong bucket.
fn inspect_tables(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let page = Page::parse(&text);
    let cfg = Config::default();

    println!("=== Report: {} ===", path.display());

    // 1) The timestamp the localizer would pick up
    let selector = Selector::parse(&cfg.selectors.utc_time)
        .map_err(|e| format!("bad selector {:?}: {:?}", cfg.selectors.utc_time, e))?;
    let element_text = page.select_first_text(&selector);
    let scan = element_text
        .as_deref()
        .and_then(scan_timestamp)
        .or_else(|| discover_timestamp(&page.visible_text()));
    match scan {
        Some(found) => println!("Timestamp: {} UTC (pattern: {})", found.raw, found.pattern),
        None => println!("Timestamp: <none found>"),
    }

    // 2) Per-table classification
    let shapes = page.table_shapes();
    println!("Tables:    {}", shapes.len());
    println!();

    for (idx, shape) in shapes.iter().enumerate() {
        let kind = classify(
            shape.heading.as_deref(),
            shape.headers.len(),
            &cfg.classification,
        );
        println!("--- Table {} ---", idx);
        println!(
            "  Heading: {}",
            shape.heading.as_deref().unwrap_or("<none>")
        );
        println!("  Kind:    {}", kind.label());
        println!("  Columns: {}", shape.headers.len());
        println!("  Rows:    {}", shape.body_rows.len());
        println!("  Links:   {}", shape.links.len());
        if !shape.headers.is_empty() {
            println!("  Headers:");
            for header in &shape.headers {
                println!("  - {}", header);
            }
        }
        println!();
    }

    Ok(())
}
