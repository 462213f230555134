// src/process/mod.rs

use crate::config::Config;
use crate::enhance::options::{loader_snippet, script_tag, stylesheet_tag, LOADER_ID};
use crate::enhance::{plan_table, TableSummary};
use crate::localize::{localize, LocalTime, TargetZone};
use crate::page::mutation::MutationSet;
use crate::page::{serialize, Page};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use scraper::Selector;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// One fully configured enhancement run. Everything here is shared across
/// input files, so a batch can fan out over worker threads with `&Enhancer`.
pub struct Enhancer {
    cfg: Config,
    utc_selector: Selector,
    local_selector: Selector,
    zone: TargetZone,
    now: DateTime<Utc>,
}

/// The enhanced document plus what was done to it.
pub struct Enhanced {
    pub html: String,
    pub report: DocumentReport,
}

#[derive(Debug)]
pub struct DocumentReport {
    pub local_time: LocalTime,
    pub tables: Vec<TableSummary>,
    pub planned_edits: usize,
}

#[derive(Debug)]
pub struct FileOutcome {
    /// Output differs from the input text.
    pub changed: bool,
    pub tables: usize,
}

impl Enhancer {
    pub fn new(cfg: Config, now: DateTime<Utc>) -> Result<Enhancer> {
        let utc_selector = parse_selector(&cfg.selectors.utc_time)?;
        let local_selector = parse_selector(&cfg.selectors.local_time)?;
        let zone = TargetZone::from_config(cfg.timezone.as_deref())?;
        Ok(Enhancer {
            utc_selector,
            local_selector,
            zone,
            now,
            cfg,
        })
    }

    /// Run the whole pipeline on one document: parse, plan every change,
    /// then serialize with the planned edits applied. The parsed tree is
    /// never mutated.
    pub fn enhance_document(&self, input: &str) -> Result<Enhanced> {
        // 1) Parse once; read-only from here on
        let page = Page::parse(input);
        let mut edits = MutationSet::new();

        // 2) Timestamp localization
        let element_text = page.select_first_text(&self.utc_selector);
        let local_time = localize(
            element_text.as_deref(),
            &page.visible_text(),
            &self.zone,
            self.now,
        );
        match &local_time {
            LocalTime::Localized { raw, pattern, .. } => {
                debug!(raw, pattern, "localized report timestamp");
            }
            LocalTime::CurrentTime { .. } => {
                warn!("no report timestamp found, falling back to the current time");
            }
            LocalTime::Unavailable => warn!("could not render a local time"),
        }
        match page.select_first(&self.local_selector) {
            Some(node) => {
                edits.set_text(node, local_time.display());
                edits.set_attr(node, "title", self.cfg.tooltip.clone());
            }
            None => warn!(
                selector = %self.cfg.selectors.local_time,
                "local-time element not found, skipping localization"
            ),
        }

        // 3) Tables
        let mut tables = Vec::new();
        for shape in page.table_shapes() {
            let summary = plan_table(&shape, &self.cfg, self.now, &mut edits)?;
            debug!(
                heading = summary.heading.as_deref().unwrap_or("<none>"),
                kind = summary.kind.label(),
                columns = summary.columns,
                rows = summary.rows,
                "planned table"
            );
            tables.push(summary);
        }

        // 4) Library includes and the loader, each guarded against doubling
        if let Some(head) = page.head_id() {
            for href in &self.cfg.library.styles {
                if !page.has_stylesheet(href) {
                    edits.append_html(head, stylesheet_tag(href));
                }
            }
            for src in &self.cfg.library.scripts {
                if !page.has_script(src) {
                    edits.append_html(head, script_tag(src));
                }
            }
        }
        if self.cfg.library.inject_loader && !tables.is_empty() && !page.has_element_id(LOADER_ID) {
            match page.body_id() {
                Some(body) => {
                    edits.append_html(body, loader_snippet(&self.cfg.library.constructor));
                }
                None => warn!("document has no body, loader not injected"),
            }
        }

        // 5) Apply everything while serializing
        let planned_edits = edits.len();
        let html = serialize::render(page.document(), &edits);
        Ok(Enhanced {
            html,
            report: DocumentReport {
                local_time,
                tables,
                planned_edits,
            },
        })
    }

    /// Enhance one file on disk. The write goes through a temp file in the
    /// destination directory so readers never see a half-written page.
    #[tracing::instrument(level = "info", skip(self, input, output), fields(input = %input.display()))]
    pub fn process_file(&self, input: &Path, output: &Path, dry_run: bool) -> Result<FileOutcome> {
        let text = fs::read_to_string(input)
            .with_context(|| format!("reading {}", input.display()))?;
        let enhanced = self
            .enhance_document(&text)
            .with_context(|| format!("enhancing {}", input.display()))?;
        let changed = enhanced.html != text;
        if !dry_run {
            write_atomic(output, &enhanced.html)
                .with_context(|| format!("writing {}", output.display()))?;
        }
        info!(
            output = %output.display(),
            tables = enhanced.report.tables.len(),
            edits = enhanced.report.planned_edits,
            changed,
            dry_run,
            "report processed"
        );
        Ok(FileOutcome {
            changed,
            tables: enhanced.report.tables.len(),
        })
    }
}

fn parse_selector(text: &str) -> Result<Selector> {
    Selector::parse(text).map_err(|err| anyhow!("invalid selector `{}`: {:?}", text, err))
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .context("writing enhanced page to temp file")?;
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Turn CLI inputs (paths or glob patterns) into a sorted, deduplicated
/// file list. A pattern matching nothing is an error rather than a silent
/// no-op run.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let direct = Path::new(pattern);
        if direct.is_file() {
            files.push(direct.to_path_buf());
            continue;
        }
        let mut matched = false;
        let entries =
            glob::glob(pattern).with_context(|| format!("bad input pattern `{}`", pattern))?;
        for entry in entries {
            let path = entry.with_context(|| format!("reading glob match for `{}`", pattern))?;
            if path.is_file() {
                files.push(path);
                matched = true;
            }
        }
        if !matched {
            bail!("input `{}` matched no files", pattern);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Where the enhanced page goes: into `--out` by file name, or back in place.
pub fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    match (out_dir, input.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => input.to_path_buf(),
    }
}

/// Pair each input with its output, refusing to let two inputs land on the
/// same file (same-named inputs from different directories under `--out`
/// would silently clobber each other).
pub fn resolve_outputs(
    inputs: &[PathBuf],
    out_dir: Option<&Path>,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut seen: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut pairs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let output = output_path(input, out_dir);
        if let Some(earlier) = seen.insert(output.clone(), input.clone()) {
            bail!(
                "inputs `{}` and `{}` would both write `{}`",
                earlier.display(),
                input.display(),
                output.display()
            );
        }
        pairs.push((input.clone(), output));
    }
    Ok(pairs)
}
