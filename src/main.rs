use anyhow::{bail, Result};
use chrono::Utc;
use clap::Parser;
use rayon::prelude::*;
use reportlift::{
    config::Config,
    process::{expand_inputs, resolve_outputs, Enhancer},
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "reportlift",
    version,
    about = "post-processes static HTML reports: localized timestamps, sortable tables",
    long_about = "Reportlift rewrites generated HTML reports so they are pleasant to read:\n\
        the report's UTC timestamp is rendered in a local timezone, every table is\n\
        classified and wired up for the client-side table library, and table links\n\
        open in new tabs.\n\n\
        Examples:\n  \
        reportlift _site/index.html\n  \
        reportlift 'reports/*.html' --out _site\n  \
        reportlift _site/index.html --timezone +10:00 --check"
)]
struct CliArgs {
    /// Input HTML files or glob patterns.
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    #[arg(
        short = 'o',
        long = "out",
        value_name = "DIR",
        help = "Write enhanced pages into this directory instead of in place."
    )]
    out: Option<PathBuf>,

    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "YAML config file; defaults apply when omitted."
    )]
    config: Option<PathBuf>,

    #[arg(
        short = 'z',
        long = "timezone",
        value_name = "OFFSET",
        help = "Render times at this fixed offset (e.g. +10:00) instead of the machine timezone."
    )]
    timezone: Option<String>,

    #[arg(
        long = "check",
        help = "Report which files would change without writing anything; exits nonzero if any would."
    )]
    check: bool,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = CliArgs::parse();

    // ─── 2) load config, apply CLI overrides ─────────────────────────
    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(tz) = &args.timezone {
        cfg.timezone = Some(tz.clone());
    }

    // ─── 3) discover inputs, map each to its output ──────────────────
    let files = expand_inputs(&args.inputs)?;
    let pairs = resolve_outputs(&files, args.out.as_deref())?;
    info!(files = files.len(), check = args.check, "starting run");

    // ─── 4) one enhancer shared by the pool; one clock for the run ───
    let enhancer = Enhancer::new(cfg, Utc::now())?;

    // ─── 5) fan out over the files ───────────────────────────────────
    let outcomes: Vec<_> = pairs
        .par_iter()
        .map(|(input, output)| {
            enhancer
                .process_file(input, output, args.check)
                .map_err(|err| (input.clone(), err))
        })
        .collect();

    // ─── 6) summarize; per-file failures don't stop the batch ────────
    let mut changed = 0usize;
    let mut failed = 0usize;
    for outcome in &outcomes {
        match outcome {
            Ok(o) if o.changed => changed += 1,
            Ok(_) => {}
            Err((input, err)) => {
                error!(input = %input.display(), "failed: {:#}", err);
                failed += 1;
            }
        }
    }
    info!(total = files.len(), changed, failed, "run complete");

    if failed > 0 {
        bail!("{} of {} files failed", failed, files.len());
    }
    if args.check && changed > 0 {
        bail!("{} of {} files would change", changed, files.len());
    }
    Ok(())
}
