//! at - actiontrace CLI
//!
//! Record browser interactions from a page + event script and inspect the
//! saved traces.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use actiontrace::prelude::*;
use actiontrace::recorder::panel;

#[derive(Parser)]
#[command(name = "at")]
#[command(about = "actiontrace - record page interactions as replayable action traces")]
#[command(version)]
struct Cli {
    /// Trace directory (default ~/.actiontrace)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a page by playing an event script, then save the trace
    Capture {
        /// Page description (JSON)
        page: PathBuf,
        /// Event script (JSON)
        script: PathBuf,
        /// Recorder config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Credit clicks to the raw target instead of its clickable ancestor
        #[arg(long)]
        raw_target: bool,
        /// Do not record a keypress action for Enter
        #[arg(long)]
        no_enter_keypress: bool,
        #[arg(long, default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
    },
    /// Show a saved trace
    Show {
        file: String,
        /// Print every action
        #[arg(long)]
        all: bool,
    },
    /// List saved traces
    List,
    /// Delete a saved trace
    Delete {
        file: String,
    },
    /// Print the generated selector for every element of a page
    Selectors {
        page: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct SelectorRow {
    tag: String,
    selector: String,
    strategy: SelectorStrategy,
    unique: bool,
}

fn main() -> Result<()> {
    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Capture {
            page,
            script,
            config,
            raw_target,
            no_enter_keypress,
            user_agent,
        } => {
            let mut config = match config {
                Some(path) => RecorderConfig::load(path)?,
                None => RecorderConfig::default(),
            };
            if raw_target {
                config.click_target = ClickTarget::Raw;
            }
            if no_enter_keypress {
                config.enter_keypress = false;
            }
            capture(&storage(cli.dir.as_deref())?, &page, &script, config, &user_agent)?;
        }
        Commands::Show { file, all } => {
            show(&storage(cli.dir.as_deref())?, &file, all)?;
        }
        Commands::List => {
            list(&storage(cli.dir.as_deref())?)?;
        }
        Commands::Delete { file } => {
            let storage = storage(cli.dir.as_deref())?;
            storage.delete(&file)?;
            println!("Deleted: {}", file);
        }
        Commands::Selectors { page, json } => {
            selectors(&page, json)?;
        }
    }

    Ok(())
}

fn storage(dir: Option<&Path>) -> Result<TraceStorage> {
    match dir {
        Some(d) => TraceStorage::with_dir(d),
        None => TraceStorage::new(),
    }
}

fn load_page(path: &Path) -> Result<Page> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading page {}", path.display()))?;
    Ok(Page::from_json(&json)?)
}

fn capture(
    storage: &TraceStorage,
    page: &Path,
    script: &Path,
    config: RecorderConfig,
    user_agent: &str,
) -> Result<()> {
    let page = load_page(page)?;
    let script_json = std::fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let script = Script::from_json(&script_json)?;

    println!("Recording {} ({} steps)", page.url, script.steps.len());
    let run = run_script(page, &script, config)?;

    if run.panel.len() != run.actions.len() {
        tracing::warn!(
            panel = run.panel.len(),
            recorder = run.actions.len(),
            "display lost messages, exporting the recorder's list"
        );
    }

    let mut mirror = run.panel;
    mirror.sync(run.actions);
    let Some(trace) = mirror.export(user_agent) else {
        println!("No actions recorded.");
        return Ok(());
    };

    let path = storage.save(&trace)?;
    println!("{} actions recorded", trace.actions.len());
    println!("Saved: {}", path.display());
    Ok(())
}

fn show(storage: &TraceStorage, file: &str, all: bool) -> Result<()> {
    let trace = storage.load(file)?;

    println!("Recorded at: {}", trace.metadata.recorded_at.to_rfc3339());
    println!("Agent: {}", trace.metadata.user_agent);
    println!("Actions: {}", trace.actions.len());

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for a in &trace.actions {
        *counts.entry(a.kind().name()).or_default() += 1;
    }
    let duration = trace.actions.iter().map(|a| a.timestamp).max().unwrap_or(0);

    println!("\nSummary:");
    for (kind, n) in &counts {
        println!("  {}: {}", kind, n);
    }
    println!("  Duration: {}", panel::format_time(duration));

    if all {
        println!("\nActions:");
        for (i, a) in trace.actions.iter().enumerate() {
            println!("{:>3}: {}", i, panel::render_line(a));
        }
    }

    Ok(())
}

fn list(storage: &TraceStorage) -> Result<()> {
    let files = storage.list()?;

    if files.is_empty() {
        println!("No traces saved in {}.", storage.path().display());
    } else {
        for f in files {
            println!("{}", f);
        }
    }

    Ok(())
}

fn selectors(page: &Path, json: bool) -> Result<()> {
    let page = load_page(page)?;
    let doc = &page.document;

    let mut rows = Vec::new();
    for node in doc.descendants().filter(|n| *n != doc.body()) {
        let Some((selector, strategy)) = generate_with_strategy(doc, node) else {
            continue;
        };
        let unique = Locator::parse(&selector)
            .and_then(|l| l.find(doc))
            .map(|found| found == node)
            .unwrap_or(false);
        let tag = doc.get(node).map(|e| e.tag().to_string()).unwrap_or_default();
        rows.push(SelectorRow {
            tag,
            selector,
            strategy,
            unique,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        println!(
            "{:<10} {:<11} {} {}",
            row.tag,
            row.strategy.name(),
            if row.unique { "unique   " } else { "AMBIGUOUS" },
            row.selector
        );
    }
    let ambiguous = rows.iter().filter(|r| !r.unique).count();
    if ambiguous > 0 {
        println!("\n{} of {} selectors do not resolve uniquely", ambiguous, rows.len());
    }

    Ok(())
}
