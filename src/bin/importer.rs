//! CLI binary for edgequake-importer.
//!
//! A thin shim over the library crate: load a JSON pipeline definition,
//! read each file into a document, run the batch and print the verdicts.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_importer::{
    import_batch, BatchOutput, Document, ImportProgressCallback, PipelineDefinition,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per rejected document.
struct CliProgressCallback {
    bar: ProgressBar,
    rejected: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Importing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            rejected: AtomicUsize::new(0),
        })
    }
}

impl ImportProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.reset_eta();
    }

    fn on_document_start(&self, reference: &str) {
        self.bar.set_message(reference.to_string());
    }

    fn on_document_rejected(&self, reference: &str, reason: &str) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} {}  {}", red("✗"), reference, dim(reason)));
    }

    fn on_document_complete(&self, _reference: &str, _outputs: usize) {
        self.bar.inc(1);
    }

    fn on_document_error(&self, reference: &str, error: &str) {
        self.bar
            .println(format!("  {} {}  {}", red("✘"), reference, red(error)));
    }

    fn on_batch_complete(&self, total_documents: usize, accepted: usize, rejected: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} document(s): {} accepted, {} rejected",
            if rejected == 0 { green("✔") } else { bold("◆") },
            total_documents,
            bold(&accepted.to_string()),
            bold(&self.rejected.load(Ordering::SeqCst).to_string()),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run a pipeline over some files and print the verdicts
  importer --pipeline pipeline.json inbox/*.html

  # Structured output
  importer --pipeline pipeline.json --json mail/*.txt > results.json

PIPELINE DEFINITION:
  {
    "filter_policy": "all",              all | any
    "split_policy":  "continue",         continue | terminal (needed with a splitter)
    "fault_policy":  "reject_document",  reject_document | abort_batch
    "concurrency":   8,
    "handlers": [
      { "type": "content_type" },
      { "type": "text_between", "name": "title",
        "pairs": [{ "name": "title", "start": "<title>", "end": "</title>" }] }
    ]
  }

  Handler types: text_between, dom, constant, uuid, content_type,
                 regex_metadata, regex_content, regex_split

ENVIRONMENT VARIABLES:
  IMPORTER_PIPELINE       Path to the pipeline definition
  IMPORTER_CONCURRENCY    Override the definition's concurrency
  RUST_LOG                Override log filtering (e.g. edgequake_importer=debug)
"#;

/// Run documents through a tagging/filtering/splitting pipeline.
#[derive(Parser, Debug)]
#[command(
    name = "importer",
    version,
    about = "Run documents through a tagging/filtering/splitting pipeline",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files to import; each path becomes the document reference.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON pipeline definition.
    #[arg(short, long, env = "IMPORTER_PIPELINE")]
    pipeline: PathBuf,

    /// Documents processed at once (overrides the definition).
    #[arg(short, long, env = "IMPORTER_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Output structured JSON (BatchOutput) instead of verdict lines.
    #[arg(long, env = "IMPORTER_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMPORTER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMPORTER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMPORTER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load pipeline ────────────────────────────────────────────────────
    let definition = PipelineDefinition::from_file(&cli.pipeline)
        .with_context(|| format!("Failed to load pipeline from {:?}", cli.pipeline))?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ImportProgressCallback>)
    } else {
        None
    };

    let mut config = definition.config_builder();
    if let Some(n) = cli.concurrency {
        config = config.concurrency(n);
    }
    if let Some(cb) = progress_cb {
        config = config.progress_callback(cb);
    }
    let config = config.build().context("Invalid configuration")?;
    let pipeline = Arc::new(
        definition
            .into_pipeline(config)
            .context("Failed to build pipeline")?,
    );

    // ── Read documents ───────────────────────────────────────────────────
    let mut documents = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        documents.push(Document::new(path.display().to_string(), content));
    }

    // ── Run import ───────────────────────────────────────────────────────
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let output = import_batch(pipeline, documents, cancel)
        .await
        .context("Import failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        print_verdicts(&output);
        if !cli.quiet && !show_progress {
            eprintln!(
                "Imported {} document(s) in {}ms: {} accepted, {} rejected",
                output.stats.input_documents,
                output.stats.total_duration_ms,
                output.stats.accepted,
                output.stats.rejected
            );
        }
    }

    Ok(())
}

fn print_verdicts(output: &BatchOutput) {
    for result in &output.results {
        match result.rejection() {
            None => println!("{}  {}", green("accepted"), result.document.reference),
            Some(decision) => println!(
                "{}  {}  {}",
                red("rejected"),
                result.document.reference,
                dim(&decision.to_string())
            ),
        }
    }
}
