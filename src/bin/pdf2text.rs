//! CLI binary for edgequake-pdf2text.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2text::{
    extract, inspect, write_atomic, CommandTableExtractor, ExtractionConfig,
    ExtractionProgressCallback, ExtractionReport, PageSeparator, PageWarning, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page. Pages may complete out of
/// order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_extraction_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn page_elapsed_ms(&self, page_num: usize) -> u128 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, content_len: usize) {
        let elapsed_ms = self.page_elapsed_ms(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{content_len:>5} chars")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_warning(&self, warning: &PageWarning) {
        let msg = warning.to_string();
        let msg = if msg.chars().count() > 100 {
            format!("{}\u{2026}", msg.chars().take(99).collect::<String>())
        } else {
            msg
        };
        self.bar.println(format!("  {} {}", yellow("⚠"), yellow(&msg)));
    }

    fn on_extraction_complete(&self, total_pages: usize, warning_count: usize) {
        self.bar.finish_and_clear();
        if warning_count == 0 {
            eprintln!(
                "{} {} pages extracted",
                green("✔"),
                bold(&total_pages.to_string())
            );
        } else {
            eprintln!(
                "{} {} pages extracted  ({} warnings)",
                cyan("⚠"),
                bold(&total_pages.to_string()),
                yellow(&warning_count.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # JSON envelope on stdout
  pdf2text paper.pdf

  # Plain text with page comments
  pdf2text --text --separator comment paper.pdf -o paper.txt

  # Tables via an external detector (receives the page PNG path last)
  pdf2text --table-command ./detect-tables --table-arg --json paper.pdf

  # Metadata only
  pdf2text --inspect-only paper.pdf

OUTPUT:
  JSON mode prints {"success": true, "content": [...], "total_pages": N,
  "metadata": {...}} or {"success": false, "error": "..."}; the exit status
  is non-zero on failure.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   pdfium library file or directory (else ./ then system)
  RUST_LOG          tracing filter, overrides -v/-q
"#;

/// Extract text, LaTeX math, tables, and images from PDF files.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2text",
    version,
    about = "Extract clean, indexable text (with LaTeX math) from PDF files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "PDF2TEXT_OUTPUT")]
    output: Option<PathBuf>,

    /// Emit plain text instead of the JSON envelope.
    #[arg(long, env = "PDF2TEXT_TEXT")]
    text: bool,

    /// Page separator for --text: none, hr, comment, or custom string.
    #[arg(long, env = "PDF2TEXT_SEPARATOR", default_value = "none")]
    separator: String,

    /// Prepend YAML front-matter with document metadata (--text only).
    #[arg(long, env = "PDF2TEXT_METADATA")]
    metadata: bool,

    /// Number of pages processed concurrently.
    #[arg(short, long, env = "PDF2TEXT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Per-document deadline in seconds (0 disables).
    #[arg(long, env = "PDF2TEXT_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2TEXT_PASSWORD")]
    password: Option<String>,

    /// Insert a space at lower→upper case boundaries ("wordWord").
    #[arg(long, env = "PDF2TEXT_SPLIT_GLUED_WORDS")]
    split_glued_words: bool,

    /// External table detector; called with the page PNG path as last argument.
    #[arg(long, env = "PDF2TEXT_TABLE_COMMAND")]
    table_command: Option<PathBuf>,

    /// Extra argument for --table-command (repeatable).
    #[arg(long = "table-arg", allow_hyphen_values = true, requires = "table_command")]
    table_args: Vec<String>,

    /// Longest raster edge handed to the table detector.
    #[arg(long, env = "PDF2TEXT_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Skip embedded images.
    #[arg(long, env = "PDF2TEXT_NO_IMAGES")]
    no_images: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2TEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2TEXT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.text {
            println!("File:         {}", cli.input.display());
            println!("Pages:        {}", info.page_count);
            for (key, value) in &info.metadata {
                println!("{:<14}{}", format!("{key}:"), value);
            }
        } else {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise metadata")?
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let result = extract(&cli.input, &config).await;
    let success = result.is_ok();

    let rendered = if cli.text {
        match result {
            Ok(ref output) => {
                if !cli.quiet && !show_progress {
                    eprintln!(
                        "Extracted {} pages in {}ms ({} warnings)",
                        output.stats.total_pages,
                        output.stats.total_duration_ms,
                        output.stats.warnings
                    );
                }
                output
                    .document
                    .to_text(&config.page_separator, config.include_metadata)
            }
            Err(e) => {
                eprintln!("{} {}", red("✘"), e);
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        if let Err(ref e) = result {
            if !cli.quiet {
                eprintln!("{} {}", red("✘"), e);
            }
        }
        let report = ExtractionReport::from(result);
        let mut json = serde_json::to_string_pretty(&report).context("Failed to serialise output")?;
        json.push('\n');
        json
    };

    match cli.output {
        Some(ref path) => {
            write_atomic(path, rendered.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet && success {
                eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .concurrency(cli.concurrency)
        .document_timeout_secs((cli.timeout > 0).then_some(cli.timeout))
        .max_rendered_pixels(cli.max_pixels)
        .extract_images(!cli.no_images)
        .split_glued_words(cli.split_glued_words)
        .page_separator(PageSeparator::parse(&cli.separator))
        .include_metadata(cli.metadata);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref program) = cli.table_command {
        let extractor = CommandTableExtractor::new(program).args(cli.table_args.iter().cloned());
        builder = builder.table_extractor(Arc::new(extractor));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
