//! CLI binary for edgequake-pdfocr.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfocr::{
    convert, convert_images, inspect, run_blocking, CleanupOutcome, PageStatus, PipelineConfig,
    PipelineProgressCallback, ProgressCallback, RunReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar reused for both stages, with a log
/// line per page printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Switch to the counting style for a stage of `total` items.
    fn start_stage(&self, prefix: &'static str, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(prefix);
        self.bar.reset_eta();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_rasterize_start(&self, total_pages: usize) {
        self.start_stage("Rendering", total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_rasterized(&self, index: usize, path: &Path) {
        self.bar.println(format!(
            "  {} Page {:>3} saved as {}",
            green("✓"),
            index,
            dim(&path.display().to_string())
        ));
        self.bar.inc(1);
    }

    fn on_recognition_start(&self, total_images: usize) {
        self.start_stage("Recognising", total_images);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Recognising {total_images} images…"))
        ));
    }

    fn on_page_recognized(&self, index: usize, total: usize, elapsed: Duration, chars: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{chars:>5} chars")),
            dim(&format!("took {:.2}s", elapsed.as_secs_f64())),
        ));
        self.bar.inc(1);
    }

    fn on_page_failed(&self, index: usize, total: usize, path: &Path, error: &str) {
        // Only the first line; errors may carry a hint underneath.
        let first = error.lines().next().unwrap_or(error);
        let msg = if first.chars().count() > 80 {
            let cut: String = first.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            first.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            dim(&path.display().to_string()),
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_recognition_complete(&self, recognized: usize, failed: usize, total_ocr: Duration) {
        self.bar.finish_and_clear();
        let total = recognized + failed;

        if failed == 0 {
            eprintln!(
                "{} {} images recognised",
                green("✔"),
                bold(&recognized.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images recognised  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&recognized.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
        eprintln!(
            "   Total processing time: {}",
            dim(&format!("{:.2} seconds", total_ocr.as_secs_f64()))
        );
    }

    fn on_cleanup(&self, path: &Path, outcome: CleanupOutcome) {
        let line = match outcome {
            CleanupOutcome::Cleared => {
                format!("All contents of the folder '{}' have been deleted", path.display())
            }
            CleanupOutcome::Absent => format!("The folder '{}' does not exist", path.display()),
        };
        eprintln!("   {}", dim(&line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default paths: test.pdf → images/ → output.pdf
  mkdir -p images && pdfocr

  # Explicit paths and language
  pdfocr --input scan.pdf --images work/ --output scan-text.pdf --lang deu

  # Keep a blank page wherever OCR failed
  pdfocr --input scan.pdf --placeholder-pages

  # Embed a TrueType font for non-Latin text
  pdfocr --input scan.pdf --lang rus --font /usr/share/fonts/DejaVuSans.ttf

  # OCR images already in the working directory (page_0.png, page_1.png, …)
  pdfocr --from-images --images work/ --output out.pdf

  # Inspect PDF metadata only
  pdfocr --inspect-only --input scan.pdf

  # Machine-readable run report
  pdfocr --input scan.pdf --json > report.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Override the log filter (e.g. edgequake_pdfocr=debug)

REQUIREMENTS:
  The working directory must exist before the run; it is emptied afterwards.
  `tesseract` must be on PATH (or given with --tesseract) with the language
  data for --lang installed.
"#;

/// Make scanned PDFs searchable: rasterise, OCR with Tesseract, rebuild as text.
#[derive(Parser, Debug)]
#[command(
    name = "pdfocr",
    version,
    about = "Rasterise a scanned PDF, OCR each page with Tesseract and write a text PDF",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source PDF.
    #[arg(short, long, env = "PDFOCR_INPUT", default_value = "test.pdf")]
    input: PathBuf,

    /// Working directory for page images. Must exist; emptied after the run.
    #[arg(long, env = "PDFOCR_IMAGES", default_value = "images")]
    images: PathBuf,

    /// Output PDF path.
    #[arg(short, long, env = "PDFOCR_OUTPUT", default_value = "output.pdf")]
    output: PathBuf,

    /// Tesseract language code (eng, deu, eng+fra, …).
    #[arg(short, long, env = "PDFOCR_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract executable.
    #[arg(long, env = "PDFOCR_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// TrueType font to embed in the output (default: built-in Helvetica).
    #[arg(long, env = "PDFOCR_FONT")]
    font: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFOCR_PASSWORD")]
    password: Option<String>,

    /// Insert a blank page for every image that failed recognition.
    #[arg(long, env = "PDFOCR_PLACEHOLDER_PAGES")]
    placeholder_pages: bool,

    /// Seconds to wait for each page to rasterise.
    #[arg(long, env = "PDFOCR_RENDER_TIMEOUT", default_value_t = 120)]
    render_timeout: u64,

    /// Seconds to wait for each OCR call.
    #[arg(long, env = "PDFOCR_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Skip rasterisation and OCR the page images already in --images.
    #[arg(long, conflicts_with = "inspect_only")]
    from_images: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print the run report (or metadata) as JSON on stdout.
    #[arg(long, env = "PDFOCR_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFOCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFOCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFOCR_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // A pdfium worker stranded by a render timeout is not joined on exit.
    run_blocking(run(cli)).context("Failed to start the async runtime")?
}

async fn run(cli: Cli) -> Result<()> {

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO lines unless -v is given.
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", info.page_count);
            println!("PDF Version:  {}", info.pdf_version);
            if let Some(ref p) = info.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = if cli.from_images {
        convert_images(&config)
            .await
            .context("Recognition failed")?
    } else {
        convert(&config).await.context("Conversion failed")?
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .pdf_path(&cli.input)
        .image_folder(&cli.images)
        .output_pdf_path(&cli.output)
        .language(&cli.lang)
        .ocr_engine_path(&cli.tesseract)
        .placeholder_pages(cli.placeholder_pages)
        .render_timeout_secs(cli.render_timeout)
        .ocr_timeout_secs(cli.ocr_timeout);

    if let Some(ref font) = cli.font {
        builder = builder.font_path(font);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &RunReport, show_progress: bool) {
    let stats = &report.stats;

    // Without the bar nobody has printed the per-page failures yet.
    if !show_progress {
        for page in report.failures() {
            if let Some(err) = page.error() {
                eprintln!("  {} {}", red("✗"), err);
            }
        }
    }

    eprintln!(
        "{}  {}/{} pages  {}ms  →  {}",
        if stats.failed_pages == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.recognized_pages,
        stats.total_images,
        stats.total_duration_ms,
        bold(&report.output_path.display().to_string()),
    );
    eprintln!(
        "   {} output pages  /  {}ms OCR",
        dim(&stats.output_pages.to_string()),
        dim(&stats.total_ocr_ms.to_string()),
    );

    let replaced: usize = report
        .pages
        .iter()
        .map(|p| match p.status {
            PageStatus::Recognized { replaced_chars, .. } => replaced_chars,
            PageStatus::Failed { .. } => 0,
        })
        .sum();
    if replaced > 0 {
        eprintln!(
            "   {} {} character(s) outside the output font were written as '?'; use --font",
            cyan("⚠"),
            replaced
        );
    }
}
