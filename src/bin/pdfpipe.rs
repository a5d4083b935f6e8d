//! CLI binary for pdfpipe.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, renders progress, and sets the exit code.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfpipe::{
    resolve_page_count, run_pipeline, Anchor, PipelineConfig, PipelineObserver, StampGeometry,
    ToolCommand, Units,
};
use std::io;
use std::path::PathBuf;
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

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: one progress bar that first tracks steps, then is
/// re-lengthed for the stamping phase once the page count is known.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Pipeline");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl PipelineObserver for CliObserver {
    fn on_run_start(&self, total_steps: usize) {
        self.bar.set_length(total_steps as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Running {total_steps} pipeline steps…"))
        ));
    }

    fn on_step_start(&self, _index: usize, _total: usize, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn on_step_complete(&self, index: usize, total: usize, label: &str, duration_ms: u64) {
        self.bar.println(format!(
            "  {} Step {:>2}/{:<2}  {:<42}  {}",
            green("✓"),
            index + 1,
            total,
            label,
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_step_failed(&self, index: usize, total: usize, label: &str, error: &str) {
        self.bar.println(format!(
            "  {} Step {:>2}/{:<2}  {}",
            red("✗"),
            index + 1,
            total,
            red(&format!("{label}: {error}")),
        ));
        self.bar.finish_and_clear();
    }

    fn on_stamp_start(&self, total_pages: u32) {
        self.bar.set_prefix("Stamping");
        self.bar.set_position(0);
        self.bar.set_length(total_pages as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Stamping {total_pages} page(s)…"))
        ));
    }

    fn on_page_stamped(&self, page: u32, total_pages: u32) {
        self.bar.set_message(format!("page {page}/{total_pages}"));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full run against the default stage layout under the current directory
  pdfpipe 381034 --service-url https://platform.example.com/pdfgeneration-service

  # Explicit base directory and tool commands
  pdfpipe 381034 -d /data/letters \
      --mapping-cmd ".venv/bin/python3 mapping.py" \
      --merge-cmd "python3 merge_letterdata.py" \
      --eval-compile-cmd "./mvnw compile -q" \
      --eval-run-cmd "./mvnw exec:java -q"

  # Custom stamp placement
  pdfpipe 381034 --stamp-x 10 --stamp-y 10 --stamp-anchor bottom-left

  # Machine-readable run report
  pdfpipe 381034 --json > report.json

  # Only resolve a PDF's page count (no run, no service needed)
  pdfpipe --count-only render/output/output.pdf

STAGE LAYOUT (relative to --base-dir):
  mapping/            contract-mapping tool; writes output/output.json
  merge/              letter-data merger; reads input/, writes output/
  resolve/            script-resolution evaluator; reads input/, writes output/
  render/input/       stage file, template document, barcode image
  render/output/      the rendered and stamped output.pdf

The stage file is renamed output.json -> input.json inside each stage's
output/ directory, then copied into the next stage's input/ directory.

ENVIRONMENT VARIABLES:
  PDFPIPE_SERVICE_URL   Document-generation service base URL
  PDFPIPE_BASE_DIR      Stage layout base directory
  PDFPIPE_TEMPLATE      Template document file name
  PDFPIPE_BARCODE       Barcode image file name
"#;

/// Run the document-generation pipeline end to end.
#[derive(Parser, Debug)]
#[command(
    name = "pdfpipe",
    version,
    about = "Run the document-generation pipeline: stage tools, render, stamp",
    long_about = "Drives the data-population tools in sequence, moves the JSON stage file \
between them, uploads the template, renders the merged data to PDF, and stamps the \
barcode image onto every page. The first failure aborts the run and names the step.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Contract number fed to the contract-mapping tool.
    #[arg(required_unless_present = "count_only")]
    contract: Option<String>,

    /// Base directory the stage layout is resolved against.
    #[arg(short = 'd', long, env = "PDFPIPE_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Document-generation service base URL.
    #[arg(long, env = "PDFPIPE_SERVICE_URL")]
    service_url: Option<String>,

    /// Contract-mapping tool command (program + args, whitespace-split).
    #[arg(long, env = "PDFPIPE_MAPPING_CMD", default_value = "python3 mapping.py")]
    mapping_cmd: String,

    /// Letter-data merger command.
    #[arg(long, env = "PDFPIPE_MERGE_CMD", default_value = "python3 merge_letterdata.py")]
    merge_cmd: String,

    /// Evaluator compile command; omit to skip the compile step.
    #[arg(long, env = "PDFPIPE_EVAL_COMPILE_CMD")]
    eval_compile_cmd: Option<String>,

    /// Evaluator run command.
    #[arg(long, env = "PDFPIPE_EVAL_RUN_CMD", default_value = "./run-evaluator.sh")]
    eval_run_cmd: String,

    /// Template document file name in render/input/.
    #[arg(long, env = "PDFPIPE_TEMPLATE", default_value = "letter-template.docx")]
    template: String,

    /// Barcode image file name in render/input/.
    #[arg(long, env = "PDFPIPE_BARCODE", default_value = "barcode.jpg")]
    barcode: String,

    /// Stamp X position.
    #[arg(long, default_value_t = 204.0)]
    stamp_x: f64,

    /// Stamp Y position.
    #[arg(long, default_value_t = 220.8)]
    stamp_y: f64,

    /// Stamp width.
    #[arg(long, default_value_t = 6.4)]
    stamp_width: f64,

    /// Stamp height.
    #[arg(long, default_value_t = 45.2)]
    stamp_height: f64,

    /// Stamp units: mm, pt, px.
    #[arg(long, value_enum, default_value = "mm")]
    stamp_units: UnitsArg,

    /// Stamp anchor corner.
    #[arg(long, value_enum, default_value = "top-left")]
    stamp_anchor: AnchorArg,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "PDFPIPE_HTTP_TIMEOUT", default_value_t = 300)]
    http_timeout: u64,

    /// Output the run report as JSON instead of summary lines.
    #[arg(long, env = "PDFPIPE_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDFPIPE_NO_PROGRESS")]
    no_progress: bool,

    /// Resolve a PDF's page count and exit; no pipeline run.
    #[arg(long, value_name = "PDF")]
    count_only: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFPIPE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFPIPE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum UnitsArg {
    Mm,
    Pt,
    Px,
}

impl From<UnitsArg> for Units {
    fn from(v: UnitsArg) -> Self {
        match v {
            UnitsArg::Mm => Units::Mm,
            UnitsArg::Pt => Units::Pt,
            UnitsArg::Px => Units::Px,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum AnchorArg {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl From<AnchorArg> for Anchor {
    fn from(v: AnchorArg) -> Self {
        match v {
            AnchorArg::TopLeft => Anchor::TopLeft,
            AnchorArg::TopRight => Anchor::TopRight,
            AnchorArg::BottomLeft => Anchor::BottomLeft,
            AnchorArg::BottomRight => Anchor::BottomRight,
            AnchorArg::Center => Anchor::Center,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides the feedback that matters.
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

    // ── Count-only mode ──────────────────────────────────────────────────
    if let Some(ref pdf) = cli.count_only {
        match resolve_page_count(pdf).await {
            Some(n) => {
                println!("{n}");
                return Ok(());
            }
            None => bail!("Could not determine page count of '{}'", pdf.display()),
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli, show_progress)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run_pipeline(&config).await.context("Pipeline run failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise run report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} steps, {} page(s) stamped  {}ms",
            green("✔"),
            report.steps.len(),
            report.stamped_pages,
            report.total_duration_ms,
        );
        eprintln!("   stage file  {}", bold(&report.stage_file.display().to_string()));
        eprintln!("   document    {}", bold(&report.output_pdf.display().to_string()));
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, show_progress: bool) -> Result<PipelineConfig> {
    let contract = cli
        .contract
        .as_deref()
        .expect("clap requires the contract unless --count-only");
    let service_url = cli
        .service_url
        .as_deref()
        .context("--service-url (or PDFPIPE_SERVICE_URL) is required for a pipeline run")?;

    let geometry = StampGeometry {
        x: cli.stamp_x,
        y: cli.stamp_y,
        width: cli.stamp_width,
        height: cli.stamp_height,
        units: cli.stamp_units.clone().into(),
        anchor: cli.stamp_anchor.clone().into(),
    };

    let mut builder = PipelineConfig::builder()
        .base_dir(cli.base_dir.clone())
        .contract_number(contract)
        .service_url(service_url)
        .mapping_tool(parse_command(&cli.mapping_cmd).context("Invalid --mapping-cmd")?)
        .merge_tool(parse_command(&cli.merge_cmd).context("Invalid --merge-cmd")?)
        .eval_run_tool(parse_command(&cli.eval_run_cmd).context("Invalid --eval-run-cmd")?)
        .template_name(cli.template.clone())
        .barcode_name(cli.barcode.clone())
        .stamp(geometry)
        .http_timeout_secs(cli.http_timeout);

    if let Some(ref cmd) = cli.eval_compile_cmd {
        builder = builder.eval_compile_tool(parse_command(cmd).context("Invalid --eval-compile-cmd")?);
    }
    if show_progress {
        builder = builder.observer(CliObserver::new());
    }

    builder.build().context("Invalid configuration")
}

/// Split a whitespace-separated command string into a [`ToolCommand`].
///
/// Deliberately naive: tool paths with spaces are not supported; the
/// stage layout never needs them.
fn parse_command(s: &str) -> Result<ToolCommand> {
    let mut parts = s.split_whitespace();
    let program = parts.next().context("command must not be empty")?;
    let mut cmd = ToolCommand::new(program);
    for arg in parts {
        cmd = cmd.arg(arg);
    }
    Ok(cmd)
}
