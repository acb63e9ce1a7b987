//! CLI binary for pdf2xlsx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, opens the run log, and turns the outcome into an exit
//! code.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2xlsx::{
    program_dir, ConversionConfig, ConversionError, ConversionJobRunner,
    ConversionProgressCallback, ConversionRequest, FailurePolicy, OutputNaming, ProgressCallback,
    RunLog, RunOutcome, Stage, DEFAULT_ENDPOINT,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::filter::LevelFilter;
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

/// Terminal progress display: a spinner naming the current stage, with one
/// line printed per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Wall-clock start of the stage in flight.
    stage_started: Mutex<Instant>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(Stage::ALL.len() as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{pos}/{len}]  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(Instant::now()),
        })
    }

    fn stage_elapsed(&self) -> String {
        let started = *self.stage_started.lock().unwrap_or_else(|e| e.into_inner());
        format!("{:.1}s", started.elapsed().as_secs_f64())
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        *self.stage_started.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage) {
        self.bar.println(format!(
            "  {} {:<26} {}",
            green("✓"),
            stage.label(),
            dim(&self.stage_elapsed())
        ));
        self.bar.inc(1);
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Keep one line per stage even for long service messages.
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<26} {}  {}",
            red("✗"),
            stage.label(),
            red(&msg),
            dim(&self.stage_elapsed())
        ));
        self.bar.finish_and_clear();
    }

    fn on_conversion_complete(&self, _output_path: &Path) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Workbook lands next to the PDF as processed_Excel.xlsx
  pdf2xlsx --file statements/march.pdf

  # Choose the output directory (created if missing)
  pdf2xlsx --file march.pdf --output reports/2026

  # Keep one workbook per input: reports/march.xlsx
  pdf2xlsx --file march.pdf --output reports --output-name input

  # Scheduled runs that must never fail the caller
  pdf2xlsx --file march.pdf --exit-zero-on-failure

ENVIRONMENT VARIABLES:
  PDF_SERVICES_CLIENT_ID      Service client id (required)
  PDF_SERVICES_CLIENT_SECRET  Service client secret (required)
  PDF_SERVICES_ENDPOINT       Override the API base URL
  RUST_LOG                    Console log filter (file log is unaffected)

  A .env file in the working directory is read first if present.

EXIT CODES:
  0  converted (or any outcome with --exit-zero-on-failure)
  1  unexpected error
  2  invalid command line
  3  input PDF not found
  4  file read/write error
  5  missing credentials or invalid configuration
  6  PDF Services rejected the request or the job failed
  7  PDF Services did not answer in time

LOGS:
  Every run appends to log/log_<YYYY-MM-DD>.txt next to the program.
"#;

/// Convert a PDF into an Excel workbook with PDF Services.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2xlsx",
    version,
    about = "Convert a PDF into an Excel workbook with PDF Services",
    long_about = "Upload a PDF to PDF Services, run an OCR export job (en-US) that \
produces an XLSX workbook, and save the result to disk.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path of the PDF to convert.
    #[arg(long)]
    file: PathBuf,

    /// Directory for the workbook. Default: the PDF's directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Workbook name: fixed (processed_Excel.xlsx) or input (<pdf stem>.xlsx).
    #[arg(long, value_enum, default_value = "fixed")]
    output_name: OutputNameArg,

    /// Exit 0 even when the conversion fails (the failure is still logged).
    #[arg(long)]
    exit_zero_on_failure: bool,

    /// PDF Services base URL.
    #[arg(long, env = "PDF_SERVICES_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Seconds between job-status polls.
    #[arg(long, default_value_t = 2)]
    poll_interval: u64,

    /// Seconds to wait for the export job before giving up.
    #[arg(long, default_value_t = 600)]
    poll_timeout: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, default_value_t = 120)]
    request_timeout: u64,

    /// Log directory. Default: log/ next to the program.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log at DEBUG level and mirror logs to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// Disable the progress display.
    #[arg(long)]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OutputNameArg {
    Fixed,
    Input,
}

impl From<OutputNameArg> for OutputNaming {
    fn from(v: OutputNameArg) -> Self {
        match v {
            OutputNameArg::Fixed => OutputNaming::Fixed,
            OutputNameArg::Input => OutputNaming::FromInput,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let policy = if cli.exit_zero_on_failure {
        FailurePolicy::Silent
    } else {
        FailurePolicy::Report
    };

    match run(&cli, policy) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            match policy {
                FailurePolicy::Silent => ExitCode::SUCCESS,
                FailurePolicy::Report => ExitCode::from(1),
            }
        }
    }
}

fn run(cli: &Cli, policy: FailurePolicy) -> Result<ExitCode> {
    // Missing .env is the normal case.
    dotenvy::dotenv().ok();

    let program_dir = program_dir().context("Failed to locate the program directory")?;
    let request = ConversionRequest::resolve(&cli.file, cli.output.as_deref(), &program_dir);

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = progress_enabled(cli);
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console = if cli.verbose {
        Some(console_filter("debug"))
    } else if cli.quiet || show_progress {
        None
    } else {
        Some(console_filter("info"))
    };

    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| program_dir.join("log"));
    let log = match RunLog::open(&log_dir, level, console) {
        Ok(log) => log,
        Err(e) => {
            eprintln!(
                "{} cannot open log directory {}: {e}",
                red("!"),
                log_dir.display()
            );
            RunLog::console(console_filter("info"))
        }
    };

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let started = Instant::now();
    let outcome = match build_config(cli, policy, progress_cb) {
        Ok(config) => {
            let runner = ConversionJobRunner::new(config).with_log(log.dispatch());
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;
            rt.block_on(runner.execute(&request))
        }
        Err(e) => {
            tracing::dispatcher::with_default(&log.dispatch(), || {
                tracing::error!("{}: {}", e.category(), e);
            });
            RunOutcome::Failed(e)
        }
    };

    report(cli, &outcome, &log, started.elapsed());
    Ok(ExitCode::from(outcome.exit_code(policy)))
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    cli: &Cli,
    policy: FailurePolicy,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig, ConversionError> {
    let mut builder = ConversionConfig::builder()
        .endpoint(cli.endpoint.as_str())
        .poll_interval_ms(cli.poll_interval.saturating_mul(1000))
        .poll_timeout_secs(cli.poll_timeout)
        .request_timeout_secs(cli.request_timeout)
        .output_naming(cli.output_name.into())
        .failure_policy(policy);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build()
}

/// The spinner replaces console logs, so `--verbose` (which mirrors logs to
/// stderr) turns it off.
fn progress_enabled(cli: &Cli) -> bool {
    !cli.quiet && !cli.no_progress && !cli.verbose
}

fn console_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Summary line on stderr. Failures are shown even with `--quiet`.
fn report(cli: &Cli, outcome: &RunOutcome, log: &RunLog, elapsed: Duration) {
    match outcome {
        RunOutcome::Converted(path) => {
            if !cli.quiet {
                eprintln!(
                    "{}  {}ms  →  {}",
                    green("✔"),
                    elapsed.as_millis(),
                    bold(&path.display().to_string()),
                );
            }
        }
        RunOutcome::Failed(e) => {
            eprintln!("{} {}: {}", red("✘"), e.category(), e);
            if let Some(path) = log.path() {
                eprintln!("   {}", dim(&format!("see {}", path.display())));
            }
        }
    }
}
