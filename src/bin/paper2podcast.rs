//! CLI binary for paper2podcast.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service,
//! `create` runs one paper through the pipeline and prints the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use paper2podcast::progress::TOTAL_STAGES;
use paper2podcast::{
    create_router, AppState, ExtractionMode, PipelineProgressCallback, PipelineStage,
    PodcastConfig, PodcastPipeline, ProgressCallback,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the seven pipeline stages plus a
/// log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(TOTAL_STAGES as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:32.green/238}] {pos}/{len} stages  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Podcast");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, locator: &str, _total_stages: usize) {
        self.bar.println(format!("{} {}", green("◆"), bold(locator)));
    }

    fn on_stage_start(&self, stage: PipelineStage) {
        self.bar.set_message(stage.to_string());
    }

    fn on_stage_complete(&self, stage: PipelineStage, duration_ms: u64) {
        self.bar.println(format!(
            "  {} {:<18} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_stage_error(&self, stage: PipelineStage, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<18} {}", red("✗"), stage.to_string(), red(&msg)));
    }

    fn on_run_complete(&self, success: bool, total_duration_ms: u64) {
        self.bar.finish_and_clear();
        let secs = total_duration_ms as f64 / 1000.0;
        if success {
            eprintln!("{} podcast ready in {:.1}s", green("✔"), secs);
        } else {
            eprintln!(
                "{} run aborted after {:.1}s ({} failed stage)",
                red("✘"),
                secs,
                self.errors.load(Ordering::SeqCst)
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service
  paper2podcast serve --addr 0.0.0.0:8000

  # One paper to stdout
  paper2podcast create https://arxiv.org/abs/1706.03762

  # Abstract only, written to a file
  paper2podcast --extraction abstract create https://arxiv.org/abs/1706.03762 -o podcast.json

  # Use a specific model
  paper2podcast --provider anthropic --model claude-sonnet-4-20250514 create https://arxiv.org/pdf/2301.00001

HTTP API:
  POST /create-podcast   {"url": "https://arxiv.org/abs/2301.00001"}
                         → {"podcast_plan": …, "podcast_script": …, "critique": …}
  GET  /health           → OK

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID (default: gpt-4o)
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  RUST_LOG                Log filter, overrides --verbose/--quiet

  Variables are also read from a .env file in the working directory.
"#;

/// Turn arXiv papers into critiqued two-host podcast scripts.
#[derive(Parser, Debug)]
#[command(
    name = "paper2podcast",
    version,
    about = "Turn arXiv papers into critiqued two-host podcast scripts",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID (e.g. gpt-4o, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Where the paper text comes from.
    #[arg(long, global = true, env = "PAPER2PODCAST_EXTRACTION", value_enum, default_value = "full-text")]
    extraction: ExtractionArg,

    /// PDF pages read in full-text mode.
    #[arg(long, global = true, env = "PAPER2PODCAST_MAX_PAGES", default_value_t = 5)]
    max_pages: usize,

    /// Directory for transient PDF downloads.
    #[arg(long, global = true, env = "PAPER2PODCAST_DOWNLOAD_DIR", default_value = "arxiv_papers")]
    download_dir: PathBuf,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "PAPER2PODCAST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-LLM-call timeout in seconds.
    #[arg(long, global = true, env = "PAPER2PODCAST_API_TIMEOUT", default_value_t = 180)]
    api_timeout: u64,

    /// Largest PDF accepted, in MiB.
    #[arg(long, global = true, env = "PAPER2PODCAST_MAX_DOWNLOAD_MB", default_value_t = 50)]
    max_download_mb: u64,

    /// Override the temperature of every stage (0.0–2.0).
    #[arg(long, global = true, env = "PAPER2PODCAST_TEMPERATURE")]
    temperature: Option<f32>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAPER2PODCAST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAPER2PODCAST_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "PAPER2PODCAST_ADDR", default_value = "0.0.0.0:8000")]
        addr: SocketAddr,
    },
    /// Generate one podcast and print it as JSON.
    Create {
        /// arXiv abstract or PDF URL.
        url: String,

        /// Write JSON to this file instead of stdout.
        #[arg(short, long, env = "PAPER2PODCAST_OUTPUT")]
        output: Option<PathBuf>,

        /// Include run statistics in the JSON.
        #[arg(long)]
        stats: bool,

        /// Disable progress bar.
        #[arg(long, env = "PAPER2PODCAST_NO_PROGRESS")]
        no_progress: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ExtractionArg {
    FullText,
    Abstract,
}

impl From<ExtractionArg> for ExtractionMode {
    fn from(v: ExtractionArg) -> Self {
        match v {
            ExtractionArg::FullText => ExtractionMode::FullText,
            ExtractionArg::Abstract => ExtractionMode::Abstract,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` must be loaded before clap reads `env = ...` fallbacks.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs in `create`; `serve` always logs.
    let show_progress = matches!(
        cli.command,
        Command::Create { no_progress: false, .. }
    ) && !cli.quiet;
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

    // ── Ensure PDFium engine is available ────────────────────────────────
    if matches!(cli.extraction, ExtractionArg::FullText) {
        ensure_pdfium(cli.quiet)?;
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;
    let pipeline = PodcastPipeline::from_config(config)
        .context("No usable LLM provider; set OPENAI_API_KEY or EDGEQUAKE_LLM_PROVIDER")?;

    match cli.command {
        Command::Serve { addr } => serve(pipeline, addr).await,
        Command::Create {
            ref url,
            ref output,
            stats,
            ..
        } => create(&pipeline, url, output.as_ref(), stats, cli.quiet).await,
    }
}

async fn serve(pipeline: PodcastPipeline, addr: SocketAddr) -> Result<()> {
    let app = create_router(AppState::new(pipeline));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

async fn create(
    pipeline: &PodcastPipeline,
    url: &str,
    output_path: Option<&PathBuf>,
    with_stats: bool,
    quiet: bool,
) -> Result<()> {
    let output = pipeline.run(url).await.context("Podcast generation failed")?;

    let mut value = serde_json::to_value(&output).context("Failed to serialise output")?;
    if with_stats {
        value["stats"] = serde_json::to_value(&output.stats).context("Failed to serialise stats")?;
    }
    let json = serde_json::to_string_pretty(&value).context("Failed to serialise output")?;

    match output_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            // Atomic write: write to temp, then rename
            let tmp_path = path.with_extension("json.tmp");
            tokio::fs::write(&tmp_path, json.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
            tokio::fs::rename(&tmp_path, path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !quiet {
                eprintln!(
                    "{}  {} lines  ~{:.1} min  →  {}",
                    green("✔"),
                    output.podcast_script.content.len(),
                    output.stats.estimated_minutes,
                    bold(&path.display().to_string()),
                );
            }
        }
        None => println!("{json}"),
    }

    if !quiet {
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&output.stats.total_input_tokens.to_string()),
            dim(&output.stats.total_output_tokens.to_string()),
        );
    }
    Ok(())
}

/// Download pdfium on first use, with a byte progress bar unless quiet.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

/// Map CLI args to `PodcastConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PodcastConfig> {
    let mut builder = PodcastConfig::builder()
        .extraction(cli.extraction.into())
        .max_pages(cli.max_pages)
        .download_dir(cli.download_dir.clone())
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .max_download_bytes(cli.max_download_mb.saturating_mul(1024 * 1024));

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_create_with_globals() {
        let cli = Cli::try_parse_from([
            "paper2podcast",
            "create",
            "https://arxiv.org/abs/2301.00001",
            "--extraction",
            "abstract",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert!(matches!(cli.extraction, ExtractionArg::Abstract));
        match cli.command {
            Command::Create { url, output, .. } => {
                assert_eq!(url, "https://arxiv.org/abs/2301.00001");
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn build_config_maps_flags() {
        let cli = Cli::try_parse_from([
            "paper2podcast",
            "--max-pages",
            "3",
            "--max-download-mb",
            "2",
            "serve",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.max_download_bytes, 2 * 1024 * 1024);
    }
}
