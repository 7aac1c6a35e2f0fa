//! # paper2podcast
//!
//! Turn an arXiv paper into a refined podcast plan and a two-host script.
//!
//! ## Pipeline Overview
//!
//! ```text
//! arXiv URL
//!  │
//!  ├─ 1. Locate    validate the URL, pull out the paper ID
//!  ├─ 2. Extract   first pages of the PDF (pdfium) or the abstract page
//!  ├─ 3. Plan      draft ─▶ critique ─▶ regenerate
//!  ├─ 4. Script    draft ─▶ critique ─▶ regenerate
//!  └─ 5. Output    final plan, final script, the critique behind it + stats
//! ```
//!
//! Each of the six generation steps is one chat completion whose reply is
//! decoded strictly into a typed value ([`PodcastPlan`], [`Critique`],
//! [`PodcastScript`]). The first failure aborts the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2podcast::{PodcastConfig, PodcastPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let pipeline = PodcastPipeline::from_config(PodcastConfig::default())?;
//!     let output = pipeline.run("https://arxiv.org/abs/1706.03762").await?;
//!     for line in &output.podcast_script.content {
//!         println!("{}: {}", line.speaker, line.text);
//!     }
//!     eprintln!("~{:.1} minutes", output.stats.estimated_minutes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2podcast` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! paper2podcast = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod podcast;
pub mod progress;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionMode, PodcastConfig, PodcastConfigBuilder, SamplingConfig, StageSampling};
pub use error::{ErrorKind, PipelineError, PipelineStage, PodcastError};
pub use model::{
    Critique, PodcastOutput, PodcastPlan, PodcastScript, RunStats, ScriptLine, SourceDocument,
    SourceKind, StageOutput, StageTiming,
};
pub use pipeline::extract::{ContentExtractor, ExtractionRequest};
pub use pipeline::llm::{ChatBackend, ChatReply, Gateway};
pub use podcast::{PipelineState, PodcastPipeline};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use prompts::{Prompt, PromptContext, PromptStage};
pub use server::{create_router, AppState};
