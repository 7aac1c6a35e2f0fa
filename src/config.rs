//! Configuration for a podcast pipeline.
//!
//! All pipeline behaviour is controlled through [`PodcastConfig`], built via
//! its [`PodcastConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across request handlers and to log exactly what
//! a run was configured with.

use crate::error::PodcastError;
use crate::progress::ProgressCallback;
use crate::prompts::PromptStage;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a podcast pipeline.
///
/// Built via [`PodcastConfig::builder()`] or using
/// [`PodcastConfig::default()`].
///
/// # Example
/// ```rust
/// use paper2podcast::{ExtractionMode, PodcastConfig};
///
/// let config = PodcastConfig::builder()
///     .extraction(ExtractionMode::Abstract)
///     .model("gpt-4o")
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PodcastConfig {
    /// Where the paper text comes from. Default: [`ExtractionMode::FullText`].
    pub extraction: ExtractionMode,

    /// Maximum number of PDF pages read in full-text mode. Default: 5.
    ///
    /// The first pages of a paper carry the abstract, introduction and the
    /// core method; later pages add little to a 10-minute episode but a lot
    /// of prompt tokens.
    pub max_pages: usize,

    /// Directory for transient PDF downloads. Created if absent.
    /// Default: `arxiv_papers`.
    pub download_dir: PathBuf,

    /// Base URL for PDF downloads; the paper ID is appended.
    /// Default: `https://arxiv.org/pdf`.
    pub pdf_base_url: String,

    /// Base URL for abstract pages; the paper ID is appended.
    /// Default: `https://arxiv.org/abs`.
    pub abs_base_url: String,

    /// Download timeout for the paper source in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Largest PDF accepted, in bytes. Default: 50 MiB.
    pub max_download_bytes: u64,

    /// LLM model identifier, e.g. "gpt-4o". If None, uses "gpt-4o".
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the
    /// environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Per-LLM-call timeout in seconds. Default: 180.
    ///
    /// Script stages generate up to 3000 tokens; slow providers need
    /// well over a minute for that.
    pub api_timeout_secs: u64,

    /// Temperature and token budget per stage.
    pub sampling: StageSampling,

    /// Target running time in minutes, inclusive. Default: 10–15.
    ///
    /// Advisory: the prompts ask for it and the pipeline logs a warning when
    /// the final script's estimated duration falls outside, but a script is
    /// never rejected for its length.
    pub target_minutes: (f32, f32),

    /// Speaking rate used to estimate duration. Default: 150 words/minute.
    pub words_per_minute: u32,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionMode::default(),
            max_pages: 5,
            download_dir: PathBuf::from("arxiv_papers"),
            pdf_base_url: "https://arxiv.org/pdf".to_string(),
            abs_base_url: "https://arxiv.org/abs".to_string(),
            download_timeout_secs: 120,
            max_download_bytes: 50 * 1024 * 1024,
            model: None,
            provider_name: None,
            provider: None,
            api_timeout_secs: 180,
            sampling: StageSampling::default(),
            target_minutes: (10.0, 15.0),
            words_per_minute: 150,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PodcastConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodcastConfig")
            .field("extraction", &self.extraction)
            .field("max_pages", &self.max_pages)
            .field("download_dir", &self.download_dir)
            .field("pdf_base_url", &self.pdf_base_url)
            .field("abs_base_url", &self.abs_base_url)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_download_bytes", &self.max_download_bytes)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("sampling", &self.sampling)
            .field("target_minutes", &self.target_minutes)
            .field("words_per_minute", &self.words_per_minute)
            .finish()
    }
}

impl PodcastConfig {
    /// Create a new builder for `PodcastConfig`.
    pub fn builder() -> PodcastConfigBuilder {
        PodcastConfigBuilder {
            config: Self::default(),
        }
    }

    /// Estimated spoken duration of `words` at the configured rate.
    pub fn estimate_minutes(&self, words: usize) -> f32 {
        words as f32 / self.words_per_minute.max(1) as f32
    }

    /// Whether `minutes` falls inside [`Self::target_minutes`].
    pub fn within_target(&self, minutes: f32) -> bool {
        let (lo, hi) = self.target_minutes;
        minutes >= lo && minutes <= hi
    }
}

/// Builder for [`PodcastConfig`].
#[derive(Debug)]
pub struct PodcastConfigBuilder {
    config: PodcastConfig,
}

impl PodcastConfigBuilder {
    pub fn extraction(mut self, mode: ExtractionMode) -> Self {
        self.config.extraction = mode;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.max(1);
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = dir.into();
        self
    }

    pub fn pdf_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.pdf_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn abs_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.abs_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_download_bytes(mut self, bytes: u64) -> Self {
        self.config.max_download_bytes = bytes;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Override sampling for one stage.
    pub fn sampling(mut self, stage: PromptStage, sampling: SamplingConfig) -> Self {
        self.config.sampling.set(stage, sampling);
        self
    }

    /// Override the temperature of every stage, keeping token budgets.
    pub fn temperature(mut self, t: f32) -> Self {
        for stage in PromptStage::ALL {
            let current = self.config.sampling.for_stage(stage);
            self.config
                .sampling
                .set(stage, SamplingConfig::new(t, current.max_tokens));
        }
        self
    }

    pub fn target_minutes(mut self, min: f32, max: f32) -> Self {
        self.config.target_minutes = (min, max);
        self
    }

    pub fn words_per_minute(mut self, wpm: u32) -> Self {
        self.config.words_per_minute = wpm.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PodcastConfig, PodcastError> {
        let c = &self.config;
        if c.max_pages == 0 {
            return Err(PodcastError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.download_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(PodcastError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        let (lo, hi) = c.target_minutes;
        if !(lo > 0.0 && lo <= hi) {
            return Err(PodcastError::InvalidConfig(format!(
                "target duration must satisfy 0 < min ≤ max, got {lo}–{hi}"
            )));
        }
        for stage in PromptStage::ALL {
            if c.sampling.for_stage(stage).max_tokens == 0 {
                return Err(PodcastError::InvalidConfig(format!(
                    "max_tokens for stage '{stage}' must be ≥ 1"
                )));
            }
        }
        for (name, url) in [("pdf", &c.pdf_base_url), ("abs", &c.abs_base_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(PodcastError::InvalidConfig(format!(
                    "{name} base URL must be http(s), got '{url}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where the paper text comes from.
///
/// | Mode | Cost | Content |
/// |------|------|---------|
/// | `FullText` | PDF download + text extraction | first `max_pages` pages |
/// | `Abstract` | one HTML fetch | abstract only |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Download the PDF and extract the text of its first pages. (default)
    #[default]
    FullText,
    /// Scrape the abstract from the paper's landing page.
    Abstract,
}

/// Sampling options for one LLM call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Output randomness, clamped to 0.0–2.0.
    pub temperature: f32,
    /// Ceiling on generated tokens.
    pub max_tokens: usize,
}

impl SamplingConfig {
    pub fn new(temperature: f32, max_tokens: usize) -> Self {
        Self {
            temperature: temperature.clamp(0.0, 2.0),
            max_tokens,
        }
    }
}

/// Sampling options for each of the six stages.
///
/// Defaults: plan stages 1500 tokens, script stages 3000, critiques 1000.
/// Critiques run warmer (0.7) to surface varied feedback; regenerations
/// run cooler (0.3) to stay close to what they revise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSampling {
    pub plan_initial: SamplingConfig,
    pub plan_critique: SamplingConfig,
    pub plan_regenerate: SamplingConfig,
    pub script_initial: SamplingConfig,
    pub script_critique: SamplingConfig,
    pub script_regenerate: SamplingConfig,
}

impl Default for StageSampling {
    fn default() -> Self {
        Self {
            plan_initial: SamplingConfig::new(0.3, 1500),
            plan_critique: SamplingConfig::new(0.7, 1000),
            plan_regenerate: SamplingConfig::new(0.3, 1500),
            script_initial: SamplingConfig::new(0.5, 3000),
            script_critique: SamplingConfig::new(0.7, 1000),
            script_regenerate: SamplingConfig::new(0.3, 3000),
        }
    }
}

impl StageSampling {
    pub fn for_stage(&self, stage: PromptStage) -> SamplingConfig {
        match stage {
            PromptStage::PlanInitial => self.plan_initial,
            PromptStage::PlanCritique => self.plan_critique,
            PromptStage::PlanRegenerate => self.plan_regenerate,
            PromptStage::ScriptInitial => self.script_initial,
            PromptStage::ScriptCritique => self.script_critique,
            PromptStage::ScriptRegenerate => self.script_regenerate,
        }
    }

    pub fn set(&mut self, stage: PromptStage, sampling: SamplingConfig) {
        let slot = match stage {
            PromptStage::PlanInitial => &mut self.plan_initial,
            PromptStage::PlanCritique => &mut self.plan_critique,
            PromptStage::PlanRegenerate => &mut self.plan_regenerate,
            PromptStage::ScriptInitial => &mut self.script_initial,
            PromptStage::ScriptCritique => &mut self.script_critique,
            PromptStage::ScriptRegenerate => &mut self.script_regenerate,
        };
        *slot = sampling;
    }
}
