//! Pipeline orchestration: one locator in, one [`PodcastOutput`] out.
//!
//! A run walks a fixed chain of seven steps, each one extractor or gateway
//! call:
//!
//! ```text
//! Start ─▶ Extracted ─▶ PlanDrafted ─▶ PlanCritiqued ─▶ PlanRefined
//!       ─▶ ScriptDrafted ─▶ ScriptCritiqued ─▶ ScriptFinal ─▶ Done
//! ```
//!
//! The first failure aborts the run and is returned as a [`PipelineError`]
//! naming the step. There is no retry, skip or partial result. Downloaded
//! files are owned by drop guards inside the extractor, so they are gone
//! before [`PodcastPipeline::run`] returns on either path, and also when the
//! run future is dropped mid-flight (client disconnect).

use crate::config::PodcastConfig;
use crate::error::{PipelineError, PipelineStage, PodcastError};
use crate::model::{
    Critique, PodcastOutput, PodcastPlan, PodcastScript, RunStats, SourceDocument, StageOutput,
    StageTiming,
};
use crate::pipeline::extract::{extractor_from_config, ContentExtractor, ExtractionRequest};
use crate::pipeline::llm::Gateway;
use crate::pipeline::locator::Locator;
use crate::progress::TOTAL_STAGES;
use crate::prompts::{self, PromptContext, PromptStage};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Extracted,
    PlanDrafted,
    PlanCritiqued,
    PlanRefined,
    ScriptDrafted,
    ScriptCritiqued,
    ScriptFinal,
    Done,
}

impl PipelineState {
    /// The state reached once the current step succeeds. `Done` is terminal.
    pub fn advance(self) -> Self {
        use PipelineState::*;
        match self {
            Start => Extracted,
            Extracted => PlanDrafted,
            PlanDrafted => PlanCritiqued,
            PlanCritiqued => PlanRefined,
            PlanRefined => ScriptDrafted,
            ScriptDrafted => ScriptCritiqued,
            ScriptCritiqued => ScriptFinal,
            ScriptFinal | Done => Done,
        }
    }

    /// The step that moves a run out of this state, if any.
    pub fn next_stage(self) -> Option<PipelineStage> {
        use PipelineState::*;
        let stage = match self {
            Start => return Some(PipelineStage::Extraction),
            Extracted => PromptStage::PlanInitial,
            PlanDrafted => PromptStage::PlanCritique,
            PlanCritiqued => PromptStage::PlanRegenerate,
            PlanRefined => PromptStage::ScriptInitial,
            ScriptDrafted => PromptStage::ScriptCritique,
            ScriptCritiqued => PromptStage::ScriptRegenerate,
            ScriptFinal | Done => return None,
        };
        Some(stage.into())
    }
}

/// Runs the extraction → plan → script chain for one paper at a time.
///
/// Holds no per-run state, so one instance (behind an `Arc`) serves any
/// number of concurrent runs.
pub struct PodcastPipeline {
    config: PodcastConfig,
    extractor: Arc<dyn ContentExtractor>,
    gateway: Gateway,
}

impl PodcastPipeline {
    /// Assemble a pipeline from explicit parts.
    pub fn new(config: PodcastConfig, extractor: Arc<dyn ContentExtractor>, gateway: Gateway) -> Self {
        Self {
            config,
            extractor,
            gateway,
        }
    }

    /// Build the extractor and the provider-backed gateway `config` asks for.
    ///
    /// # Errors
    /// [`PodcastError::ProviderNotConfigured`] when no LLM provider can be
    /// resolved; callers treat this as fatal at startup.
    pub fn from_config(config: PodcastConfig) -> Result<Self, PodcastError> {
        let provider = resolve_provider(&config)?;
        info!(
            "LLM provider resolved (model: {})",
            config.model.as_deref().unwrap_or(DEFAULT_MODEL)
        );
        let extractor = extractor_from_config(&config)?;
        let gateway =
            Gateway::from_provider(provider, Duration::from_secs(config.api_timeout_secs));
        Ok(Self::new(config, extractor, gateway))
    }

    pub fn config(&self) -> &PodcastConfig {
        &self.config
    }

    /// Turn the paper at `locator` into a refined plan and script.
    ///
    /// # Errors
    /// The first failing step, wrapped with its [`PipelineStage`]. Only an
    /// invalid locator is a client error.
    pub async fn run(&self, locator: &str) -> Result<PodcastOutput, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "podcast_run",
            run_id = %run_id,
            paper = tracing::field::Empty
        );
        self.run_tracked(locator, run_id).instrument(span).await
    }

    async fn run_tracked(&self, locator: &str, run_id: Uuid) -> Result<PodcastOutput, PipelineError> {
        let start = Instant::now();
        info!("Starting podcast run: {}", locator);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(locator, TOTAL_STAGES);
        }

        let result = self.execute(locator, run_id, start).await;
        let total_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(output) => info!(
                "Podcast run complete: {} lines, ~{:.1} min, {} in / {} out tokens, {}ms",
                output.podcast_script.content.len(),
                output.stats.estimated_minutes,
                output.stats.total_input_tokens,
                output.stats.total_output_tokens,
                total_ms
            ),
            Err(e) => warn!("Podcast run failed after {}ms: {}", total_ms, e),
        }
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_complete(result.is_ok(), total_ms);
        }
        result
    }

    async fn execute(
        &self,
        locator: &str,
        run_id: Uuid,
        start: Instant,
    ) -> Result<PodcastOutput, PipelineError> {
        let mut state = PipelineState::Start;
        let mut timings: Vec<StageTiming> = Vec::with_capacity(PromptStage::ALL.len());

        // ── Extraction ───────────────────────────────────────────────────
        self.stage_started(PipelineStage::Extraction);
        let extract_start = Instant::now();
        let source = self
            .extract(locator, run_id)
            .await
            .map_err(|e| self.stage_failed(PipelineStage::Extraction, e))?;
        let extraction_duration_ms = extract_start.elapsed().as_millis() as u64;
        self.stage_completed(PipelineStage::Extraction, extraction_duration_ms);
        state = self.transition(state);

        // ── Plan ─────────────────────────────────────────────────────────
        let draft_plan: PodcastPlan = self
            .invoke(
                PromptStage::PlanInitial,
                PromptContext::default().with_source(&source),
                &mut timings,
            )
            .await?;
        state = self.transition(state);

        let plan_critique: Critique = self
            .invoke(
                PromptStage::PlanCritique,
                PromptContext::default().with_plan(&draft_plan),
                &mut timings,
            )
            .await?;
        state = self.transition(state);

        let plan: PodcastPlan = self
            .invoke(
                PromptStage::PlanRegenerate,
                PromptContext::default()
                    .with_plan(&draft_plan)
                    .with_critique(&plan_critique),
                &mut timings,
            )
            .await?;
        if plan == draft_plan {
            warn!("Refined plan is identical to the draft; the critique had no effect");
        }
        state = self.transition(state);

        // ── Script ───────────────────────────────────────────────────────
        let draft_script: PodcastScript = self
            .invoke(
                PromptStage::ScriptInitial,
                PromptContext::default().with_plan(&plan),
                &mut timings,
            )
            .await?;
        state = self.transition(state);

        let script_critique: Critique = self
            .invoke(
                PromptStage::ScriptCritique,
                PromptContext::default().with_script(&draft_script),
                &mut timings,
            )
            .await?;
        state = self.transition(state);

        let script: PodcastScript = self
            .invoke(
                PromptStage::ScriptRegenerate,
                PromptContext::default()
                    .with_script(&draft_script)
                    .with_critique(&script_critique),
                &mut timings,
            )
            .await?;
        state = self.transition(state);
        let state = self.transition(state);
        debug_assert_eq!(state, PipelineState::Done);

        // ── Stats ────────────────────────────────────────────────────────
        let script_words = script.word_count();
        let estimated_minutes = self.config.estimate_minutes(script_words);
        if !self.config.within_target(estimated_minutes) {
            let (lo, hi) = self.config.target_minutes;
            warn!(
                "Final script runs ~{:.1} min ({} words), outside the {}-{} minute target",
                estimated_minutes, script_words, lo, hi
            );
        }

        let stats = RunStats {
            run_id,
            paper_id: source.paper_id.clone(),
            extraction_duration_ms,
            total_input_tokens: timings.iter().map(|t| t.input_tokens as u64).sum(),
            total_output_tokens: timings.iter().map(|t| t.output_tokens as u64).sum(),
            stages: timings,
            total_duration_ms: start.elapsed().as_millis() as u64,
            script_words,
            estimated_minutes,
        };

        Ok(PodcastOutput {
            podcast_plan: plan,
            podcast_script: script,
            critique: script_critique,
            stats,
        })
    }

    async fn extract(&self, locator: &str, run_id: Uuid) -> Result<SourceDocument, PodcastError> {
        let locator = Locator::parse(locator)?;
        Span::current().record("paper", locator.paper_id());
        let source = self
            .extractor
            .extract(&ExtractionRequest { locator, run_id })
            .await?;
        if source.content.trim().is_empty() {
            return Err(PodcastError::ExtractionFailed {
                url: source.locator,
                reason: "extracted content is empty".into(),
            });
        }
        Ok(source)
    }

    /// Build the prompt for `stage`, call the model, record usage.
    async fn invoke<T: StageOutput>(
        &self,
        stage: PromptStage,
        context: PromptContext<'_>,
        timings: &mut Vec<StageTiming>,
    ) -> Result<T, PipelineError> {
        self.stage_started(stage.into());

        let prompt = prompts::build(stage, &context).map_err(|e| self.stage_failed(stage.into(), e))?;
        let sampling = self.config.sampling.for_stage(stage);
        let completion = self
            .gateway
            .complete::<T>(&prompt, &sampling)
            .await
            .map_err(|e| self.stage_failed(stage.into(), e))?;

        self.stage_completed(stage.into(), completion.duration_ms);
        timings.push(StageTiming {
            stage,
            duration_ms: completion.duration_ms,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
        });
        Ok(completion.value)
    }

    fn transition(&self, state: PipelineState) -> PipelineState {
        let next = state.advance();
        debug!("{:?} → {:?}", state, next);
        next
    }

    fn stage_started(&self, stage: PipelineStage) {
        debug!("Stage {} started", stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(stage);
        }
    }

    fn stage_completed(&self, stage: PipelineStage, duration_ms: u64) {
        info!("Stage {} done in {}ms", stage, duration_ms);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_complete(stage, duration_ms);
        }
    }

    fn stage_failed(&self, stage: PipelineStage, cause: PodcastError) -> PipelineError {
        warn!("Stage {} failed: {}", stage, cause);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_error(stage, &cause.to_string());
        }
        PipelineError::new(stage, cause)
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PodcastError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PodcastError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`,
///    honoured even when several API keys are present.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &PodcastConfig) -> Result<Arc<dyn LLMProvider>, PodcastError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PodcastError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
