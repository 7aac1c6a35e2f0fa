//! Error types for the paper2podcast library.
//!
//! Two types reflect two layers of failure:
//!
//! * [`PodcastError`]: what went wrong: a bad locator, an unreachable
//!   paper, a provider failure, model output that does not decode. Returned
//!   by the individual components (extractor, prompt builder, gateway).
//!
//! * [`PipelineError`]: where it went wrong: the orchestrator wraps the
//!   cause together with the [`PipelineStage`] that was running. A run is
//!   all-or-nothing, so this is the only error a caller of
//!   [`crate::podcast::PodcastPipeline::run`] ever sees.
//!
//! Nothing is retried internally. [`PodcastError::kind`] gives callers (the
//! HTTP layer in particular) a coarse classification to map onto status
//! codes without matching every variant.

use crate::prompts::PromptStage;
use std::fmt;
use thiserror::Error;

/// All errors produced by the paper2podcast components.
#[derive(Debug, Error)]
pub enum PodcastError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The locator is not an http(s) URL or carries no arXiv paper ID.
    #[error("Invalid paper locator '{locator}': {reason}\nExpected a URL such as https://arxiv.org/abs/2301.00001")]
    InvalidLocator { locator: String, reason: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The paper could not be fetched or yielded no usable text.
    #[error("Failed to extract content from '{url}': {reason}")]
    ExtractionFailed { url: String, reason: String },

    /// Downloading the paper exceeded the configured timeout.
    #[error("Fetching '{url}' timed out after {secs}s\nIncrease --download-timeout.")]
    ExtractionTimeout { url: String, secs: u64 },

    // ── Prompt errors ─────────────────────────────────────────────────────
    /// A stage was asked to build a prompt without the input it requires.
    #[error("Stage '{stage}' requires {missing} in its prompt context")]
    PromptContext {
        stage: PromptStage,
        missing: &'static str,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Transport, authentication or API error from the provider.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The provider answered, but with nothing in it.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// The completion call exceeded the configured timeout.
    #[error("LLM call timed out after {secs}s\nIncrease --api-timeout.")]
    LlmTimeout { secs: u64 },

    /// The model output did not decode into the expected structure.
    #[error("Model output is not a valid {schema}: {detail}")]
    SchemaParse {
        schema: &'static str,
        detail: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`PodcastError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; the caller can fix it.
    InvalidLocator,
    Extraction,
    PromptContext,
    Llm,
    SchemaParse,
    Config,
    Internal,
}

impl PodcastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PodcastError::InvalidLocator { .. } => ErrorKind::InvalidLocator,
            PodcastError::ExtractionFailed { .. } | PodcastError::ExtractionTimeout { .. } => {
                ErrorKind::Extraction
            }
            PodcastError::PromptContext { .. } => ErrorKind::PromptContext,
            PodcastError::ProviderNotConfigured { .. }
            | PodcastError::LlmApiError { .. }
            | PodcastError::EmptyResponse
            | PodcastError::LlmTimeout { .. } => ErrorKind::Llm,
            PodcastError::SchemaParse { .. } => ErrorKind::SchemaParse,
            PodcastError::InvalidConfig(_) => ErrorKind::Config,
            PodcastError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// `true` when the failure is the caller's fault (HTTP 4xx).
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::InvalidLocator
    }

    /// `true` when a remote call hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            PodcastError::ExtractionTimeout { .. } | PodcastError::LlmTimeout { .. }
        )
    }
}

/// The stage of a pipeline run at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Locator validation and content extraction.
    Extraction,
    /// One of the six LLM generation stages.
    Generation(PromptStage),
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Extraction => f.write_str("extraction"),
            PipelineStage::Generation(stage) => write!(f, "{stage}"),
        }
    }
}

impl From<PromptStage> for PipelineStage {
    fn from(stage: PromptStage) -> Self {
        PipelineStage::Generation(stage)
    }
}

/// A failed pipeline run: the stage that was running and why it failed.
#[derive(Debug, Error)]
#[error("Podcast pipeline failed at stage '{stage}': {cause}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub cause: PodcastError,
}

impl PipelineError {
    pub fn new(stage: impl Into<PipelineStage>, cause: PodcastError) -> Self {
        Self {
            stage: stage.into(),
            cause,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.cause.is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_locator_display() {
        let e = PodcastError::InvalidLocator {
            locator: "not-a-paper-url".into(),
            reason: "not a URL".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("not-a-paper-url"), "got: {msg}");
        assert!(e.is_client_error());
    }

    #[test]
    fn timeouts_are_flagged() {
        assert!(PodcastError::LlmTimeout { secs: 30 }.is_timeout());
        assert!(PodcastError::ExtractionTimeout {
            url: "https://arxiv.org/pdf/2301.00001".into(),
            secs: 120,
        }
        .is_timeout());
        assert!(!PodcastError::EmptyResponse.is_timeout());
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(PodcastError::EmptyResponse.kind(), ErrorKind::Llm);
        assert_eq!(
            PodcastError::SchemaParse {
                schema: "PodcastPlan",
                detail: "expected value".into()
            }
            .kind(),
            ErrorKind::SchemaParse
        );
        assert_eq!(
            PodcastError::PromptContext {
                stage: PromptStage::PlanCritique,
                missing: "a podcast plan"
            }
            .kind(),
            ErrorKind::PromptContext
        );
    }

    #[test]
    fn pipeline_error_names_stage() {
        let e = PipelineError::new(
            PromptStage::ScriptCritique,
            PodcastError::LlmApiError {
                message: "401 Unauthorized".into(),
            },
        );
        let msg = e.to_string();
        assert!(msg.contains("script_critique"), "got: {msg}");
        assert!(msg.contains("401"), "got: {msg}");
        assert!(!e.is_client_error());
    }
}
