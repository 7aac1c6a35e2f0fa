//! LLM Gateway: send one prompt, get back one decoded stage output.
//!
//! This module is intentionally thin. Prompt wording lives in
//! [`crate::prompts`], output cleanup and validation in
//! [`crate::pipeline::decode`]; the gateway only moves a [`Prompt`] to the
//! provider and the reply back, under a deadline. [`ProviderBackend`]
//! adapts any `edgequake_llm` provider to the narrow [`ChatBackend`] trait
//! the gateway calls.
//!
//! ## No retries
//!
//! A failed call fails the stage and with it the run.

use crate::config::SamplingConfig;
use crate::error::PodcastError;
use crate::model::StageOutput;
use crate::pipeline::decode::decode_json;
use crate::prompts::Prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Raw text returned by a backend, with token usage.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Sends a two-message conversation (system + user) to a model.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(
        &self,
        prompt: &Prompt,
        sampling: &SamplingConfig,
    ) -> Result<ChatReply, PodcastError>;
}

/// [`ChatBackend`] over an `edgequake_llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChatBackend for ProviderBackend {
    async fn chat(
        &self,
        prompt: &Prompt,
        sampling: &SamplingConfig,
    ) -> Result<ChatReply, PodcastError> {
        let messages = vec![
            ChatMessage::system(prompt.system.as_str()),
            ChatMessage::user(prompt.user.as_str()),
        ];
        let options = build_options(sampling);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| PodcastError::LlmApiError {
                message: e.to_string(),
            })?;

        Ok(ChatReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` from per-stage sampling.
fn build_options(sampling: &SamplingConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(sampling.temperature),
        max_tokens: Some(sampling.max_tokens),
        ..Default::default()
    }
}

/// A decoded stage output with the cost of producing it.
#[derive(Debug, Clone)]
pub struct Completion<T> {
    pub value: T,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Single point of contact with the model.
#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn ChatBackend>,
    timeout: Duration,
}

impl Gateway {
    pub fn new(backend: Arc<dyn ChatBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn from_provider(provider: Arc<dyn LLMProvider>, timeout: Duration) -> Self {
        Self::new(Arc::new(ProviderBackend::new(provider)), timeout)
    }

    /// Send `prompt` and decode the reply into `T`.
    ///
    /// # Errors
    /// - [`PodcastError::LlmTimeout`] when the call exceeds the deadline
    /// - [`PodcastError::LlmApiError`] for provider failures
    /// - [`PodcastError::EmptyResponse`] for a blank reply
    /// - [`PodcastError::SchemaParse`] when the reply does not decode into `T`
    pub async fn complete<T: StageOutput>(
        &self,
        prompt: &Prompt,
        sampling: &SamplingConfig,
    ) -> Result<Completion<T>, PodcastError> {
        let start = Instant::now();
        let reply = tokio::time::timeout(self.timeout, self.backend.chat(prompt, sampling))
            .await
            .map_err(|_| PodcastError::LlmTimeout {
                secs: self.timeout.as_secs(),
            })??;

        if reply.content.trim().is_empty() {
            return Err(PodcastError::EmptyResponse);
        }

        let duration = start.elapsed();
        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            T::SCHEMA,
            reply.prompt_tokens,
            reply.completion_tokens,
            duration
        );

        let value = decode_json::<T>(&reply.content)?;
        Ok(Completion {
            value,
            input_tokens: reply.prompt_tokens,
            output_tokens: reply.completion_tokens,
            duration_ms: duration.as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Critique, PodcastPlan};
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<Result<ChatReply, PodcastError>>>,
        delay: Duration,
    }

    impl Scripted {
        fn new(replies: Vec<Result<ChatReply, PodcastError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn chat(
            &self,
            _prompt: &Prompt,
            _sampling: &SamplingConfig,
        ) -> Result<ChatReply, PodcastError> {
            tokio::time::sleep(self.delay).await;
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn reply(content: &str) -> Result<ChatReply, PodcastError> {
        Ok(ChatReply {
            content: content.to_string(),
            prompt_tokens: 120,
            completion_tokens: 30,
        })
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "system".into(),
            user: "user".into(),
        }
    }

    fn sampling() -> SamplingConfig {
        SamplingConfig::new(0.3, 100)
    }

    #[test]
    fn build_options_from_sampling() {
        let opts = build_options(&SamplingConfig::new(0.7, 1000));
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(1000));
    }

    #[tokio::test]
    async fn decodes_reply_and_reports_tokens() {
        let gw = Gateway::new(
            Scripted::new(vec![reply(r#"{"feedback":"Good","suggestions":["Shorter intro"]}"#)]),
            Duration::from_secs(5),
        );
        let c = gw.complete::<Critique>(&prompt(), &sampling()).await.unwrap();
        assert_eq!(c.value.suggestions, vec!["Shorter intro"]);
        assert_eq!(c.input_tokens, 120);
        assert_eq!(c.output_tokens, 30);
    }

    #[tokio::test]
    async fn blank_reply_is_empty_response() {
        let gw = Gateway::new(Scripted::new(vec![reply("  \n")]), Duration::from_secs(5));
        let err = gw.complete::<Critique>(&prompt(), &sampling()).await.unwrap_err();
        assert!(matches!(err, PodcastError::EmptyResponse));
    }

    #[tokio::test]
    async fn malformed_reply_is_schema_error() {
        let gw = Gateway::new(
            Scripted::new(vec![reply("The plan is to talk about attention.")]),
            Duration::from_secs(5),
        );
        let err = gw.complete::<PodcastPlan>(&prompt(), &sampling()).await.unwrap_err();
        assert!(matches!(err, PodcastError::SchemaParse { schema: "PodcastPlan", .. }));
    }

    #[tokio::test]
    async fn provider_error_passes_through() {
        let gw = Gateway::new(
            Scripted::new(vec![Err(PodcastError::LlmApiError {
                message: "401 Unauthorized".into(),
            })]),
            Duration::from_secs(5),
        );
        let err = gw.complete::<Critique>(&prompt(), &sampling()).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let backend = Arc::new(Scripted {
            replies: Mutex::new(vec![reply(r#"{"feedback":"late"}"#)]),
            delay: Duration::from_millis(500),
        });
        let gw = Gateway::new(backend, Duration::from_millis(20));
        let err = gw.complete::<Critique>(&prompt(), &sampling()).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
