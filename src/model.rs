//! Value types flowing through a pipeline run.
//!
//! Every entity is produced exactly once per run and never mutated
//! afterwards. The three LLM-produced shapes ([`PodcastPlan`],
//! [`Critique`], [`PodcastScript`]) implement [`StageOutput`], which ties a
//! type to the name used in decode errors and to the invariants checked
//! right after decoding. Anything that reaches the orchestrator has already
//! passed that check.

use crate::prompts::PromptStage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A structured value the LLM Gateway may be asked to produce.
pub trait StageOutput: DeserializeOwned + Send {
    /// Name used in [`crate::error::PodcastError::SchemaParse`].
    const SCHEMA: &'static str;

    /// Check invariants serde cannot express. Returns a human-readable
    /// reason on violation.
    fn validate(&self) -> Result<(), String>;
}

// ── Source ───────────────────────────────────────────────────────────────

/// How the paper content was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Text of the first `pages_read` PDF pages.
    FullText { pages_read: usize },
    /// The abstract scraped from the paper's landing page.
    Abstract,
}

/// Plain text extracted from a paper. `content` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub locator: String,
    pub paper_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub kind: SourceKind,
    pub content: String,
}

// ── Plan ─────────────────────────────────────────────────────────────────

/// Topics and segments a podcast episode will cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastPlan {
    pub title: String,
    pub description: String,
    /// Ordered segment labels.
    pub segments: Vec<String>,
}

impl StageOutput for PodcastPlan {
    const SCHEMA: &'static str = "PodcastPlan";

    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("plan title is empty".into());
        }
        if self.segments.is_empty() {
            return Err("plan has no segments".into());
        }
        if let Some(i) = self.segments.iter().position(|s| s.trim().is_empty()) {
            return Err(format!("segment {} is empty", i + 1));
        }
        Ok(())
    }
}

// ── Critique ─────────────────────────────────────────────────────────────

/// Reviewer feedback on a plan or a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Critique {
    pub feedback: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl StageOutput for Critique {
    const SCHEMA: &'static str = "Critique";

    fn validate(&self) -> Result<(), String> {
        if self.feedback.trim().is_empty() {
            return Err("critique feedback is empty".into());
        }
        Ok(())
    }
}

// ── Script ───────────────────────────────────────────────────────────────

/// One spoken turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLine {
    pub speaker: String,
    pub text: String,
}

/// A podcast script: who speaks, and what they say in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastScript {
    pub speakers: Vec<String>,
    pub content: Vec<ScriptLine>,
}

/// A conversation needs at least a host and a guest.
pub const MIN_SPEAKERS: usize = 2;

impl PodcastScript {
    /// Total number of whitespace-separated words across all lines.
    pub fn word_count(&self) -> usize {
        self.content
            .iter()
            .map(|line| line.text.split_whitespace().count())
            .sum()
    }

    /// Distinct speakers that actually have a line.
    pub fn active_speakers(&self) -> BTreeSet<&str> {
        self.content.iter().map(|l| l.speaker.as_str()).collect()
    }
}

impl StageOutput for PodcastScript {
    const SCHEMA: &'static str = "PodcastScript";

    fn validate(&self) -> Result<(), String> {
        let mut declared = BTreeSet::new();
        for name in &self.speakers {
            if name.trim().is_empty() {
                return Err("speaker name is empty".into());
            }
            if !declared.insert(name.as_str()) {
                return Err(format!("speaker '{name}' is listed twice"));
            }
        }
        if declared.len() < MIN_SPEAKERS {
            return Err(format!(
                "script needs at least {MIN_SPEAKERS} speakers, got {}",
                declared.len()
            ));
        }
        if self.content.is_empty() {
            return Err("script has no content".into());
        }
        for (i, line) in self.content.iter().enumerate() {
            if !declared.contains(line.speaker.as_str()) {
                return Err(format!(
                    "line {} is spoken by '{}', who is not in speakers",
                    i + 1,
                    line.speaker
                ));
            }
            if line.text.trim().is_empty() {
                return Err(format!("line {} has no text", i + 1));
            }
        }
        Ok(())
    }
}

// ── Run output ───────────────────────────────────────────────────────────

/// Timing and token usage of one generation stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: PromptStage,
    pub duration_ms: u64,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Statistics for a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub run_id: Uuid,
    pub paper_id: String,
    pub extraction_duration_ms: u64,
    pub stages: Vec<StageTiming>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub script_words: usize,
    pub estimated_minutes: f32,
}

/// The result of a successful run, as returned to HTTP callers.
#[derive(Debug, Clone, Serialize)]
pub struct PodcastOutput {
    /// The plan after critique and regeneration.
    pub podcast_plan: PodcastPlan,
    /// The script after critique and regeneration.
    pub podcast_script: PodcastScript,
    /// The critique the final script was regenerated from.
    pub critique: Critique,
    #[serde(skip)]
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(speaker: &str, text: &str) -> ScriptLine {
        ScriptLine {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    fn two_host_script() -> PodcastScript {
        PodcastScript {
            speakers: vec!["Alex".into(), "Sam".into()],
            content: vec![
                line("Alex", "Welcome to the show."),
                line("Sam", "Today we read a paper about transformers."),
            ],
        }
    }

    #[test]
    fn valid_script_passes() {
        assert!(two_host_script().validate().is_ok());
    }

    #[test]
    fn unknown_speaker_is_rejected() {
        let mut script = two_host_script();
        script.content.push(line("Jordan", "Hi!"));
        let err = script.validate().unwrap_err();
        assert!(err.contains("Jordan"), "got: {err}");
    }

    #[test]
    fn single_speaker_is_rejected() {
        let script = PodcastScript {
            speakers: vec!["Alex".into()],
            content: vec![line("Alex", "Monologue.")],
        };
        assert!(script.validate().is_err());
    }

    #[test]
    fn duplicate_speaker_is_rejected() {
        let mut script = two_host_script();
        script.speakers.push("Sam".into());
        assert!(script.validate().unwrap_err().contains("twice"));
    }

    #[test]
    fn empty_content_is_rejected() {
        let mut script = two_host_script();
        script.content.clear();
        assert!(script.validate().is_err());
    }

    #[test]
    fn word_count_spans_lines() {
        assert_eq!(two_host_script().word_count(), 11);
        assert_eq!(two_host_script().active_speakers().len(), 2);
    }

    #[test]
    fn plan_needs_segments() {
        let plan = PodcastPlan {
            title: "Attention".into(),
            description: "A walk through the paper".into(),
            segments: vec![],
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn critique_suggestions_default_to_empty() {
        let c: Critique = serde_json::from_str(r#"{"feedback": "Too dense."}"#).unwrap();
        assert!(c.suggestions.is_empty());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn output_hides_stats() {
        let output = PodcastOutput {
            podcast_plan: PodcastPlan {
                title: "t".into(),
                description: "d".into(),
                segments: vec!["intro".into()],
            },
            podcast_script: two_host_script(),
            critique: Critique {
                feedback: "Good".into(),
                suggestions: vec![],
            },
            stats: RunStats {
                run_id: Uuid::nil(),
                paper_id: "2301.00001".into(),
                extraction_duration_ms: 0,
                stages: vec![],
                total_input_tokens: 0,
                total_output_tokens: 0,
                total_duration_ms: 0,
                script_words: 11,
                estimated_minutes: 0.1,
            },
        };
        let json = serde_json::to_value(&output).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 3);
        assert!(json.get("podcast_plan").is_some());
        assert!(json.get("podcast_script").is_some());
        assert!(json.get("critique").is_some());
    }
}
