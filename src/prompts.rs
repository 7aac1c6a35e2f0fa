//! Prompt construction for the six generation stages.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing what a stage asks for (a new
//!    plan field, a different tone for the critic) means editing one place.
//!
//! 2. **Testability**: [`build`] is a pure function of its inputs, so
//!    tests can inspect prompts directly without a provider.
//!
//! Context entities are embedded as pretty-printed JSON. Struct fields
//! serialise in declaration order, so identical context always yields a
//! byte-identical prompt.

use crate::error::PodcastError;
use crate::model::{Critique, PodcastPlan, PodcastScript, SourceDocument};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the plan/script generate → critique → regenerate chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStage {
    PlanInitial,
    PlanCritique,
    PlanRegenerate,
    ScriptInitial,
    ScriptCritique,
    ScriptRegenerate,
}

impl PromptStage {
    /// All stages in run order.
    pub const ALL: [PromptStage; 6] = [
        PromptStage::PlanInitial,
        PromptStage::PlanCritique,
        PromptStage::PlanRegenerate,
        PromptStage::ScriptInitial,
        PromptStage::ScriptCritique,
        PromptStage::ScriptRegenerate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStage::PlanInitial => "plan_initial",
            PromptStage::PlanCritique => "plan_critique",
            PromptStage::PlanRegenerate => "plan_regenerate",
            PromptStage::ScriptInitial => "script_initial",
            PromptStage::ScriptCritique => "script_critique",
            PromptStage::ScriptRegenerate => "script_regenerate",
        }
    }

    pub fn is_critique(&self) -> bool {
        matches!(self, PromptStage::PlanCritique | PromptStage::ScriptCritique)
    }

    pub fn is_script(&self) -> bool {
        matches!(
            self,
            PromptStage::ScriptInitial | PromptStage::ScriptCritique | PromptStage::ScriptRegenerate
        )
    }
}

impl fmt::Display for PromptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered prompt: persona framing plus the task with its context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Prior-stage entities available to the prompt builder.
///
/// Each stage reads only the fields it needs; see [`build`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptContext<'a> {
    pub source: Option<&'a SourceDocument>,
    pub plan: Option<&'a PodcastPlan>,
    pub script: Option<&'a PodcastScript>,
    pub critique: Option<&'a Critique>,
}

impl<'a> PromptContext<'a> {
    pub fn with_source(mut self, source: &'a SourceDocument) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_plan(mut self, plan: &'a PodcastPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_script(mut self, script: &'a PodcastScript) -> Self {
        self.script = Some(script);
        self
    }

    pub fn with_critique(mut self, critique: &'a Critique) -> Self {
        self.critique = Some(critique);
        self
    }
}

// ── Personas ─────────────────────────────────────────────────────────────

pub const PLANNER_PERSONA: &str = "You are an expert podcast planner. You turn research papers into \
episode plans that a curious listener with no background in the field can follow.";

pub const PLAN_CRITIC_PERSONA: &str = "You are an expert podcast critic. You review episode plans \
for clarity, pacing and accessibility to a diverse audience.";

pub const SCRIPTWRITER_PERSONA: &str = "You are a professional podcast scriptwriter. You write \
natural, engaging two-host conversations that explain research simply and accurately.";

pub const SCRIPT_CRITIC_PERSONA: &str = "You are an expert podcast script reviewer. You judge \
scripts on engagement, clarity, accuracy and whether they fit the target running time.";

/// Running time the script prompts ask for. Advisory only; see
/// [`crate::config::PodcastConfig::target_minutes`].
pub const TARGET_DURATION: &str = "10-15 minutes";

/// Appended to every user prompt: the gateway decodes raw text strictly.
const JSON_ONLY: &str = "Respond with a single JSON object only. Do not wrap it in Markdown \
fences and do not add any text before or after it.";

const PLAN_SHAPE: &str = r#"{
  "title": "Episode title",
  "description": "Two or three sentences on what the episode covers and why it matters",
  "segments": [
    "Cold open: the question the paper answers",
    "Background the listener needs",
    "The core idea, explained with an analogy",
    "Results and what they mean",
    "Limitations and open questions",
    "Wrap-up"
  ]
}"#;

const CRITIQUE_SHAPE: &str = r#"{
  "feedback": "Overall assessment in a few sentences",
  "suggestions": [
    "A concrete, actionable change",
    "Another concrete, actionable change"
  ]
}"#;

const SCRIPT_SHAPE: &str = r#"{
  "speakers": ["Host", "Guest"],
  "content": [
    { "speaker": "Host", "text": "..." },
    { "speaker": "Guest", "text": "..." }
  ]
}"#;

/// Build the prompt for `stage` from `context`.
///
/// | Stage | Requires |
/// |-------|----------|
/// | `PlanInitial` | source |
/// | `PlanCritique` | plan |
/// | `PlanRegenerate` | plan, critique |
/// | `ScriptInitial` | plan |
/// | `ScriptCritique` | script |
/// | `ScriptRegenerate` | script, critique |
///
/// # Errors
/// [`PodcastError::PromptContext`] when a required entity is absent.
pub fn build(stage: PromptStage, context: &PromptContext<'_>) -> Result<Prompt, PodcastError> {
    let prompt = match stage {
        PromptStage::PlanInitial => {
            let source = require(stage, context.source, "the source document")?;
            Prompt {
                system: PLANNER_PERSONA.to_string(),
                user: format!(
                    "Based on the following paper, create a detailed podcast plan.\n\n\
                     Paper:\n{}\n\n\
                     The plan must have a title, a short description and an ordered list of \
                     segments covering the paper's key ideas.\n\n\
                     Return it in this shape:\n{PLAN_SHAPE}\n\n{JSON_ONLY}",
                    render_source(source)
                ),
            }
        }
        PromptStage::PlanCritique => {
            let plan = require(stage, context.plan, "a podcast plan")?;
            Prompt {
                system: PLAN_CRITIC_PERSONA.to_string(),
                user: format!(
                    "Critique the following podcast plan and suggest how to make it more \
                     appealing and understandable to people from all backgrounds.\n\n\
                     Podcast plan:\n{}\n\n\
                     Return your critique in this shape:\n{CRITIQUE_SHAPE}\n\n{JSON_ONLY}",
                    to_json(plan)?
                ),
            }
        }
        PromptStage::PlanRegenerate => {
            let plan = require(stage, context.plan, "a podcast plan")?;
            let critique = require(stage, context.critique, "a critique of the plan")?;
            Prompt {
                system: PLANNER_PERSONA.to_string(),
                user: format!(
                    "Revise the podcast plan below so that it addresses the critique and is \
                     inclusive and understandable for a diverse audience.\n\n\
                     Original podcast plan:\n{}\n\n\
                     Critique:\n{}\n\n\
                     Return the revised plan in this shape:\n{PLAN_SHAPE}\n\n{JSON_ONLY}",
                    to_json(plan)?,
                    to_json(critique)?
                ),
            }
        }
        PromptStage::ScriptInitial => {
            let plan = require(stage, context.plan, "a podcast plan")?;
            Prompt {
                system: SCRIPTWRITER_PERSONA.to_string(),
                user: format!(
                    "Using the following podcast plan, write a detailed podcast script. The hosts \
                     should alternate, ask each other plenty of questions and answer them in a \
                     simple yet engaging way, covering every segment of the plan. The podcast \
                     should run {TARGET_DURATION}.\n\n\
                     Podcast plan:\n{}\n\n\
                     Every speaker used in \"content\" must appear in \"speakers\". Use at least \
                     two speakers.\n\n\
                     Return the script in this shape:\n{SCRIPT_SHAPE}\n\n{JSON_ONLY}",
                    to_json(plan)?
                ),
            }
        }
        PromptStage::ScriptCritique => {
            let script = require(stage, context.script, "a podcast script")?;
            Prompt {
                system: SCRIPT_CRITIC_PERSONA.to_string(),
                user: format!(
                    "Critique the following podcast script and suggest how to make it more \
                     engaging, clear and suitable for a {TARGET_DURATION} episode. Make sure the \
                     content is understandable for listeners from all backgrounds and covers \
                     the key topics effectively.\n\n\
                     Podcast script:\n{}\n\n\
                     Return your critique in this shape:\n{CRITIQUE_SHAPE}\n\n{JSON_ONLY}",
                    to_json(script)?
                ),
            }
        }
        PromptStage::ScriptRegenerate => {
            let script = require(stage, context.script, "a podcast script")?;
            let critique = require(stage, context.critique, "a critique of the script")?;
            Prompt {
                system: SCRIPTWRITER_PERSONA.to_string(),
                user: format!(
                    "Rewrite the podcast script below so that it addresses the critique. Keep the \
                     episode within {TARGET_DURATION} and accessible to a diverse audience.\n\n\
                     Original podcast script:\n{}\n\n\
                     Critique:\n{}\n\n\
                     Every speaker used in \"content\" must appear in \"speakers\".\n\n\
                     Return the rewritten script in this shape:\n{SCRIPT_SHAPE}\n\n{JSON_ONLY}",
                    to_json(script)?,
                    to_json(critique)?
                ),
            }
        }
    };
    Ok(prompt)
}

fn require<'a, T>(
    stage: PromptStage,
    value: Option<&'a T>,
    missing: &'static str,
) -> Result<&'a T, PodcastError> {
    value.ok_or(PodcastError::PromptContext { stage, missing })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, PodcastError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PodcastError::Internal(format!("prompt context serialisation: {e}")))
}

/// Render the paper as a short header plus its text.
fn render_source(source: &SourceDocument) -> String {
    let mut out = format!("arXiv ID: {}\n", source.paper_id);
    if let Some(ref title) = source.title {
        out.push_str(&format!("Title: {title}\n"));
    }
    out.push_str("\"\"\"\n");
    out.push_str(&source.content);
    out.push_str("\n\"\"\"");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScriptLine, SourceKind};

    fn source() -> SourceDocument {
        SourceDocument {
            locator: "https://arxiv.org/abs/2301.00001".into(),
            paper_id: "2301.00001".into(),
            title: Some("A Paper".into()),
            kind: SourceKind::Abstract,
            content: "We propose a method.".into(),
        }
    }

    fn plan() -> PodcastPlan {
        PodcastPlan {
            title: "Episode".into(),
            description: "About a method".into(),
            segments: vec!["Intro".into(), "Method".into()],
        }
    }

    fn critique() -> Critique {
        Critique {
            feedback: "Needs an analogy".into(),
            suggestions: vec!["Add an analogy in the method segment".into()],
        }
    }

    fn script() -> PodcastScript {
        PodcastScript {
            speakers: vec!["Host".into(), "Guest".into()],
            content: vec![
                ScriptLine {
                    speaker: "Host".into(),
                    text: "Hello".into(),
                },
                ScriptLine {
                    speaker: "Guest".into(),
                    text: "Hi".into(),
                },
            ],
        }
    }

    #[test]
    fn every_stage_is_deterministic() {
        let (s, p, c, sc) = (source(), plan(), critique(), script());
        let ctx = PromptContext::default()
            .with_source(&s)
            .with_plan(&p)
            .with_critique(&c)
            .with_script(&sc);
        for stage in PromptStage::ALL {
            let a = build(stage, &ctx).unwrap();
            let b = build(stage, &ctx).unwrap();
            assert_eq!(a, b, "stage {stage} is not deterministic");
        }
    }

    #[test]
    fn plan_initial_embeds_source() {
        let s = source();
        let prompt = build(PromptStage::PlanInitial, &PromptContext::default().with_source(&s))
            .unwrap();
        assert_eq!(prompt.system, PLANNER_PERSONA);
        assert!(prompt.user.contains("We propose a method."));
        assert!(prompt.user.contains("2301.00001"));
        assert!(prompt.user.contains("A Paper"));
    }

    #[test]
    fn regenerate_embeds_plan_and_critique() {
        let (p, c) = (plan(), critique());
        let prompt = build(
            PromptStage::PlanRegenerate,
            &PromptContext::default().with_plan(&p).with_critique(&c),
        )
        .unwrap();
        assert!(prompt.user.contains("\"segments\""));
        assert!(prompt.user.contains("Add an analogy in the method segment"));
    }

    #[test]
    fn script_prompts_mention_duration() {
        let (p, sc) = (plan(), script());
        let ctx = PromptContext::default().with_plan(&p).with_script(&sc);
        for stage in [PromptStage::ScriptInitial, PromptStage::ScriptCritique] {
            assert!(build(stage, &ctx).unwrap().user.contains(TARGET_DURATION));
        }
    }

    #[test]
    fn missing_context_is_reported() {
        let p = plan();
        let err = build(PromptStage::PlanRegenerate, &PromptContext::default().with_plan(&p))
            .unwrap_err();
        match err {
            PodcastError::PromptContext { stage, missing } => {
                assert_eq!(stage, PromptStage::PlanRegenerate);
                assert!(missing.contains("critique"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        for stage in PromptStage::ALL {
            assert!(
                build(stage, &PromptContext::default()).is_err(),
                "{stage} built without context"
            );
        }
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(PromptStage::ScriptRegenerate.to_string(), "script_regenerate");
        assert_eq!(
            serde_json::to_string(&PromptStage::PlanCritique).unwrap(),
            "\"plan_critique\""
        );
    }
}
