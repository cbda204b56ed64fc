//! The conversational plan-generation exchange.
//!
//! Each turn carries the whole transcript. The provider either asks one
//! clarifying question (nothing is stored) or returns a finished plan, which
//! is persisted as a new goal and plan pair.

mod reply;

pub use reply::{finalize_steps, parse_reply, DraftStep, PlanReply, ProviderReply};

use serde::{Deserialize, Serialize};

use crate::error::{CerebroError, Result};
use crate::llm::LlmService;
use crate::model::*;
use crate::storage::StorageBackend;

/// Fixed instruction prepended to every transcript sent to the provider.
pub const SYSTEM_PROMPT: &str = r#"You are an AI study planning agent.

Collect every required detail before producing a study plan:
- Topic
- Time available (weeks, days or a target date)
- Daily study hours
- Scope (full syllabus or specific topics)

Rules:
- If any required detail is missing, ask exactly ONE clear question.
- Do not produce a plan until every detail is known.
- Once every detail is known, produce the plan.

When asking a question, respond with:
{"type": "question", "question": "..."}

When producing the plan, respond with:
{"type": "plan", "summary": "...", "plan": [{"title": "...", "description": "...", "estimatedTime": "..."}]}

Respond with strict JSON only."#;

/// Body of `POST /api/plans`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
}

impl PlanRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: Some(messages),
        }
    }

    /// The transcript, provided it is present and non-empty.
    pub fn transcript(&self) -> Result<&[ChatMessage]> {
        match self.messages.as_deref() {
            Some(messages) if !messages.is_empty() => Ok(messages),
            _ => Err(CerebroError::InvalidInput("Messages are required".to_string())),
        }
    }
}

/// Outcome of one turn, with the records a plan turn created.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: PlanReply,
    pub saved: Option<(LearningGoal, LearningPlan)>,
}

/// Run one planning turn for an already verified caller.
///
/// Resolves (or lazily creates) the caller's user record, makes exactly one
/// provider call, validates the reply and, on the plan branch, persists the
/// goal and plan together. Nothing is retried.
pub async fn plan_turn<S: StorageBackend>(
    storage: &S,
    llm: &LlmService,
    identity: &Identity,
    transcript: &[ChatMessage],
) -> Result<TurnOutcome> {
    if transcript.is_empty() {
        return Err(CerebroError::InvalidInput(
            "Messages are required".to_string(),
        ));
    }

    let user = storage.upsert_user(&identity.to_user()).await?;

    let raw = llm.chat(SYSTEM_PROMPT, transcript).await?;

    let reply = parse_reply(&raw).inspect_err(|e| {
        tracing::error!(error = %e, raw = %raw, "provider reply failed validation");
    })?;

    match reply {
        ProviderReply::Question { question } => {
            tracing::debug!(user_id = %user.id, "provider asked a clarifying question");
            Ok(TurnOutcome {
                reply: PlanReply::Question { question },
                saved: None,
            })
        }
        ProviderReply::Plan { summary, plan } => {
            let prompt = originating_prompt(transcript)
                .unwrap_or(PLACEHOLDER_PROMPT)
                .to_string();
            let steps = finalize_steps(plan);

            let goal = LearningGoal::new(user.id, prompt);
            let plan = LearningPlan::new(user.id, goal.id, steps);
            storage.save_goal_and_plan(&goal, &plan).await?;

            tracing::info!(
                user_id = %user.id,
                goal_id = %goal.id,
                plan_id = %plan.id,
                steps = plan.steps.len(),
                "saved generated plan"
            );

            Ok(TurnOutcome {
                reply: PlanReply::Plan {
                    summary,
                    plan: plan.steps.clone(),
                },
                saved: Some((goal, plan)),
            })
        }
    }
}
