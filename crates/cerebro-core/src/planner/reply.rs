use serde::{Deserialize, Serialize};

use crate::error::{CerebroError, Result};
use crate::model::{PlanStep, DEFAULT_ESTIMATED_TIME};

/// A validated provider reply. Exactly one of the two shapes the system
/// instruction asks for; anything else fails [`parse_reply`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderReply {
    Question {
        question: String,
    },
    Plan {
        summary: String,
        plan: Vec<DraftStep>,
    },
}

/// A step as the provider proposed it, before ids and status are assigned.
/// Any `status` the provider sends is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftStep {
    #[serde(default, alias = "step_id")]
    pub step_id: Option<String>,
    pub title: String,
    pub description: String,
    #[serde(default, alias = "estimated_time")]
    pub estimated_time: Option<String>,
}

/// Parse and schema-check raw provider output.
///
/// Non-JSON, an unknown `type`, a missing required field or a field of the
/// wrong type is rejected; nothing is coerced.
pub fn parse_reply(raw: &str) -> Result<ProviderReply> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| CerebroError::MalformedReply(format!("not JSON: {e}")))?;

    if !value.is_object() {
        return Err(CerebroError::MalformedReply(
            "expected a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| CerebroError::MalformedReply(e.to_string()))
}

/// Turn drafted steps into plan steps: positional 1-based ids where the
/// provider left them out, status forced to `pending`.
pub fn finalize_steps(drafts: Vec<DraftStep>) -> Vec<PlanStep> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| {
            let step_id = draft
                .step_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| (index + 1).to_string());
            let estimated_time = draft
                .estimated_time
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ESTIMATED_TIME.to_string());
            PlanStep::new(step_id, draft.title, draft.description, estimated_time)
        })
        .collect()
}

/// What `POST /api/plans` answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlanReply {
    Question {
        question: String,
    },
    Plan {
        summary: String,
        plan: Vec<PlanStep>,
    },
}

impl PlanReply {
    /// Text the client appends to its transcript as the assistant turn.
    pub fn assistant_text(&self) -> &str {
        match self {
            Self::Question { question } => question,
            Self::Plan { summary, .. } => summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepStatus;

    #[test]
    fn test_parse_question() {
        let reply = parse_reply(r#"{"type":"question","question":"How many hours a day?"}"#)
            .unwrap();
        assert_eq!(
            reply,
            ProviderReply::Question {
                question: "How many hours a day?".into()
            }
        );
    }

    #[test]
    fn test_parse_plan_with_optional_fields() {
        let raw = r#"{
            "type": "plan",
            "summary": "Four weeks of Rust",
            "plan": [
                {"stepId": "a", "title": "Ownership", "description": "Borrowing rules", "estimatedTime": "2 hours"},
                {"title": "Traits", "description": "Generics and traits", "status": "completed"}
            ]
        }"#;
        let ProviderReply::Plan { summary, plan } = parse_reply(raw).unwrap() else {
            panic!("expected plan");
        };
        assert_eq!(summary, "Four weeks of Rust");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].step_id.as_deref(), Some("a"));
        assert!(plan[1].step_id.is_none());
        assert!(plan[1].estimated_time.is_none());
    }

    #[test]
    fn test_parse_empty_plan_is_accepted() {
        let reply = parse_reply(r#"{"type":"plan","summary":"Nothing to do","plan":[]}"#).unwrap();
        assert!(matches!(reply, ProviderReply::Plan { ref plan, .. } if plan.is_empty()));
    }

    #[test]
    fn test_rejects_non_json() {
        let err = parse_reply("Sure! Here is your plan:").unwrap_err();
        assert!(matches!(err, CerebroError::MalformedReply(_)));
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(parse_reply(r#"["question"]"#).is_err());
    }

    #[test]
    fn test_rejects_unknown_type() {
        let err = parse_reply(r#"{"type":"chitchat","text":"hi"}"#).unwrap_err();
        assert!(err.to_string().contains("chitchat"));
    }

    #[test]
    fn test_rejects_missing_type() {
        assert!(parse_reply(r#"{"question":"What topic?"}"#).is_err());
    }

    #[test]
    fn test_rejects_missing_summary() {
        assert!(parse_reply(r#"{"type":"plan","plan":[]}"#).is_err());
    }

    #[test]
    fn test_rejects_wrong_field_types() {
        assert!(parse_reply(r#"{"type":"question","question":42}"#).is_err());
        assert!(parse_reply(r#"{"type":"plan","summary":"s","plan":"step one"}"#).is_err());
        assert!(parse_reply(r#"{"type":"plan","summary":"s","plan":["step one"]}"#).is_err());
        assert!(
            parse_reply(r#"{"type":"plan","summary":"s","plan":[{"title":"t","description":7}]}"#)
                .is_err()
        );
        assert!(parse_reply(
            r#"{"type":"plan","summary":"s","plan":[{"stepId":3,"title":"t","description":"d"}]}"#
        )
        .is_err());
    }

    #[test]
    fn test_rejects_step_without_title() {
        assert!(
            parse_reply(r#"{"type":"plan","summary":"s","plan":[{"description":"d"}]}"#).is_err()
        );
    }

    #[test]
    fn test_finalize_assigns_positional_ids_and_pending() {
        let drafts = vec![
            DraftStep {
                step_id: None,
                title: "One".into(),
                description: "d1".into(),
                estimated_time: None,
            },
            DraftStep {
                step_id: Some("custom".into()),
                title: "Two".into(),
                description: "d2".into(),
                estimated_time: Some("1 week".into()),
            },
            DraftStep {
                step_id: Some("  ".into()),
                title: "Three".into(),
                description: "d3".into(),
                estimated_time: None,
            },
        ];
        let steps = finalize_steps(drafts);
        let ids: Vec<&str> = steps.iter().map(|s| s.step_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "custom", "3"]);
        assert!(steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(steps[0].estimated_time, "Flexible");
        assert_eq!(steps[1].estimated_time, "1 week");
    }

    #[test]
    fn test_plan_reply_wire_shape() {
        let reply = PlanReply::Plan {
            summary: "Go".into(),
            plan: vec![PlanStep::new("1", "t", "d", "Flexible")],
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "plan");
        assert_eq!(json["plan"][0]["stepId"], "1");
        assert_eq!(json["plan"][0]["status"], "pending");
        assert_eq!(reply.assistant_text(), "Go");

        let question = PlanReply::Question {
            question: "When is the exam?".into(),
        };
        let json = serde_json::to_value(&question).unwrap();
        assert_eq!(json, serde_json::json!({"type":"question","question":"When is the exam?"}));
    }
}
