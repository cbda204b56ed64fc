//! Client-held conversation state for the planning chat.
//!
//! The transcript only grows. At most one submission is in flight; callers
//! take the transcript from [`ConversationSession::begin_submit`], send it,
//! then report the outcome with `apply_reply` or `apply_failure`.

use thiserror::Error;

use crate::model::{ChatMessage, PlanStep, StepStatus};
use crate::planner::PlanReply;

/// Shown in place of the agent's reply when a turn fails for any reason.
pub const FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a request is already in flight")]
    Busy,
    #[error("message is empty")]
    EmptyInput,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    transcript: Vec<ChatMessage>,
    in_flight: bool,
    plan: Option<Vec<PlanStep>>,
    last_message: Option<String>,
    pending_input: Option<String>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// The latest text to show from the agent: a question, a plan summary,
    /// or the failure message.
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Input from a failed turn, kept so it can be sent again.
    pub fn pending_input(&self) -> Option<&str> {
        self.pending_input.as_deref()
    }

    pub fn plan(&self) -> Option<&[PlanStep]> {
        self.plan.as_deref()
    }

    /// Append a user turn and return the full transcript to send.
    pub fn begin_submit(&mut self, input: &str) -> Result<Vec<ChatMessage>, SessionError> {
        if self.in_flight {
            return Err(SessionError::Busy);
        }
        let input = input.trim();
        if input.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        self.transcript.push(ChatMessage::user(input));
        self.pending_input = None;
        self.in_flight = true;
        Ok(self.transcript.clone())
    }

    /// Record the reply to the in-flight turn. Ignored when nothing is in
    /// flight, such as a late reply to a turn that already failed.
    pub fn apply_reply(&mut self, reply: PlanReply) {
        if !self.in_flight {
            return;
        }
        self.in_flight = false;
        self.transcript
            .push(ChatMessage::assistant(reply.assistant_text()));
        self.last_message = Some(reply.assistant_text().to_string());
        if let PlanReply::Plan { plan, .. } = reply {
            self.plan = Some(plan);
        }
    }

    /// Record a failed turn. The unanswered user turn comes back out of the
    /// transcript and is held as pending input.
    pub fn apply_failure(&mut self) {
        if !self.in_flight {
            return;
        }
        self.in_flight = false;
        if let Some(turn) = self.transcript.pop() {
            self.pending_input = Some(turn.content);
        }
        self.last_message = Some(FAILURE_MESSAGE.to_string());
    }

    /// Mark a step of the working plan in progress. Local only.
    pub fn start_step(&mut self, step_id: &str) -> bool {
        self.set_step_status(step_id, StepStatus::InProgress)
    }

    /// Mark a step of the working plan completed. Local only.
    pub fn complete_step(&mut self, step_id: &str) -> bool {
        self.set_step_status(step_id, StepStatus::Completed)
    }

    fn set_step_status(&mut self, step_id: &str, status: StepStatus) -> bool {
        let step = self
            .plan
            .as_mut()
            .and_then(|steps| steps.iter_mut().find(|s| s.step_id == step_id));
        match step {
            Some(step) => {
                step.status = status;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    fn plan_reply() -> PlanReply {
        PlanReply::Plan {
            summary: "Three steps to calculus".into(),
            plan: vec![
                PlanStep::new("1", "Limits", "Epsilon-delta", "Flexible"),
                PlanStep::new("2", "Derivatives", "Rules", "2 days"),
            ],
        }
    }

    #[test]
    fn test_submit_returns_whole_transcript() {
        let mut session = ConversationSession::new();
        let sent = session.begin_submit("Calculus").unwrap();
        assert_eq!(sent, vec![ChatMessage::user("Calculus")]);

        session.apply_reply(PlanReply::Question {
            question: "How many weeks?".into(),
        });
        let sent = session.begin_submit("  Four  ").unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1], ChatMessage::assistant("How many weeks?"));
        assert_eq!(sent[2].content, "Four");
    }

    #[test]
    fn test_second_submit_while_busy_is_rejected() {
        let mut session = ConversationSession::new();
        session.begin_submit("first").unwrap();
        assert!(session.is_busy());
        assert_eq!(session.begin_submit("second"), Err(SessionError::Busy));
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let mut session = ConversationSession::new();
        assert_eq!(session.begin_submit("   "), Err(SessionError::EmptyInput));
        assert!(!session.is_busy());
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn test_plan_reply_sets_working_plan() {
        let mut session = ConversationSession::new();
        session.begin_submit("Calculus, 3 weeks, 1h/day, everything").unwrap();
        session.apply_reply(plan_reply());

        assert!(!session.is_busy());
        assert_eq!(session.last_message(), Some("Three steps to calculus"));
        assert_eq!(session.plan().unwrap().len(), 2);
        let last = session.transcript().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
    }

    #[test]
    fn test_failure_rolls_back_user_turn() {
        let mut session = ConversationSession::new();
        session.begin_submit("Chemistry").unwrap();
        session.apply_reply(PlanReply::Question {
            question: "By when?".into(),
        });
        session.begin_submit("June").unwrap();
        session.apply_failure();

        assert!(!session.is_busy());
        assert_eq!(session.last_message(), Some(FAILURE_MESSAGE));
        assert_eq!(session.pending_input(), Some("June"));
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript()[1].role, Role::Assistant);

        session.begin_submit("June").unwrap();
        assert!(session.pending_input().is_none());
    }

    #[test]
    fn test_failure_without_request_is_ignored() {
        let mut session = ConversationSession::new();
        session.begin_submit("Biology").unwrap();
        session.apply_reply(PlanReply::Question {
            question: "Which topics?".into(),
        });
        session.apply_failure();
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.last_message(), Some("Which topics?"));
    }

    #[test]
    fn test_late_reply_after_failure_is_ignored() {
        let mut session = ConversationSession::new();
        session.begin_submit("Statistics").unwrap();
        session.apply_failure();
        session.apply_reply(PlanReply::Question {
            question: "Which exam board?".into(),
        });

        assert!(session.transcript().is_empty());
        assert_eq!(session.last_message(), Some(FAILURE_MESSAGE));
        assert_eq!(session.pending_input(), Some("Statistics"));

        session.begin_submit("Statistics").unwrap();
        session.apply_reply(PlanReply::Question {
            question: "Which exam board?".into(),
        });
        let roles: Vec<Role> = session.transcript().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn test_step_progress_is_local() {
        let mut session = ConversationSession::new();
        assert!(!session.start_step("1"));

        session.begin_submit("Calculus").unwrap();
        session.apply_reply(plan_reply());
        assert!(session.start_step("1"));
        assert!(session.complete_step("2"));
        assert!(!session.complete_step("9"));

        let steps = session.plan().unwrap();
        assert_eq!(steps[0].status, StepStatus::InProgress);
        assert_eq!(steps[1].status, StepStatus::Completed);
    }
}
