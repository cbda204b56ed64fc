use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prompt recorded for a goal when the transcript carried no user turn.
pub const PLACEHOLDER_PROMPT: &str = "Untitled learning goal";

/// Default creator tag stamped on every persisted plan.
pub const DEFAULT_CREATED_BY: &str = "system";

/// Estimated-time label used when the provider leaves it out.
pub const DEFAULT_ESTIMATED_TIME: &str = "Flexible";

/// The free-text prompt that originated a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
}

impl LearningGoal {
    pub fn new(user_id: Uuid, prompt: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            prompt,
            status: GoalStatus::default(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Abandoned,
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(format!("unknown goal status: {s}")),
        }
    }
}

/// An ordered sequence of steps produced from one completed conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_id: Uuid,
    pub steps: Vec<PlanStep>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl LearningPlan {
    pub fn new(user_id: Uuid, goal_id: Uuid, steps: Vec<PlanStep>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            goal_id,
            steps,
            created_by: DEFAULT_CREATED_BY.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// One unit of a plan. Embedded in its `LearningPlan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub step_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: StepStatus,
    pub estimated_time: String,
}

impl PlanStep {
    /// A freshly created step. Status is always `pending` at creation.
    pub fn new(
        step_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        estimated_time: impl Into<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            title: title.into(),
            description: description.into(),
            status: StepStatus::Pending,
            estimated_time: estimated_time.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in-progress" | "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("unknown step status: {s}")),
        }
    }
}
