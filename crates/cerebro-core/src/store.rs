//! Client application state.
//!
//! An explicit value owned by whoever renders it. Every mutation consumes
//! the old state and returns the new one, so state transitions are plain
//! functions that can be tested without a UI.

use chrono::{Duration, NaiveDate, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::model::*;
use crate::schedule::GeneratedSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Dashboard,
    Plan,
    Create,
    Analytics,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppStore {
    pub current_view: View,
    pub plan: Option<StudyPlan>,
    /// Newest first.
    pub feedback: Vec<AiFeedback>,
    pub streak: u32,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_view(self, view: View) -> Self {
        Self {
            current_view: view,
            ..self
        }
    }

    pub fn set_plan(self, plan: StudyPlan) -> Self {
        Self {
            plan: Some(plan),
            ..self
        }
    }

    /// Set the status of one task. A no-op without a plan or for an unknown id.
    pub fn update_task_status(mut self, task_id: &str, status: TaskStatus) -> Self {
        if let Some(plan) = self.plan.as_mut() {
            if let Some(task) = plan.tasks.iter_mut().find(|t| t.id == task_id) {
                task.status = status;
            }
        }
        self
    }

    pub fn add_feedback(mut self, feedback: AiFeedback) -> Self {
        self.feedback.insert(0, feedback);
        self
    }

    pub fn clear_feedback(self) -> Self {
        Self {
            feedback: Vec::new(),
            ..self
        }
    }

    pub fn set_streak(self, streak: u32) -> Self {
        Self { streak, ..self }
    }

    /// Install a freshly generated schedule, announce it, and return to the dashboard.
    pub fn apply_schedule(self, generated: GeneratedSchedule) -> Self {
        self.set_plan(generated.plan)
            .add_feedback(generated.feedback)
            .set_view(View::Dashboard)
    }

    /// Demo state: four subjects with tasks from three days ago to a week
    /// ahead, a 7-day streak and a few canned feedback messages.
    pub fn sample<R: Rng + ?Sized>(today: NaiveDate, rng: &mut R) -> Self {
        let subjects = vec![
            sample_subject("1", "Mathematics", "#a855f7", 20),
            sample_subject("2", "Physics", "#06b6d4", 15),
            sample_subject("3", "Chemistry", "#22c55e", 12),
            sample_subject("4", "Biology", "#eab308", 10),
        ];

        let mut tasks = Vec::new();
        let mut next_id = 1usize;
        for day in -3i64..=7 {
            let date = today + Duration::days(day);
            for (idx, subject) in subjects.iter().enumerate() {
                if !rng.random_bool(0.7) {
                    continue;
                }
                let topic = sample_topics(&subject.name)
                    .choose(rng)
                    .copied()
                    .unwrap_or("Review");

                let status = if day < 0 {
                    if rng.random_bool(0.8) {
                        TaskStatus::Completed
                    } else {
                        TaskStatus::Skipped
                    }
                } else if day == 0 && idx < 2 {
                    TaskStatus::Completed
                } else {
                    TaskStatus::Pending
                };

                tasks.push(StudyTask {
                    id: next_id.to_string(),
                    subject: subject.name.clone(),
                    topic: topic.to_string(),
                    duration: [30, 45, 60, 90].choose(rng).copied().unwrap_or(60),
                    status,
                    date,
                    priority: Priority::ALL.choose(rng).copied().unwrap_or(Priority::Medium),
                });
                next_id += 1;
            }
        }

        let now = Utc::now();
        let plan = StudyPlan {
            id: "1".to_string(),
            name: "Final Exam Prep".to_string(),
            exam_date: today + Duration::days(14),
            daily_hours: 4.0,
            subjects,
            tasks,
            created_at: now,
        };

        let feedback = vec![
            AiFeedback {
                id: "1".into(),
                message: "Great progress! You've completed 85% of your weekly goals.".into(),
                kind: FeedbackKind::Success,
                timestamp: now,
            },
            AiFeedback {
                id: "2".into(),
                message:
                    "Consider adding more breaks between Physics sessions to improve retention."
                        .into(),
                kind: FeedbackKind::Suggestion,
                timestamp: now - Duration::hours(1),
            },
            AiFeedback {
                id: "3".into(),
                message:
                    "Plan adjusted to reduce burnout. Heavy topics spread across multiple days."
                        .into(),
                kind: FeedbackKind::Info,
                timestamp: now - Duration::hours(2),
            },
        ];

        Self {
            current_view: View::Dashboard,
            plan: Some(plan),
            feedback,
            streak: 7,
        }
    }
}

fn sample_subject(id: &str, name: &str, color: &str, total_hours: u32) -> Subject {
    Subject {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
        total_hours,
    }
}

fn sample_topics(subject: &str) -> &'static [&'static str] {
    match subject {
        "Mathematics" => &["Calculus", "Linear Algebra", "Probability", "Statistics", "Trigonometry"],
        "Physics" => &["Mechanics", "Thermodynamics", "Optics", "Electromagnetism", "Waves"],
        "Chemistry" => &[
            "Organic Chemistry",
            "Inorganic Chemistry",
            "Physical Chemistry",
            "Biochemistry",
        ],
        "Biology" => &["Cell Biology", "Genetics", "Ecology", "Evolution", "Anatomy"],
        _ => &["Review"],
    }
}
