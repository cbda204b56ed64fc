//! Client-side study schedule generator that needs no model.
//!
//! For every day from today through the exam date it schedules one task for
//! each of the first `min(subjects, ceil(daily_hours / 1.5))` subjects, in
//! input order. Topic, duration and priority are drawn uniformly at random.
//! There is no load balancing and subjects past the per-day cap never get a
//! task.

use chrono::{Duration, NaiveDate, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use uuid::Uuid;

use crate::error::{CerebroError, Result};
use crate::model::*;

pub const MAX_SUBJECTS: usize = 8;
/// Furthest exam date, in days from today, a schedule is generated for.
pub const MAX_PLAN_DAYS: i64 = 366;
pub const DEFAULT_PLAN_NAME: &str = "My Study Plan";

/// Hours of study one subject session is assumed to take.
const HOURS_PER_SESSION: f32 = 1.5;

pub const DURATIONS: [u32; 3] = [45, 60, 90];

pub const SUBJECT_COLORS: [&str; 8] = [
    "#a855f7", "#06b6d4", "#22c55e", "#eab308", "#f97316", "#ec4899", "#8b5cf6", "#14b8a6",
];

const GENERIC_TOPICS: &[&str] = &["Chapter Review", "Practice Problems", "Summary Notes"];

/// Known topics for a subject name, or the generic list for anything else.
pub fn topics_for(subject: &str) -> &'static [&'static str] {
    match subject {
        "Mathematics" => &["Calculus", "Algebra", "Geometry", "Statistics", "Trigonometry"],
        "Physics" => &["Mechanics", "Thermodynamics", "Optics", "Electromagnetism"],
        "Chemistry" => &["Organic", "Inorganic", "Physical Chemistry", "Biochemistry"],
        "Biology" => &["Cell Biology", "Genetics", "Ecology", "Anatomy"],
        "History" => &["Ancient", "Medieval", "Modern", "World Wars"],
        "Literature" => &["Poetry Analysis", "Novel Study", "Drama", "Essays"],
        "Computer" => &["Algorithms", "Data Structures", "Programming", "Databases"],
        _ => GENERIC_TOPICS,
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub name: String,
    pub exam_date: NaiveDate,
    pub subjects: Vec<String>,
    pub daily_hours: f32,
}

/// A generated plan plus the feedback message announcing it.
#[derive(Debug, Clone)]
pub struct GeneratedSchedule {
    pub plan: StudyPlan,
    pub feedback: AiFeedback,
}

/// How many subjects get a task on each day.
pub fn subjects_per_day(subject_count: usize, daily_hours: f32) -> usize {
    let sessions = (daily_hours / HOURS_PER_SESSION).ceil().max(0.0) as usize;
    subject_count.min(sessions)
}

/// Build subject records for the given names: palette colours in order,
/// `ceil(daily_hours * 5)` total hours each.
pub fn build_subjects(names: &[String], daily_hours: f32) -> Vec<Subject> {
    let total_hours = (daily_hours * 5.0).ceil().max(0.0) as u32;
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Subject {
            id: (i + 1).to_string(),
            name: name.clone(),
            color: SUBJECT_COLORS[i % SUBJECT_COLORS.len()].to_string(),
            total_hours,
        })
        .collect()
}

pub fn generate_plan<R: Rng + ?Sized>(
    request: &ScheduleRequest,
    today: NaiveDate,
    rng: &mut R,
) -> Result<GeneratedSchedule> {
    let names: Vec<String> = request
        .subjects
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if names.is_empty() {
        return Err(CerebroError::InvalidInput(
            "at least one subject is required".to_string(),
        ));
    }
    if names.len() > MAX_SUBJECTS {
        return Err(CerebroError::InvalidInput(format!(
            "at most {MAX_SUBJECTS} subjects are supported"
        )));
    }
    if !(request.daily_hours > 0.0) {
        return Err(CerebroError::InvalidInput(
            "daily hours must be positive".to_string(),
        ));
    }
    if request.exam_date < today {
        return Err(CerebroError::InvalidInput(format!(
            "exam date {} is before today ({today})",
            request.exam_date
        )));
    }
    if (request.exam_date - today).num_days() > MAX_PLAN_DAYS {
        return Err(CerebroError::InvalidInput(format!(
            "exam date {} is more than {MAX_PLAN_DAYS} days away",
            request.exam_date
        )));
    }

    let subjects = build_subjects(&names, request.daily_hours);
    let per_day = subjects_per_day(subjects.len(), request.daily_hours);

    let mut tasks = Vec::new();
    let mut next_id = 1usize;
    let mut date = today;
    while date <= request.exam_date {
        for subject in subjects.iter().take(per_day) {
            let topic = topics_for(&subject.name)
                .choose(rng)
                .copied()
                .unwrap_or(GENERIC_TOPICS[0]);
            let duration = DURATIONS.choose(rng).copied().unwrap_or(DURATIONS[1]);
            let priority = Priority::ALL
                .choose(rng)
                .copied()
                .unwrap_or(Priority::Medium);

            tasks.push(StudyTask {
                id: next_id.to_string(),
                subject: subject.name.clone(),
                topic: topic.to_string(),
                duration,
                status: TaskStatus::Pending,
                date,
                priority,
            });
            next_id += 1;
        }
        date += Duration::days(1);
    }

    let name = match request.name.trim() {
        "" => DEFAULT_PLAN_NAME.to_string(),
        n => n.to_string(),
    };

    let feedback = AiFeedback::new(
        Uuid::now_v7().to_string(),
        format!(
            "New study plan created! {} tasks scheduled across {} subjects. Good luck!",
            tasks.len(),
            subjects.len()
        ),
        FeedbackKind::Success,
    );

    tracing::debug!(tasks = tasks.len(), per_day, "generated local schedule");

    Ok(GeneratedSchedule {
        plan: StudyPlan {
            id: Uuid::now_v7().to_string(),
            name,
            exam_date: request.exam_date,
            daily_hours: request.daily_hours,
            subjects,
            tasks,
            created_at: Utc::now(),
        },
        feedback,
    })
}
