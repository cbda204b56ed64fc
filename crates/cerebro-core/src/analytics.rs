//! Progress statistics over a local study plan.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::model::{StudyPlan, TaskStatus};

/// Completed and skipped counts for one week, starting on a Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekBucket {
    pub week_start: NaiveDate,
    pub completed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub name: String,
    pub color: String,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyMinutes {
    pub date: NaiveDate,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub pending: usize,
    pub completed_minutes: u32,
    /// Whole percent, rounded half up.
    pub completion_rate: u32,
    pub weekly: Vec<WeekBucket>,
    pub subjects: Vec<SubjectProgress>,
    /// Completed minutes per day for the seven most recent days with any
    /// completed task, oldest first.
    pub daily: Vec<DailyMinutes>,
}

/// The Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

impl PlanStats {
    pub fn compute(plan: &StudyPlan) -> Self {
        let total = plan.tasks.len();
        let mut completed = 0;
        let mut skipped = 0;
        let mut completed_minutes = 0;
        let mut weeks: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
        let mut days: BTreeMap<NaiveDate, u32> = BTreeMap::new();

        for task in &plan.tasks {
            let bucket = weeks.entry(week_start(task.date)).or_default();
            match task.status {
                TaskStatus::Completed => {
                    completed += 1;
                    completed_minutes += task.duration;
                    bucket.0 += 1;
                    *days.entry(task.date).or_default() += task.duration;
                }
                TaskStatus::Skipped => {
                    skipped += 1;
                    bucket.1 += 1;
                }
                TaskStatus::Pending => {}
            }
        }

        let completion_rate = if total == 0 {
            0
        } else {
            ((completed * 200 + total) / (total * 2)) as u32
        };

        let weekly = weeks
            .into_iter()
            .map(|(week_start, (completed, skipped))| WeekBucket {
                week_start,
                completed,
                skipped,
            })
            .collect();

        let subjects = plan
            .subjects
            .iter()
            .map(|subject| {
                let tasks = plan.tasks.iter().filter(|t| t.subject == subject.name);
                let (done, all) = tasks.fold((0, 0), |(done, all), t| {
                    (done + usize::from(t.status == TaskStatus::Completed), all + 1)
                });
                SubjectProgress {
                    name: subject.name.clone(),
                    color: subject.color.clone(),
                    completed: done,
                    total: all,
                }
            })
            .collect();

        let skip = days.len().saturating_sub(7);
        let daily = days
            .into_iter()
            .skip(skip)
            .map(|(date, minutes)| DailyMinutes { date, minutes })
            .collect();

        Self {
            total,
            completed,
            skipped,
            pending: total - completed - skipped,
            completed_minutes,
            completion_rate,
            weekly,
            subjects,
            daily,
        }
    }
}
