use crate::error::Result;
use crate::model::*;
use uuid::Uuid;

/// Record counts across the three collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub users: usize,
    pub goals: usize,
    pub plans: usize,
}

/// Abstract document store for users, goals and plans. SQLite is the
/// shipped implementation.
pub trait StorageBackend: Send + Sync {
    // -- Users --

    /// Insert `user` unless a user with the same identity id already exists,
    /// then return the stored record. Safe to race: the identity id is unique
    /// and a conflicting insert is ignored rather than duplicated.
    fn upsert_user(&self, user: &User) -> impl std::future::Future<Output = Result<User>> + Send;

    fn find_user_by_identity(
        &self,
        identity_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>>> + Send;

    // -- Goals & plans --

    /// Persist a goal and its plan atomically: either both exist afterwards or neither.
    fn save_goal_and_plan(
        &self,
        goal: &LearningGoal,
        plan: &LearningPlan,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn get_goal(&self, id: Uuid) -> impl std::future::Future<Output = Result<LearningGoal>> + Send;

    fn get_plan(&self, id: Uuid) -> impl std::future::Future<Output = Result<LearningPlan>> + Send;

    fn count_records(&self) -> impl std::future::Future<Output = Result<RecordCounts>> + Send;
}
