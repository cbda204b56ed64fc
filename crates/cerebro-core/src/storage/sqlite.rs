use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::backend::{RecordCounts, StorageBackend};
use crate::error::{CerebroError, Result};
use crate::model::*;

/// SQLite-backed document store for Cerebro users, goals and plans.
///
/// Uses a single `Connection` behind `Arc<Mutex<>>` so it can be shared
/// across async tasks.  All blocking SQLite calls go through
/// [`with_conn`](Self::with_conn) which runs them on the Tokio blocking
/// thread-pool.  Plan steps are stored as an embedded JSON document.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteStorage {
    /// Open (or create) a file-backed SQLite database at `path`.
    ///
    /// Sets WAL journal mode and enables foreign keys, then creates all
    /// tables and indexes if they don't already exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CerebroError::Storage(format!("failed to create database directory: {e}"))
                })?;
            }
        }
        let conn = Connection::open(&path)
            .map_err(|e| CerebroError::Storage(format!("failed to open SQLite database: {e}")))?;

        Self::configure_and_init(conn, path)
    }

    /// Open an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CerebroError::Storage(format!("failed to open in-memory SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn, PathBuf::from(":memory:"))
    }

    /// Return the path this database was opened with (`:memory:` for in-memory).
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── helpers ────────────────────────────────────────────────────────

    fn configure_and_init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| CerebroError::Storage(format!("failed to set WAL mode: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| CerebroError::Storage(format!("failed to enable foreign keys: {e}")))?;

        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        storage.create_tables()?;
        Ok(storage)
    }

    /// Create all tables and indexes (idempotent).
    fn create_tables(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CerebroError::Storage(format!("failed to acquire database lock: {e}")))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                identity_id TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                name TEXT,
                avatar TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS learning_goals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                prompt TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'completed', 'abandoned')),
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS learning_plans (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                goal_id TEXT NOT NULL REFERENCES learning_goals(id),
                steps TEXT NOT NULL DEFAULT '[]',
                created_by TEXT NOT NULL DEFAULT 'system',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_goals_user_id ON learning_goals(user_id);
            CREATE INDEX IF NOT EXISTS idx_plans_user_id ON learning_plans(user_id);
            CREATE INDEX IF NOT EXISTS idx_plans_goal_id ON learning_plans(goal_id);
            ",
        )
        .map_err(|e| CerebroError::Storage(format!("failed to create tables: {e}")))?;

        Ok(())
    }

    /// Run a blocking closure against the SQLite connection on the Tokio
    /// blocking thread-pool.
    pub(crate) async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                CerebroError::Storage(format!("failed to acquire database lock: {e}"))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| CerebroError::Storage(format!("task join error: {e}")))?
    }
}

// ── row mapping ───────────────────────────────────────────────────────

type UserRow = (String, String, String, Option<String>, Option<String>, String);

fn select_user(conn: &Connection, identity_id: &str) -> Result<Option<User>> {
    let row: Option<UserRow> = conn
        .query_row(
            "SELECT id, identity_id, email, name, avatar, created_at
             FROM users WHERE identity_id = ?1",
            params![identity_id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, identity_id, email, name, avatar, created_at)| {
        Ok(User {
            id: parse_uuid(&id)?,
            identity_id,
            email,
            name,
            avatar,
            created_at: parse_time(&created_at)?,
        })
    })
    .transpose()
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| CerebroError::Storage(format!("corrupt id '{s}': {e}")))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CerebroError::Storage(format!("corrupt timestamp '{s}': {e}")))
}

fn count(conn: &Connection, table: &str) -> Result<usize> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(n as usize)
}

impl StorageBackend for SqliteStorage {
    async fn upsert_user(&self, user: &User) -> Result<User> {
        let user = user.clone();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, identity_id, email, name, avatar, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(identity_id) DO NOTHING",
                params![
                    user.id.to_string(),
                    user.identity_id,
                    user.email,
                    user.name,
                    user.avatar,
                    user.created_at.to_rfc3339(),
                ],
            )?;
            if inserted == 1 {
                tracing::info!(identity_id = %user.identity_id, user_id = %user.id, "created user");
            }
            select_user(conn, &user.identity_id)?.ok_or_else(|| {
                CerebroError::Storage(format!(
                    "user {} vanished after upsert",
                    user.identity_id
                ))
            })
        })
        .await
    }

    async fn find_user_by_identity(&self, identity_id: &str) -> Result<Option<User>> {
        let identity_id = identity_id.to_string();
        self.with_conn(move |conn| select_user(conn, &identity_id))
            .await
    }

    async fn save_goal_and_plan(&self, goal: &LearningGoal, plan: &LearningPlan) -> Result<()> {
        let goal = goal.clone();
        let plan = plan.clone();
        self.with_conn(move |conn| {
            let steps = serde_json::to_string(&plan.steps)?;
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO learning_goals (id, user_id, prompt, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    goal.id.to_string(),
                    goal.user_id.to_string(),
                    goal.prompt,
                    goal.status.to_string(),
                    goal.created_at.to_rfc3339(),
                ],
            )?;
            tx.execute(
                "INSERT INTO learning_plans (id, user_id, goal_id, steps, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    plan.id.to_string(),
                    plan.user_id.to_string(),
                    plan.goal_id.to_string(),
                    steps,
                    plan.created_by,
                    plan.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_goal(&self, id: Uuid) -> Result<LearningGoal> {
        self.with_conn(move |conn| {
            let row: Option<(String, String, String, String, String)> = conn
                .query_row(
                    "SELECT id, user_id, prompt, status, created_at
                     FROM learning_goals WHERE id = ?1",
                    params![id.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                )
                .optional()?;

            let (id, user_id, prompt, status, created_at) =
                row.ok_or_else(|| CerebroError::NotFound(format!("goal {id}")))?;

            Ok(LearningGoal {
                id: parse_uuid(&id)?,
                user_id: parse_uuid(&user_id)?,
                prompt,
                status: GoalStatus::from_str(&status).map_err(CerebroError::Storage)?,
                created_at: parse_time(&created_at)?,
            })
        })
        .await
    }

    async fn get_plan(&self, id: Uuid) -> Result<LearningPlan> {
        self.with_conn(move |conn| {
            let row: Option<(String, String, String, String, String, String)> = conn
                .query_row(
                    "SELECT id, user_id, goal_id, steps, created_by, created_at
                     FROM learning_plans WHERE id = ?1",
                    params![id.to_string()],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    },
                )
                .optional()?;

            let (id, user_id, goal_id, steps, created_by, created_at) =
                row.ok_or_else(|| CerebroError::NotFound(format!("plan {id}")))?;

            Ok(LearningPlan {
                id: parse_uuid(&id)?,
                user_id: parse_uuid(&user_id)?,
                goal_id: parse_uuid(&goal_id)?,
                steps: serde_json::from_str(&steps)?,
                created_by,
                created_at: parse_time(&created_at)?,
            })
        })
        .await
    }

    async fn count_records(&self) -> Result<RecordCounts> {
        self.with_conn(|conn| {
            Ok(RecordCounts {
                users: count(conn, "users")?,
                goals: count(conn, "learning_goals")?,
                plans: count(conn, "learning_plans")?,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(identity: &str) -> User {
        User::new(identity.to_string(), format!("{identity}@example.com"))
    }

    #[test]
    fn open_in_memory_creates_tables() {
        let storage = SqliteStorage::open_in_memory().expect("should open in-memory DB");
        assert_eq!(storage.path().to_str().unwrap(), ":memory:");

        let conn = storage.conn.lock().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"learning_goals".to_string()));
        assert!(tables.contains(&"learning_plans".to_string()));
    }

    #[test]
    fn create_tables_is_idempotent() {
        let storage = SqliteStorage::open_in_memory().expect("should open in-memory DB");
        storage.create_tables().expect("idempotent create_tables");
    }

    #[tokio::test]
    async fn upsert_user_creates_once() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let first = storage.upsert_user(&sample_user("sub-1")).await.unwrap();

        // A second, different record for the same identity resolves to the first.
        let second = storage
            .upsert_user(&sample_user("sub-1").with_name(Some("Other".into())))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.name.is_none());
        assert_eq!(storage.count_records().await.unwrap().users, 1);
    }

    #[tokio::test]
    async fn concurrent_first_upserts_do_not_duplicate() {
        let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage.upsert_user(&sample_user("racer")).await.unwrap().id
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(storage.count_records().await.unwrap().users, 1);
    }

    #[tokio::test]
    async fn find_user_by_identity_missing() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert!(storage
            .find_user_by_identity("nobody")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn save_and_load_goal_and_plan() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let user = storage.upsert_user(&sample_user("sub-2")).await.unwrap();
        let goal = LearningGoal::new(user.id, "Learn SQL".into());
        let plan = LearningPlan::new(
            user.id,
            goal.id,
            vec![
                PlanStep::new("1", "Joins", "Inner and outer joins", "1 hour"),
                PlanStep::new("2", "Indexes", "B-trees", "Flexible"),
            ],
        );
        storage.save_goal_and_plan(&goal, &plan).await.unwrap();

        let loaded_goal = storage.get_goal(goal.id).await.unwrap();
        assert_eq!(loaded_goal.prompt, "Learn SQL");
        assert_eq!(loaded_goal.status, GoalStatus::Active);

        let loaded_plan = storage.get_plan(plan.id).await.unwrap();
        assert_eq!(loaded_plan.goal_id, goal.id);
        assert_eq!(loaded_plan.steps, plan.steps);
        assert_eq!(loaded_plan.created_by, "system");
    }

    #[tokio::test]
    async fn failed_plan_insert_rolls_back_goal() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let user = storage.upsert_user(&sample_user("sub-3")).await.unwrap();
        let goal = LearningGoal::new(user.id, "Learn C".into());
        let plan = LearningPlan::new(user.id, goal.id, vec![]);
        storage.save_goal_and_plan(&goal, &plan).await.unwrap();

        // Re-using the plan id with a fresh goal violates the primary key on
        // the second insert; the fresh goal must not survive.
        let orphan = LearningGoal::new(user.id, "Learn Zig".into());
        let clash = LearningPlan {
            goal_id: orphan.id,
            ..plan.clone()
        };
        assert!(storage.save_goal_and_plan(&orphan, &clash).await.is_err());

        let counts = storage.count_records().await.unwrap();
        assert_eq!(counts.goals, 1);
        assert_eq!(counts.plans, 1);
        assert!(matches!(
            storage.get_goal(orphan.id).await,
            Err(CerebroError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn plan_requires_existing_user() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let ghost = Uuid::now_v7();
        let goal = LearningGoal::new(ghost, "Nope".into());
        let plan = LearningPlan::new(ghost, goal.id, vec![]);
        assert!(storage.save_goal_and_plan(&goal, &plan).await.is_err());
    }

    #[tokio::test]
    async fn get_plan_not_found() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let err = storage.get_plan(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, CerebroError::NotFound(_)));
    }

    #[test]
    fn open_file_based_db() {
        let dir = std::env::temp_dir().join(format!("cerebro-test-{}", Uuid::now_v7()));
        let db_path = dir.join("nested").join("test.db");

        let storage = SqliteStorage::open(&db_path).expect("should open file DB");
        assert_eq!(storage.path(), db_path);

        drop(storage);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
