/// UserTask model and database operations
///
/// A UserTask row tracks one user's relationship to one task. Exactly one row
/// may exist per (user, task) pair — the unique constraint is what makes a
/// second `start` fail.
///
/// # State Machine
///
/// ```text
/// (none) → pending → submitted → completed
///                              → rejected
/// pending → completed            (automatic verification)
/// ```
///
/// Completed and Rejected are terminal. A rejected task cannot be restarted:
/// the (user, task) row remains and blocks a new `start`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_task_status AS ENUM ('pending', 'submitted', 'completed', 'rejected');
///
/// CREATE TABLE user_tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     status user_task_status NOT NULL DEFAULT 'pending',
///     points_earned INTEGER,
///     submission_id UUID,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT user_tasks_user_task_unique UNIQUE (user_id, task_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Lifecycle state of a user's task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserTaskStatus {
    /// Task started, no evidence submitted yet
    Pending,

    /// Evidence submitted, awaiting admin review (manual tasks only)
    Submitted,

    /// Verified and points credited
    Completed,

    /// Rejected by an admin; no points credited
    Rejected,
}

impl UserTaskStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserTaskStatus::Pending => "pending",
            UserTaskStatus::Submitted => "submitted",
            UserTaskStatus::Completed => "completed",
            UserTaskStatus::Rejected => "rejected",
        }
    }

    /// Checks if the status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, UserTaskStatus::Completed | UserTaskStatus::Rejected)
    }

    /// Checks if transition to the target status is valid
    pub fn can_transition_to(&self, target: UserTaskStatus) -> bool {
        match (self, target) {
            // Pending can be submitted for review, or completed directly
            // (automatic verification)
            (UserTaskStatus::Pending, UserTaskStatus::Submitted) => true,
            (UserTaskStatus::Pending, UserTaskStatus::Completed) => true,

            // Submitted is resolved by admin review
            (UserTaskStatus::Submitted, UserTaskStatus::Completed) => true,
            (UserTaskStatus::Submitted, UserTaskStatus::Rejected) => true,

            // Terminal states cannot transition
            _ => false,
        }
    }
}

/// UserTask model: one user's lifecycle state for one task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserTask {
    /// Unique row ID
    pub id: Uuid,

    /// The user
    pub user_id: Uuid,

    /// The task
    pub task_id: Uuid,

    /// Current lifecycle status
    pub status: UserTaskStatus,

    /// Points credited; set only when status is Completed
    pub points_earned: Option<i32>,

    /// Linked submission (manual tasks, once evidence is submitted)
    pub submission_id: Option<Uuid>,

    /// When the task was started
    pub created_at: DateTime<Utc>,

    /// When the row was last updated
    pub updated_at: DateTime<Utc>,
}

const USER_TASK_COLUMNS: &str =
    "id, user_id, task_id, status, points_earned, submission_id, created_at, updated_at";

impl UserTask {
    /// Finds a user-task row by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserTask>(&format!(
            "SELECT {USER_TASK_COLUMNS} FROM user_tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds the row for a (user, task) pair
    pub async fn find_by_user_and_task(
        pool: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserTask>(&format!(
            "SELECT {USER_TASK_COLUMNS} FROM user_tasks WHERE user_id = $1 AND task_id = $2"
        ))
        .bind(user_id)
        .bind(task_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists a user's task rows, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserTask>(&format!(
            r#"
            SELECT {USER_TASK_COLUMNS}
            FROM user_tasks
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
