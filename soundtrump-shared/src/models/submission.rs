/// TaskSubmission model
///
/// Evidence a user submits for a manually verified task: an optional
/// screenshot path plus free-form notes. Rows are immutable except for the
/// review fields (`reviewed_at`, `reviewed_by`, `admin_notes`), which are
/// filled in exactly once when an admin resolves the submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Evidence submitted for a manual task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskSubmission {
    /// Unique submission ID
    pub id: Uuid,

    /// The user-task this submission belongs to
    pub user_task_id: Uuid,

    /// Stored path of the screenshot (None if none was attached)
    pub screenshot_path: Option<String>,

    /// Free-form notes from the user
    pub notes: String,

    /// When the evidence was submitted
    pub submitted_at: DateTime<Utc>,

    /// When an admin reviewed the submission (None until reviewed)
    pub reviewed_at: Option<DateTime<Utc>>,

    /// The reviewing admin (None until reviewed)
    pub reviewed_by: Option<Uuid>,

    /// Notes the reviewer left for the user
    pub admin_notes: Option<String>,
}

const SUBMISSION_COLUMNS: &str = "id, user_task_id, screenshot_path, notes, submitted_at, \
     reviewed_at, reviewed_by, admin_notes";

impl TaskSubmission {
    /// Finds a submission by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskSubmission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM task_submissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists submissions awaiting review, oldest first
    pub async fn list_unreviewed(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskSubmission>(&format!(
            r#"
            SELECT {SUBMISSION_COLUMNS}
            FROM task_submissions
            WHERE reviewed_at IS NULL
            ORDER BY submitted_at ASC
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Collects stored screenshot paths for a set of tasks
    ///
    /// Used by the expiration sweeper to delete media before the cascade
    /// removes the rows.
    pub async fn screenshot_paths_for_tasks(
        pool: &PgPool,
        task_ids: &[Uuid],
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT s.screenshot_path
            FROM task_submissions s
            JOIN user_tasks ut ON ut.id = s.user_task_id
            WHERE ut.task_id = ANY($1) AND s.screenshot_path IS NOT NULL
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(path,)| path).collect())
    }
}
