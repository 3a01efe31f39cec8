/// Task model and database operations
///
/// This module provides the Task model representing reward tasks users can
/// complete for points, plus the task categories they are grouped under.
/// Tasks are created and edited by admins and removed by the expiration
/// sweeper once `expires_at` has passed.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_difficulty AS ENUM ('easy', 'medium', 'hard');
/// CREATE TYPE verification_type AS ENUM ('automatic', 'manual');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     points INTEGER NOT NULL CHECK (points > 0),
///     difficulty task_difficulty NOT NULL DEFAULT 'easy',
///     verification_type verification_type NOT NULL DEFAULT 'automatic',
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     image_path VARCHAR(512),
///     expires_at TIMESTAMPTZ,
///     category_id UUID REFERENCES task_categories(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Availability
///
/// A task is *available* (startable by users) only while `active` is true and
/// `expires_at` is either NULL or in the future. The lifecycle engine rejects
/// starts on unavailable tasks with `TaskUnavailable`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Task difficulty shown in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskDifficulty {
    Easy,
    Medium,
    Hard,
}

/// How completion of a task is verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "verification_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VerificationType {
    /// Completion is triggered by a qualifying external signal; points are
    /// credited immediately by `complete_task`
    Automatic,

    /// The user submits evidence which an admin approves or rejects
    Manual,
}

/// Task model representing a reward task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Display title
    pub title: String,

    /// Longer description shown on the task card
    pub description: String,

    /// Points credited on completion (always positive, flat reward)
    pub points: i32,

    /// Difficulty label
    pub difficulty: TaskDifficulty,

    /// Automatic or manual verification
    pub verification_type: VerificationType,

    /// Whether the task is currently enabled
    pub active: bool,

    /// Stored path of the task image (None if no image)
    pub image_path: Option<String>,

    /// When the task expires (None = never); expired tasks are swept
    pub expires_at: Option<DateTime<Utc>>,

    /// Category this task belongs to
    pub category_id: Option<Uuid>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Task category for grouping tasks in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub points: i32,
    pub difficulty: TaskDifficulty,
    pub verification_type: VerificationType,
    pub image_path: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
}

/// Input for updating an existing task
///
/// All fields are optional. Only non-None fields are updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub points: Option<i32>,
    pub active: Option<bool>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

const TASK_COLUMNS: &str = "id, title, description, points, difficulty, verification_type, \
     active, image_path, expires_at, category_id, created_at, updated_at";

impl Task {
    /// Checks whether the task is currently startable
    ///
    /// Available means `active` and not past `expires_at`.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map_or(true, |exp| exp > now)
    }

    /// Creates a new task in the database
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, points, difficulty, verification_type,
                               image_path, expires_at, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.points)
        .bind(data.difficulty)
        .bind(data.verification_type)
        .bind(data.image_path)
        .bind(data.expires_at)
        .bind(data.category_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID under a shared row lock
    ///
    /// Holds the lock until the transaction ends, so a concurrent update to
    /// the row (deactivation, say) cannot land between reading the task and
    /// acting on what was read.
    pub async fn find_by_id_for_share(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR SHARE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Lists tasks currently available to users
    ///
    /// Active tasks that have not expired, newest first.
    pub async fn list_available(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE active = TRUE AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Applies a partial update to a task
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                points = COALESCE($4, points),
                active = COALESCE($5, active),
                expires_at = CASE WHEN $6 THEN $7 ELSE expires_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.points)
        .bind(data.active)
        .bind(data.expires_at.is_some())
        .bind(data.expires_at.flatten())
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task
    ///
    /// Cascade removes the dependent user_tasks and task_submissions rows.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl TaskCategory {
    /// Creates a new category
    pub async fn create(
        pool: &PgPool,
        name: &str,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TaskCategory>(
            r#"
            INSERT INTO task_categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .await
    }

    /// Lists all categories
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskCategory>(
            "SELECT id, name, description, created_at FROM task_categories ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }
}
