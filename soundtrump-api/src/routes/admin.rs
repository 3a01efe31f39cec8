/// Admin endpoints: task management and the cleanup trigger
///
/// # Endpoints
///
/// - `POST  /v1/admin/tasks` — create a task
/// - `PATCH /v1/admin/tasks/:task_id` — partial task update
/// - `POST  /v1/admin/categories` — create a catalog category
/// - `GET   /v1/admin/submissions` — submissions awaiting review
/// - `POST  /v1/admin/cleanup` — run the expiration sweep immediately
///
/// Every handler here is role-gated; the scheduled sweep in the worker covers
/// the same ground as `/admin/cleanup` so the manual trigger is only needed
/// when an expiry should take effect before the next tick.

use crate::app::{require_admin, AppState};
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use soundtrump_shared::auth::middleware::AuthContext;
use soundtrump_shared::events::{ChangeAction, Topic};
use soundtrump_shared::lifecycle;
use soundtrump_shared::models::submission::TaskSubmission;
use soundtrump_shared::models::task::{CreateTask, Task, TaskCategory, UpdateTask};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 4000))]
    pub description: String,

    #[validate(range(min = 1))]
    pub points: i32,

    pub difficulty: soundtrump_shared::models::task::TaskDifficulty,

    pub verification_type: soundtrump_shared::models::task::VerificationType,

    #[validate(length(max = 512))]
    pub image_path: Option<String>,

    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,

    pub category_id: Option<Uuid>,
}

/// Partial task update request
///
/// `expires_at` distinguishes "leave unchanged" (field absent) from "clear
/// the expiry" (explicit null) with the double Option.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(max = 4000))]
    pub description: Option<String>,

    #[validate(range(min = 1))]
    pub points: Option<i32>,

    pub active: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<chrono::DateTime<chrono::Utc>>>,
}

/// Maps an explicit JSON null to `Some(None)`; an absent field stays `None`
/// via `#[serde(default)]`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Query parameters for the unreviewed submission list
#[derive(Debug, Deserialize)]
pub struct ListSubmissionsQuery {
    /// Maximum number of submissions to return (default 50)
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Cleanup trigger response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub tasks_removed: u64,
    pub files_deleted: u64,
}

/// Creates a new task (admin only)
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    require_admin(&auth)?;
    request.validate().map_err(ApiError::from)?;

    tracing::info!(admin_id = %auth.user_id, title = %request.title, "Creating task");

    let task = Task::create(
        &state.db,
        CreateTask {
            title: request.title,
            description: request.description,
            points: request.points,
            difficulty: request.difficulty,
            verification_type: request.verification_type,
            image_path: request.image_path,
            expires_at: request.expires_at,
            category_id: request.category_id,
        },
    )
    .await?;

    state
        .events
        .publish_best_effort(Topic::Tasks, ChangeAction::Insert, task.id)
        .await;

    Ok(Json(task))
}

/// Applies a partial update to a task (admin only)
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    require_admin(&auth)?;
    request.validate().map_err(ApiError::from)?;

    tracing::info!(admin_id = %auth.user_id, task_id = %task_id, "Updating task");

    let task = Task::update(
        &state.db,
        task_id,
        UpdateTask {
            title: request.title,
            description: request.description,
            points: request.points,
            active: request.active,
            expires_at: request.expires_at,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    state
        .events
        .publish_best_effort(Topic::Tasks, ChangeAction::Update, task.id)
        .await;

    Ok(Json(task))
}

/// Create category request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(length(max = 4000))]
    pub description: Option<String>,
}

/// Creates a catalog category (admin only)
pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<Json<TaskCategory>> {
    require_admin(&auth)?;
    request.validate().map_err(ApiError::from)?;

    let category =
        TaskCategory::create(&state.db, &request.name, request.description.as_deref()).await?;

    Ok(Json(category))
}

/// Lists submissions awaiting review (admin only)
pub async fn list_unreviewed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListSubmissionsQuery>,
) -> ApiResult<Json<Vec<TaskSubmission>>> {
    require_admin(&auth)?;

    let limit = query.limit.clamp(1, 200);
    let submissions = TaskSubmission::list_unreviewed(&state.db, limit).await?;
    Ok(Json(submissions))
}

/// Runs the expiration sweep immediately (admin only)
pub async fn run_cleanup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CleanupResponse>> {
    require_admin(&auth)?;

    tracing::info!(admin_id = %auth.user_id, "Running expired task cleanup");

    let report = lifecycle::cleanup_expired_tasks(&state.db, &state.storage).await?;

    if report.tasks_removed > 0 {
        // Nil ID marks a bulk change; subscribers refetch the whole catalog.
        state
            .events
            .publish_best_effort(Topic::Tasks, ChangeAction::Delete, Uuid::nil())
            .await;
    }

    Ok(Json(CleanupResponse {
        success: true,
        message: format!("Removed {} expired tasks", report.tasks_removed),
        tasks_removed: report.tasks_removed,
        files_deleted: report.files_deleted,
    }))
}
