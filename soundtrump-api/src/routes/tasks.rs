/// Task catalog and lifecycle endpoints
///
/// # Endpoints
///
/// - `GET  /v1/tasks` — active, unexpired tasks (with derived image URLs)
/// - `GET  /v1/tasks/mine` — the caller's user-task rows
/// - `GET  /v1/task-categories` — catalog categories
/// - `POST /v1/tasks/:task_id/start` — start a task (Pending)
/// - `POST /v1/tasks/:task_id/complete` — automatic-verification completion
///
/// # Authentication
///
/// All endpoints require a Bearer access token.
///
/// # Example complete response
///
/// ```json
/// {
///   "success": true,
///   "message": "Task completed",
///   "points_earned": 50
/// }
/// ```

use crate::app::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use soundtrump_shared::auth::middleware::AuthContext;
use soundtrump_shared::events::{ChangeAction, Topic};
use soundtrump_shared::lifecycle;
use soundtrump_shared::models::task::{Task, TaskCategory};
use soundtrump_shared::models::user_task::UserTask;
use uuid::Uuid;

/// Query parameters for task listing
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    /// Maximum number of tasks to return (default 100)
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// Response for the automatic completion path
///
/// `points_earned` defaults to 0 on deserialization so a payload missing the
/// field reads as "nothing credited" rather than an error.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteTaskResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub points_earned: i32,
}

/// A catalog task with its derived public image URL
#[derive(Debug, Serialize)]
pub struct TaskListing {
    #[serde(flatten)]
    pub task: Task,

    /// Public URL for the task image (None if no image is stored)
    pub image_url: Option<String>,
}

/// Lists tasks currently available to users
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskListing>>> {
    let limit = query.limit.clamp(1, 500);
    let tasks = Task::list_available(&state.db, limit).await?;

    let listings = tasks
        .into_iter()
        .map(|task| {
            let image_url = task
                .image_path
                .as_deref()
                .map(|path| state.storage.public_url(path));
            TaskListing { task, image_url }
        })
        .collect();

    Ok(Json(listings))
}

/// Lists catalog categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TaskCategory>>> {
    let categories = TaskCategory::list(&state.db).await?;
    Ok(Json(categories))
}

/// Lists the caller's user-task rows
pub async fn list_my_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<UserTask>>> {
    let user_tasks = UserTask::list_by_user(&state.db, auth.user_id).await?;
    Ok(Json(user_tasks))
}

/// Starts a task for the caller
///
/// # Errors
///
/// - 409 Conflict if the caller already started this task
/// - 400 Bad Request if the task is inactive or expired
/// - 404 Not Found if the task does not exist
pub async fn start_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<UserTask>> {
    tracing::info!(user_id = %auth.user_id, task_id = %task_id, "Starting task");

    let user_task = lifecycle::start_task(&state.db, auth.user_id, task_id).await?;

    state
        .events
        .publish_best_effort(Topic::UserTasks, ChangeAction::Insert, user_task.id)
        .await;

    Ok(Json(user_task))
}

/// Completes an automatically verified task and credits its points
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<CompleteTaskResponse>> {
    tracing::info!(user_id = %auth.user_id, task_id = %task_id, "Completing task");

    let completed = lifecycle::complete_task(&state.db, auth.user_id, task_id).await?;

    state
        .events
        .publish_best_effort(Topic::UserTasks, ChangeAction::Update, completed.user_task_id)
        .await;
    state
        .events
        .publish_best_effort(Topic::Profiles, ChangeAction::Update, auth.user_id)
        .await;

    Ok(Json(CompleteTaskResponse {
        success: true,
        message: "Task completed".to_string(),
        points_earned: completed.points_earned,
    }))
}
