/// Evidence submission and admin review endpoints
///
/// # Endpoints
///
/// - `POST /v1/user-tasks/:user_task_id/submission` — submit evidence for a
///   manually verified task (creates the submission and flips the user-task
///   to Submitted in one transaction)
/// - `POST /v1/submissions/:submission_id/review` — admin-only approve/reject
///
/// # Example submission request
///
/// ```json
/// {
///   "screenshot_url": "submissions/7f3a/evidence.png",
///   "submission_notes": "Streamed the full playlist, screenshot attached"
/// }
/// ```

use crate::app::{require_admin, AppState};
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use soundtrump_shared::auth::middleware::AuthContext;
use soundtrump_shared::events::{ChangeAction, Topic};
use soundtrump_shared::lifecycle::{self, ReviewDecision, ReviewOutcome};
use soundtrump_shared::models::submission::TaskSubmission;
use uuid::Uuid;
use validator::Validate;

/// Create submission request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    /// Stored path of the screenshot evidence
    #[validate(length(max = 512))]
    pub screenshot_url: Option<String>,

    /// Notes describing how the task was completed
    #[validate(length(min = 1, max = 4000))]
    pub submission_notes: String,
}

/// Create submission response
#[derive(Debug, Serialize)]
pub struct CreateSubmissionResponse {
    pub success: bool,
    pub data: TaskSubmission,
}

/// Review request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewRequest {
    /// approve or reject
    pub decision: ReviewDecision,

    /// Notes shown to the user
    #[validate(length(max = 4000))]
    pub admin_notes: Option<String>,
}

/// Submits evidence for a manual task
///
/// # Errors
///
/// - 404 Not Found if the user-task is missing or owned by someone else
/// - 400 Bad Request if the user-task is not Pending or the task is
///   automatically verified
/// - 422 Unprocessable Entity on validation failure
pub async fn create_submission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_task_id): Path<Uuid>,
    Json(request): Json<CreateSubmissionRequest>,
) -> ApiResult<Json<CreateSubmissionResponse>> {
    request.validate().map_err(ApiError::from)?;

    tracing::info!(
        user_id = %auth.user_id,
        user_task_id = %user_task_id,
        has_screenshot = request.screenshot_url.is_some(),
        "Creating task submission"
    );

    let submission = lifecycle::submit_evidence(
        &state.db,
        auth.user_id,
        user_task_id,
        request.screenshot_url,
        &request.submission_notes,
    )
    .await?;

    state
        .events
        .publish_best_effort(Topic::UserTasks, ChangeAction::Update, user_task_id)
        .await;

    Ok(Json(CreateSubmissionResponse {
        success: true,
        data: submission,
    }))
}

/// Reviews a submission (admin only)
///
/// # Errors
///
/// - 403 Forbidden for non-admin callers
/// - 409 Conflict if the submission was already reviewed
/// - 404 Not Found if the submission is missing
pub async fn review_submission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(submission_id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Json<ReviewOutcome>> {
    require_admin(&auth)?;
    request.validate().map_err(ApiError::from)?;

    tracing::info!(
        reviewer_id = %auth.user_id,
        submission_id = %submission_id,
        decision = ?request.decision,
        "Reviewing submission"
    );

    let outcome = lifecycle::review_submission(
        &state.db,
        auth.user_id,
        submission_id,
        request.decision,
        request.admin_notes.as_deref(),
    )
    .await?;

    state
        .events
        .publish_best_effort(Topic::UserTasks, ChangeAction::Update, outcome.user_task_id)
        .await;
    if outcome.points_awarded > 0 {
        state
            .events
            .publish_best_effort(Topic::Profiles, ChangeAction::Update, outcome.user_id)
            .await;
    }

    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_request_validation() {
        let valid = CreateSubmissionRequest {
            screenshot_url: Some("submissions/abc.png".to_string()),
            submission_notes: "Done, see screenshot".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty_notes = CreateSubmissionRequest {
            screenshot_url: None,
            submission_notes: "".to_string(),
        };
        assert!(empty_notes.validate().is_err());

        let oversized_path = CreateSubmissionRequest {
            screenshot_url: Some("a".repeat(600)),
            submission_notes: "notes".to_string(),
        };
        assert!(oversized_path.validate().is_err());
    }

    #[test]
    fn test_review_request_parses_decisions() {
        let approve: ReviewRequest =
            serde_json::from_str(r#"{"decision":"approve"}"#).unwrap();
        assert_eq!(approve.decision, ReviewDecision::Approve);

        let reject: ReviewRequest =
            serde_json::from_str(r#"{"decision":"reject","admin_notes":"blurry"}"#).unwrap();
        assert_eq!(reject.decision, ReviewDecision::Reject);
        assert_eq!(reject.admin_notes.as_deref(), Some("blurry"));
    }
}
