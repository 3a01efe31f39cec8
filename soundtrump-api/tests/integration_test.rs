/// Integration tests for the SoundTrump API
///
/// These tests verify the full system works end-to-end:
/// - API endpoints with authentication
/// - Task lifecycle (start → submit → review, and the automatic path)
/// - At-most-once point awarding under concurrency
/// - Referral crediting idempotency
/// - Reward redemption balance checks
/// - The expiration sweep
///
/// All tests here require a live Postgres and Redis, so they are ignored by
/// default; run them with `cargo test -- --ignored` in an environment where
/// DATABASE_URL and REDIS_URL point at provisioned services.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::TestContext;
use serde_json::json;
use soundtrump_api::app::{build_router, AppState};
use soundtrump_shared::events::{EventPublisher, RedisConfig};
use soundtrump_shared::lifecycle::{self, LifecycleError};
use soundtrump_shared::models::connected_service::{ConnectedService, SERVICE_SPOTIFY};
use soundtrump_shared::models::reward::Reward;
use soundtrump_shared::models::submission::TaskSubmission;
use soundtrump_shared::models::task::{Task, VerificationType};
use soundtrump_shared::models::user_task::{UserTask, UserTaskStatus};
use soundtrump_shared::storage::StorageClient;
use tower::Service as _;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Starting the same task twice returns 409 on the second attempt
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_double_start_is_conflict() {
    let ctx = TestContext::new().await.unwrap();
    let task = common::create_test_task(&ctx, 50, VerificationType::Automatic, None)
        .await
        .unwrap();

    let start_request = || {
        Request::builder()
            .method("POST")
            .uri(format!("/v1/tasks/{}/start", task.id))
            .header("authorization", ctx.auth_header())
            .body(Body::empty())
            .unwrap()
    };

    let first = ctx.app.clone().call(start_request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = ctx.app.clone().call(start_request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await;
    assert_eq!(body["error"], "conflict");

    Task::delete(&ctx.db, task.id).await.unwrap();
    ctx.cleanup().await.unwrap();
}

/// Concurrent completions of the same task credit the points exactly once
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_concurrent_completion_credits_once() {
    let ctx = TestContext::new().await.unwrap();
    let task = common::create_test_task(&ctx, 50, VerificationType::Automatic, None)
        .await
        .unwrap();

    lifecycle::start_task(&ctx.db, ctx.user.id, task.id)
        .await
        .unwrap();

    let a = lifecycle::complete_task(&ctx.db, ctx.user.id, task.id);
    let b = lifecycle::complete_task(&ctx.db, ctx.user.id, task.id);
    let (ra, rb) = tokio::join!(a, b);

    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one completion must win");

    let loser = if ra.is_err() { ra } else { rb };
    assert!(matches!(
        loser,
        Err(LifecycleError::InvalidState(_))
    ));

    let points = common::balance(&ctx, ctx.user.id).await.unwrap();
    assert_eq!(points, 50);

    Task::delete(&ctx.db, task.id).await.unwrap();
    ctx.cleanup().await.unwrap();
}

/// Inactive and expired tasks cannot be started
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_unavailable_task_cannot_be_started() {
    let ctx = TestContext::new().await.unwrap();

    let expired = common::create_test_task(
        &ctx,
        50,
        VerificationType::Automatic,
        Some(Utc::now() - Duration::hours(1)),
    )
    .await
    .unwrap();

    let result = lifecycle::start_task(&ctx.db, ctx.user.id, expired.id).await;
    assert!(matches!(result, Err(LifecycleError::TaskUnavailable)));

    let inactive = common::create_test_task(&ctx, 50, VerificationType::Automatic, None)
        .await
        .unwrap();
    sqlx::query("UPDATE tasks SET active = FALSE WHERE id = $1")
        .bind(inactive.id)
        .execute(&ctx.db)
        .await
        .unwrap();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/tasks/{}/start", inactive.id))
                .header("authorization", ctx.auth_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Task::delete(&ctx.db, expired.id).await.unwrap();
    Task::delete(&ctx.db, inactive.id).await.unwrap();
    ctx.cleanup().await.unwrap();
}

/// The automatic path: start then complete, points land on the balance
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_automatic_completion_flow() {
    let ctx = TestContext::new().await.unwrap();
    let task = common::create_test_task(&ctx, 50, VerificationType::Automatic, None)
        .await
        .unwrap();

    let start = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/tasks/{}/start", task.id))
                .header("authorization", ctx.auth_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(start.status(), StatusCode::OK);
    let user_task = body_json(start).await;
    assert_eq!(user_task["status"], "pending");

    let complete = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/tasks/{}/complete", task.id))
                .header("authorization", ctx.auth_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(complete.status(), StatusCode::OK);
    let body = body_json(complete).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["points_earned"], 50);

    let points = common::balance(&ctx, ctx.user.id).await.unwrap();
    assert_eq!(points, 50);

    let row = UserTask::find_by_user_and_task(&ctx.db, ctx.user.id, task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, UserTaskStatus::Completed);
    assert_eq!(row.points_earned, Some(50));

    Task::delete(&ctx.db, task.id).await.unwrap();
    ctx.cleanup().await.unwrap();
}

/// The manual path: submit evidence, approve, points credited once
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_manual_review_approval_credits_points() {
    let ctx = TestContext::new().await.unwrap();
    let task = common::create_test_task(&ctx, 80, VerificationType::Manual, None)
        .await
        .unwrap();

    let user_task = lifecycle::start_task(&ctx.db, ctx.user.id, task.id)
        .await
        .unwrap();

    let submit = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/user-tasks/{}/submission", user_task.id))
                .header("authorization", ctx.auth_header())
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"submission_notes": "done, see screenshot"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(submit.status(), StatusCode::OK);
    let submission = body_json(submit).await;
    let submission_id = submission["data"]["id"].as_str().unwrap().to_string();

    let review = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/submissions/{}/review", submission_id))
                .header("authorization", ctx.admin_auth_header())
                .header("content-type", "application/json")
                .body(Body::from(json!({"decision": "approve"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(review.status(), StatusCode::OK);
    let outcome = body_json(review).await;
    assert_eq!(outcome["points_awarded"], 80);

    let points = common::balance(&ctx, ctx.user.id).await.unwrap();
    assert_eq!(points, 80);

    let reviewed = TaskSubmission::find_by_id(&ctx.db, submission_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(reviewed.reviewed_at.is_some());
    assert_eq!(reviewed.reviewed_by, Some(ctx.admin.id));

    let row = UserTask::find_by_id(&ctx.db, user_task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, UserTaskStatus::Completed);

    // A second review of the same submission is a conflict
    let again = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/submissions/{}/review", submission_id))
                .header("authorization", ctx.admin_auth_header())
                .header("content-type", "application/json")
                .body(Body::from(json!({"decision": "approve"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let points = common::balance(&ctx, ctx.user.id).await.unwrap();
    assert_eq!(points, 80, "the second review must not credit again");

    Task::delete(&ctx.db, task.id).await.unwrap();
    ctx.cleanup().await.unwrap();
}

/// Rejection is terminal: no points, and the task cannot be restarted
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_rejection_is_terminal() {
    let ctx = TestContext::new().await.unwrap();
    let task = common::create_test_task(&ctx, 80, VerificationType::Manual, None)
        .await
        .unwrap();

    let user_task = lifecycle::start_task(&ctx.db, ctx.user.id, task.id)
        .await
        .unwrap();
    let submission = lifecycle::submit_evidence(&ctx.db, ctx.user.id, user_task.id, None, "notes")
        .await
        .unwrap();

    let outcome = lifecycle::review_submission(
        &ctx.db,
        ctx.admin.id,
        submission.id,
        lifecycle::ReviewDecision::Reject,
        Some("screenshot missing"),
    )
    .await
    .unwrap();
    assert_eq!(outcome.points_awarded, 0);

    let points = common::balance(&ctx, ctx.user.id).await.unwrap();
    assert_eq!(points, 0);

    // The unique constraint blocks a fresh start after rejection
    let restart = lifecycle::start_task(&ctx.db, ctx.user.id, task.id).await;
    assert!(matches!(restart, Err(LifecycleError::AlreadyStarted)));

    Task::delete(&ctx.db, task.id).await.unwrap();
    ctx.cleanup().await.unwrap();
}

/// The referral bonus is credited to the referrer at most once
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_referral_credit_is_idempotent() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri("/v1/referrals")
                .header("authorization", ctx.auth_header())
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"referral_code": ctx.admin.referral_code}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["bonus_credited"], true);

    let referrer_points = common::balance(&ctx, ctx.admin.id).await.unwrap();
    assert_eq!(referrer_points, lifecycle::REFERRAL_BONUS_POINTS);

    // A direct second crediting attempt is a no-op
    let credited_again = lifecycle::credit_referral(&ctx.db, ctx.user.id).await.unwrap();
    assert!(!credited_again);
    let referrer_points = common::balance(&ctx, ctx.admin.id).await.unwrap();
    assert_eq!(referrer_points, lifecycle::REFERRAL_BONUS_POINTS);

    // Naming a second referrer is a conflict
    let again = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri("/v1/referrals")
                .header("authorization", ctx.auth_header())
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"referral_code": ctx.admin.referral_code}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);

    ctx.cleanup().await.unwrap();
}

/// Self-referral is rejected
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_self_referral_rejected() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri("/v1/referrals")
                .header("authorization", ctx.auth_header())
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"referral_code": ctx.user.referral_code}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

/// Redemption fails without enough points and never drives the balance negative
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_redemption_checks_balance() {
    let ctx = TestContext::new().await.unwrap();

    let (reward_id,): (uuid::Uuid,) = sqlx::query_as(
        "INSERT INTO rewards (name, description, cost) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("test-reward-{}", uuid::Uuid::new_v4()))
    .bind("integration test reward")
    .bind(100)
    .fetch_one(&ctx.db)
    .await
    .unwrap();

    let reward = Reward::find_by_id(&ctx.db, reward_id).await.unwrap().unwrap();
    assert_eq!(reward.cost, 100);

    // Balance is 0; redemption must fail
    let result = lifecycle::redeem_reward(&ctx.db, ctx.user.id, reward_id).await;
    assert!(matches!(result, Err(LifecycleError::InsufficientPoints)));
    assert_eq!(common::balance(&ctx, ctx.user.id).await.unwrap(), 0);

    // Fund the balance, then redeem through the API
    sqlx::query("UPDATE profiles SET points = 150 WHERE id = $1")
        .bind(ctx.user.id)
        .execute(&ctx.db)
        .await
        .unwrap();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/rewards/{}/redeem", reward_id))
                .header("authorization", ctx.auth_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["points_spent"], 100);

    assert_eq!(common::balance(&ctx, ctx.user.id).await.unwrap(), 50);

    sqlx::query("DELETE FROM rewards WHERE id = $1")
        .bind(reward_id)
        .execute(&ctx.db)
        .await
        .unwrap();
    ctx.cleanup().await.unwrap();
}

/// The sweep deletes expired tasks and reports what it removed
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_cleanup_removes_expired_tasks() {
    let ctx = TestContext::new().await.unwrap();

    let expired = common::create_test_task(
        &ctx,
        50,
        VerificationType::Automatic,
        Some(Utc::now() - Duration::hours(2)),
    )
    .await
    .unwrap();
    let live = common::create_test_task(&ctx, 50, VerificationType::Automatic, None)
        .await
        .unwrap();

    let storage = StorageClient::new(ctx.config.storage.to_storage_config());
    let report = lifecycle::cleanup_expired_tasks(&ctx.db, &storage)
        .await
        .unwrap();
    assert!(report.tasks_removed >= 1);

    assert!(Task::find_by_id(&ctx.db, expired.id).await.unwrap().is_none());
    assert!(Task::find_by_id(&ctx.db, live.id).await.unwrap().is_some());

    Task::delete(&ctx.db, live.id).await.unwrap();
    ctx.cleanup().await.unwrap();
}

/// Requests without a token are rejected, and non-admins cannot review
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_auth_and_role_gating() {
    let ctx = TestContext::new().await.unwrap();

    let unauthenticated = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("GET")
                .uri("/v1/tasks")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

    let non_admin_review = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/submissions/{}/review", uuid::Uuid::new_v4()))
                .header("authorization", ctx.auth_header())
                .header("content-type", "application/json")
                .body(Body::from(json!({"decision": "approve"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(non_admin_review.status(), StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

/// A start racing an admin deactivation sees the deactivated task
///
/// The admin edit holds the task row when the start arrives; the start's
/// shared lock makes it wait, and once the edit commits the start must see
/// `active = FALSE` and leave no pending row behind.
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_start_blocked_by_concurrent_deactivation() {
    let ctx = TestContext::new().await.unwrap();
    let task = common::create_test_task(&ctx, 50, VerificationType::Automatic, None)
        .await
        .unwrap();

    let mut admin_tx = ctx.db.begin().await.unwrap();
    sqlx::query("UPDATE tasks SET active = FALSE WHERE id = $1")
        .bind(task.id)
        .execute(&mut *admin_tx)
        .await
        .unwrap();

    let db = ctx.db.clone();
    let (user_id, task_id) = (ctx.user.id, task.id);
    let start = tokio::spawn(async move { lifecycle::start_task(&db, user_id, task_id).await });

    // Let the start reach the row lock before the edit commits.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    admin_tx.commit().await.unwrap();

    let result = start.await.unwrap();
    assert!(matches!(result, Err(LifecycleError::TaskUnavailable)));

    let row = UserTask::find_by_user_and_task(&ctx.db, ctx.user.id, task.id)
        .await
        .unwrap();
    assert!(row.is_none(), "no pending row may survive the deactivation");

    Task::delete(&ctx.db, task.id).await.unwrap();
    ctx.cleanup().await.unwrap();
}

/// A refresh rejected with invalid_grant disconnects the stored service
///
/// The provider stand-in always revokes; the handler must delete the
/// connection row and answer 200 with `disconnected: true`.
#[tokio::test]
#[ignore = "requires a provisioned Postgres and Redis"]
async fn test_refresh_with_revoked_token_disconnects() {
    let ctx = TestContext::new().await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let provider = axum::Router::new().route(
        "/api/token",
        axum::routing::post(|| async {
            (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({ "error": "invalid_grant" })),
            )
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, provider).await.ok();
    });

    let mut config = ctx.config.clone();
    config.spotify.token_url = format!("http://{addr}/api/token");
    let events = EventPublisher::connect(RedisConfig {
        url: config.redis_url.clone(),
    })
    .await
    .unwrap();
    let app = build_router(AppState::new(ctx.db.clone(), events, config));

    ConnectedService::upsert(
        &ctx.db,
        ctx.user.id,
        SERVICE_SPOTIFY,
        "stale-access-token",
        "revoked-refresh-token",
        Utc::now() - Duration::hours(1),
    )
    .await
    .unwrap();

    let response = app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri("/v1/spotify/refresh")
                .header("authorization", ctx.auth_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["disconnected"], true);

    let connection = ConnectedService::find(&ctx.db, ctx.user.id, SERVICE_SPOTIFY)
        .await
        .unwrap();
    assert!(connection.is_none(), "revoked connection must be deleted");

    ctx.cleanup().await.unwrap();
}
