/// Task lifecycle engine
///
/// This module owns the state machine governing a user's relationship to a
/// task and every point-balance mutation that follows from it:
///
/// ```text
/// start ──> pending ──submit──> submitted ──approve──> completed (+points)
///              │                     └──────reject───> rejected
///              └──────complete (automatic)───────────> completed (+points)
/// ```
///
/// All multi-step mutations run inside a single database transaction, so a
/// status transition and its balance credit either both happen or neither
/// does. Concurrent operations on the same row serialize on `SELECT ... FOR
/// UPDATE` plus conditional status updates, which is what makes every award
/// at-most-once.
///
/// The engine takes a `&PgPool` per call; it holds no state of its own and
/// does not know about HTTP or the realtime event stream.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::submission::TaskSubmission;
use crate::models::task::{Task, VerificationType};
use crate::models::user_task::{UserTask, UserTaskStatus};
use crate::storage::StorageClient;

/// Points credited to a referrer when their referral is accepted
pub const REFERRAL_BONUS_POINTS: i64 = 10;

/// Lifecycle engine errors
///
/// Precondition violations carry human-readable messages and are surfaced to
/// the caller without retry.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// A user-task row already exists for this (user, task) pair
    #[error("task already started")]
    AlreadyStarted,

    /// The submission (or its user-task) is already in a terminal state
    #[error("submission has already been reviewed")]
    AlreadyReviewed,

    /// The task is inactive or past its expiry
    #[error("task is not available")]
    TaskUnavailable,

    /// The referenced row does not exist (or is not visible to the caller)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The operation is not valid from the row's current state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Redemption would drive the balance negative
    #[error("insufficient points")]
    InsufficientPoints,

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Review decision for a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Result of the automatic completion path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTask {
    /// The user-task that was completed
    pub user_task_id: Uuid,

    /// Points credited to the user's balance
    pub points_earned: i32,
}

/// Result of an admin review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    /// The reviewed user-task
    pub user_task_id: Uuid,

    /// The user who owns the task
    pub user_id: Uuid,

    /// The decision that was applied
    pub decision: ReviewDecision,

    /// Points credited (0 on reject)
    pub points_awarded: i32,
}

/// Result of an expiration sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Expired tasks deleted
    pub tasks_removed: u64,

    /// Storage objects successfully deleted
    pub files_deleted: u64,
}

/// Starts a task for a user
///
/// Preconditions: the task exists, is active, and has not expired; no
/// user-task row exists yet for this (user, task) pair. The availability
/// check and the insert share one transaction with the task row locked
/// `FOR SHARE`, so a concurrent deactivation cannot slip between them. The
/// uniqueness constraint — not a racy pre-check — is what rejects a
/// concurrent double start.
///
/// # Errors
///
/// - `NotFound` if the task does not exist
/// - `TaskUnavailable` if the task is inactive or expired
/// - `AlreadyStarted` if a row already exists for this pair
pub async fn start_task(
    pool: &PgPool,
    user_id: Uuid,
    task_id: Uuid,
) -> Result<UserTask, LifecycleError> {
    let mut tx = pool.begin().await?;

    let task = Task::find_by_id_for_share(&mut tx, task_id)
        .await?
        .ok_or(LifecycleError::NotFound("task"))?;

    if !task.is_available(Utc::now()) {
        return Err(LifecycleError::TaskUnavailable);
    }

    let result = sqlx::query_as::<_, UserTask>(
        r#"
        INSERT INTO user_tasks (user_id, task_id)
        VALUES ($1, $2)
        RETURNING id, user_id, task_id, status, points_earned, submission_id,
                  created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(task_id)
    .fetch_one(&mut *tx)
    .await;

    match result {
        Ok(user_task) => {
            tx.commit().await?;
            info!(user_id = %user_id, task_id = %task_id, user_task_id = %user_task.id, "Task started");
            Ok(user_task)
        }
        Err(e) => {
            if is_unique_violation(&e, "user_tasks_user_task_unique") {
                Err(LifecycleError::AlreadyStarted)
            } else {
                Err(e.into())
            }
        }
    }
}

/// Submits evidence for a manually verified task
///
/// Valid only from Pending on a Manual task. The submission insert and the
/// Pending → Submitted transition run in one transaction, so a half-recorded
/// submission cannot exist.
///
/// # Errors
///
/// - `NotFound` if the user-task does not exist or belongs to another user
/// - `InvalidState` if the user-task is not Pending or the task is not
///   manually verified
pub async fn submit_evidence(
    pool: &PgPool,
    user_id: Uuid,
    user_task_id: Uuid,
    screenshot_path: Option<String>,
    notes: &str,
) -> Result<TaskSubmission, LifecycleError> {
    let mut tx = pool.begin().await?;

    let user_task = lock_user_task(&mut tx, user_task_id).await?;

    if user_task.user_id != user_id {
        return Err(LifecycleError::NotFound("user task"));
    }
    if !user_task.status.can_transition_to(UserTaskStatus::Submitted) {
        return Err(LifecycleError::InvalidState(
            "evidence can only be submitted for a pending task",
        ));
    }

    let verification: (VerificationType,) =
        sqlx::query_as("SELECT verification_type FROM tasks WHERE id = $1")
            .bind(user_task.task_id)
            .fetch_one(&mut *tx)
            .await?;

    if verification.0 != VerificationType::Manual {
        return Err(LifecycleError::InvalidState(
            "automatically verified tasks do not take submissions",
        ));
    }

    let submission = sqlx::query_as::<_, TaskSubmission>(
        r#"
        INSERT INTO task_submissions (user_task_id, screenshot_path, notes)
        VALUES ($1, $2, $3)
        RETURNING id, user_task_id, screenshot_path, notes, submitted_at,
                  reviewed_at, reviewed_by, admin_notes
        "#,
    )
    .bind(user_task_id)
    .bind(screenshot_path)
    .bind(notes)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE user_tasks
        SET status = 'submitted', submission_id = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_task_id)
    .bind(submission.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        user_id = %user_id,
        user_task_id = %user_task_id,
        submission_id = %submission.id,
        "Evidence submitted"
    );

    Ok(submission)
}

/// Reviews a submitted task (admin operation)
///
/// Transitions Submitted → Completed (approve) or Rejected (reject). On
/// approval the task's points are credited to the user in the same
/// transaction, so the award happens exactly once. Reviewer identity and
/// timestamp are recorded on the submission.
///
/// # Errors
///
/// - `NotFound` if the submission or its user-task is missing
/// - `AlreadyReviewed` if the submission was already resolved
/// - `InvalidState` if the user-task is not in Submitted
pub async fn review_submission(
    pool: &PgPool,
    reviewer_id: Uuid,
    submission_id: Uuid,
    decision: ReviewDecision,
    admin_notes: Option<&str>,
) -> Result<ReviewOutcome, LifecycleError> {
    let mut tx = pool.begin().await?;

    let submission = sqlx::query_as::<_, TaskSubmission>(
        r#"
        SELECT id, user_task_id, screenshot_path, notes, submitted_at,
               reviewed_at, reviewed_by, admin_notes
        FROM task_submissions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(submission_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(LifecycleError::NotFound("submission"))?;

    if submission.reviewed_at.is_some() {
        return Err(LifecycleError::AlreadyReviewed);
    }

    let user_task = lock_user_task(&mut tx, submission.user_task_id).await?;

    match user_task.status {
        UserTaskStatus::Submitted => {}
        status if status.is_terminal() => return Err(LifecycleError::AlreadyReviewed),
        _ => {
            return Err(LifecycleError::InvalidState(
                "user task is not awaiting review",
            ))
        }
    }

    sqlx::query(
        r#"
        UPDATE task_submissions
        SET reviewed_at = NOW(), reviewed_by = $2, admin_notes = $3
        WHERE id = $1
        "#,
    )
    .bind(submission_id)
    .bind(reviewer_id)
    .bind(admin_notes)
    .execute(&mut *tx)
    .await?;

    let points_awarded = match decision {
        ReviewDecision::Approve => {
            let (points,): (i32,) = sqlx::query_as("SELECT points FROM tasks WHERE id = $1")
                .bind(user_task.task_id)
                .fetch_one(&mut *tx)
                .await?;

            let updated = sqlx::query(
                r#"
                UPDATE user_tasks
                SET status = 'completed', points_earned = $2, updated_at = NOW()
                WHERE id = $1 AND status = 'submitted'
                "#,
            )
            .bind(user_task.id)
            .bind(points)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(LifecycleError::AlreadyReviewed);
            }

            credit_points(&mut tx, user_task.user_id, points as i64).await?;
            points
        }
        ReviewDecision::Reject => {
            sqlx::query(
                r#"
                UPDATE user_tasks
                SET status = 'rejected', updated_at = NOW()
                WHERE id = $1 AND status = 'submitted'
                "#,
            )
            .bind(user_task.id)
            .execute(&mut *tx)
            .await?;
            0
        }
    };

    tx.commit().await?;

    info!(
        reviewer_id = %reviewer_id,
        submission_id = %submission_id,
        user_task_id = %user_task.id,
        from_status = user_task.status.as_str(),
        decision = ?decision,
        points_awarded,
        "Submission reviewed"
    );

    Ok(ReviewOutcome {
        user_task_id: user_task.id,
        user_id: user_task.user_id,
        decision,
        points_awarded,
    })
}

/// Completes an automatically verified task and credits its points
///
/// Atomic: the Pending → Completed transition and the balance increment
/// happen in one transaction, or not at all. Concurrent calls for the same
/// (user, task) serialize on the row lock; the conditional update then makes
/// the second caller fail, so the award happens at most once.
///
/// # Errors
///
/// - `NotFound` if the task or the user-task row does not exist
/// - `InvalidState` if the task is manually verified or the user-task is no
///   longer Pending
pub async fn complete_task(
    pool: &PgPool,
    user_id: Uuid,
    task_id: Uuid,
) -> Result<CompletedTask, LifecycleError> {
    let mut tx = pool.begin().await?;

    let task: Option<Task> = sqlx::query_as(
        r#"
        SELECT id, title, description, points, difficulty, verification_type,
               active, image_path, expires_at, category_id, created_at, updated_at
        FROM tasks
        WHERE id = $1
        "#,
    )
    .bind(task_id)
    .fetch_optional(&mut *tx)
    .await?;

    let task = task.ok_or(LifecycleError::NotFound("task"))?;

    if task.verification_type != VerificationType::Automatic {
        return Err(LifecycleError::InvalidState(
            "manually verified tasks are completed through review",
        ));
    }

    let user_task = sqlx::query_as::<_, UserTask>(
        r#"
        SELECT id, user_id, task_id, status, points_earned, submission_id,
               created_at, updated_at
        FROM user_tasks
        WHERE user_id = $1 AND task_id = $2
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(task_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(LifecycleError::NotFound("user task"))?;

    let updated = sqlx::query(
        r#"
        UPDATE user_tasks
        SET status = 'completed', points_earned = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(user_task.id)
    .bind(task.points)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        // Row exists but is past Pending: the award already happened (or the
        // task was rejected).
        return Err(LifecycleError::InvalidState("task is not pending"));
    }

    credit_points(&mut tx, user_id, task.points as i64).await?;

    tx.commit().await?;

    info!(
        user_id = %user_id,
        task_id = %task_id,
        points_earned = task.points,
        "Task completed"
    );

    Ok(CompletedTask {
        user_task_id: user_task.id,
        points_earned: task.points,
    })
}

/// Redeems a reward, atomically checking and decrementing the balance
///
/// The conditional `points >= cost` decrement and the redemption record are
/// one transaction; the balance can never go negative, even under concurrent
/// redemptions.
///
/// # Errors
///
/// - `NotFound` if the reward or profile is missing
/// - `InvalidState` if the reward is inactive
/// - `InsufficientPoints` if the balance does not cover the cost
pub async fn redeem_reward(
    pool: &PgPool,
    user_id: Uuid,
    reward_id: Uuid,
) -> Result<crate::models::reward::UserReward, LifecycleError> {
    let mut tx = pool.begin().await?;

    let reward: Option<(i32, bool)> =
        sqlx::query_as("SELECT cost, active FROM rewards WHERE id = $1")
            .bind(reward_id)
            .fetch_optional(&mut *tx)
            .await?;

    let (cost, active) = reward.ok_or(LifecycleError::NotFound("reward"))?;
    if !active {
        return Err(LifecycleError::InvalidState("reward is not active"));
    }

    let debited = sqlx::query(
        r#"
        UPDATE profiles
        SET points = points - $2, updated_at = NOW()
        WHERE id = $1 AND points >= $2
        "#,
    )
    .bind(user_id)
    .bind(cost as i64)
    .execute(&mut *tx)
    .await?;

    if debited.rows_affected() == 0 {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        return Err(match exists {
            Some(_) => LifecycleError::InsufficientPoints,
            None => LifecycleError::NotFound("profile"),
        });
    }

    let redemption = sqlx::query_as::<_, crate::models::reward::UserReward>(
        r#"
        INSERT INTO user_rewards (user_id, reward_id, points_spent)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, reward_id, points_spent, redeemed_at
        "#,
    )
    .bind(user_id)
    .bind(reward_id)
    .bind(cost)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(user_id = %user_id, reward_id = %reward_id, points_spent = cost, "Reward redeemed");

    Ok(redemption)
}

/// Credits the referral bonus to a referrer, at most once per referred user
///
/// The `points_awarded` flag is flipped with an atomic check-then-set; only
/// the call that wins the flip credits the referrer. Returns whether this
/// call performed the credit.
pub async fn credit_referral(pool: &PgPool, referred_id: Uuid) -> Result<bool, LifecycleError> {
    let mut tx = pool.begin().await?;

    let referrer: Option<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE referred_users
        SET points_awarded = TRUE
        WHERE referred_id = $1 AND points_awarded = FALSE
        RETURNING referrer_id
        "#,
    )
    .bind(referred_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((referrer_id,)) = referrer else {
        // Either no referral record exists or the bonus was already paid.
        tx.commit().await?;
        return Ok(false);
    };

    credit_points(&mut tx, referrer_id, REFERRAL_BONUS_POINTS).await?;

    tx.commit().await?;

    info!(
        referrer_id = %referrer_id,
        referred_id = %referred_id,
        bonus = REFERRAL_BONUS_POINTS,
        "Referral bonus credited"
    );

    Ok(true)
}

/// Deletes expired tasks and their stored media
///
/// Storage objects (task image, every associated submission screenshot) are
/// deleted best-effort first; a storage failure is logged and does not block
/// the row deletion. The row delete cascades to user_tasks and
/// task_submissions.
pub async fn cleanup_expired_tasks(
    pool: &PgPool,
    storage: &StorageClient,
) -> Result<CleanupReport, LifecycleError> {
    let expired: Vec<(Uuid, Option<String>)> = sqlx::query_as(
        "SELECT id, image_path FROM tasks WHERE expires_at IS NOT NULL AND expires_at < NOW()",
    )
    .fetch_all(pool)
    .await?;

    if expired.is_empty() {
        return Ok(CleanupReport::default());
    }

    let task_ids: Vec<Uuid> = expired.iter().map(|(id, _)| *id).collect();

    let mut paths: Vec<String> = expired.into_iter().filter_map(|(_, p)| p).collect();
    paths.extend(TaskSubmission::screenshot_paths_for_tasks(pool, &task_ids).await?);

    let mut files_deleted = 0u64;
    for path in &paths {
        match storage.delete(path).await {
            Ok(()) => files_deleted += 1,
            Err(e) => {
                // Best-effort: the row deletion proceeds regardless.
                warn!(path = %path, error = %e, "Failed to delete storage object");
            }
        }
    }

    let deleted = sqlx::query("DELETE FROM tasks WHERE id = ANY($1)")
        .bind(&task_ids)
        .execute(pool)
        .await?;

    let report = CleanupReport {
        tasks_removed: deleted.rows_affected(),
        files_deleted,
    };

    info!(
        tasks_removed = report.tasks_removed,
        files_deleted = report.files_deleted,
        "Expired task cleanup finished"
    );

    Ok(report)
}

/// Locks a user-task row for the duration of the transaction
async fn lock_user_task(
    tx: &mut Transaction<'_, Postgres>,
    user_task_id: Uuid,
) -> Result<UserTask, LifecycleError> {
    sqlx::query_as::<_, UserTask>(
        r#"
        SELECT id, user_id, task_id, status, points_earned, submission_id,
               created_at, updated_at
        FROM user_tasks
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_task_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(LifecycleError::NotFound("user task"))
}

/// Increments a profile's point balance within a transaction
async fn credit_points(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: i64,
) -> Result<(), LifecycleError> {
    let updated = sqlx::query(
        "UPDATE profiles SET points = points + $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .bind(amount)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(LifecycleError::NotFound("profile"));
    }

    Ok(())
}

/// Checks whether a sqlx error is a unique violation on a named constraint
///
/// Callers mapping database errors to domain errors match on the exact
/// constraint so an unrelated violation (an FK, say) is not misreported.
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(constraint),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_decision_serde() {
        assert_eq!(
            serde_json::to_string(&ReviewDecision::Approve).unwrap(),
            "\"approve\""
        );
        let decision: ReviewDecision = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(decision, ReviewDecision::Reject);
    }

    #[test]
    fn test_error_messages_are_human_readable() {
        assert_eq!(LifecycleError::AlreadyStarted.to_string(), "task already started");
        assert_eq!(
            LifecycleError::AlreadyReviewed.to_string(),
            "submission has already been reviewed"
        );
        assert_eq!(LifecycleError::TaskUnavailable.to_string(), "task is not available");
        assert_eq!(LifecycleError::NotFound("task").to_string(), "task not found");
        assert_eq!(
            LifecycleError::InsufficientPoints.to_string(),
            "insufficient points"
        );
    }

    #[test]
    fn test_cleanup_report_default_is_empty() {
        let report = CleanupReport::default();
        assert_eq!(report.tasks_removed, 0);
        assert_eq!(report.files_deleted, 0);
    }

    // Transactional behavior (double start, concurrent completion, referral
    // idempotency, sweep counts) is covered by the integration tests in
    // soundtrump-api/tests, which run against a live database.
}
