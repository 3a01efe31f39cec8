/// Reward catalog and redemption endpoints
///
/// # Endpoints
///
/// - `GET  /v1/rewards` — active rewards, cheapest first
/// - `GET  /v1/rewards/mine` — the caller's redemption history
/// - `POST /v1/rewards/:reward_id/redeem` — spend points on a reward
///
/// Redemption delegates to the lifecycle engine, which performs the balance
/// check and decrement atomically; this layer only translates the outcome
/// and publishes change events.

use crate::app::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use soundtrump_shared::auth::middleware::AuthContext;
use soundtrump_shared::events::{ChangeAction, Topic};
use soundtrump_shared::lifecycle;
use soundtrump_shared::models::reward::{Reward, UserReward};
use uuid::Uuid;

/// Redemption response
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub success: bool,
    pub data: UserReward,
}

/// Lists active rewards
pub async fn list_rewards(State(state): State<AppState>) -> ApiResult<Json<Vec<Reward>>> {
    let rewards = Reward::list_active(&state.db).await?;
    Ok(Json(rewards))
}

/// Lists the caller's redemptions, newest first
pub async fn list_my_rewards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<UserReward>>> {
    let redemptions = UserReward::list_by_user(&state.db, auth.user_id).await?;
    Ok(Json(redemptions))
}

/// Redeems a reward for the caller
///
/// # Errors
///
/// - 400 Bad Request if the balance does not cover the cost or the reward is
///   inactive
/// - 404 Not Found if the reward does not exist
pub async fn redeem_reward(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(reward_id): Path<Uuid>,
) -> ApiResult<Json<RedeemResponse>> {
    tracing::info!(user_id = %auth.user_id, reward_id = %reward_id, "Redeeming reward");

    let redemption = lifecycle::redeem_reward(&state.db, auth.user_id, reward_id).await?;

    state
        .events
        .publish_best_effort(Topic::UserRewards, ChangeAction::Insert, redemption.id)
        .await;
    state
        .events
        .publish_best_effort(Topic::Profiles, ChangeAction::Update, auth.user_id)
        .await;

    Ok(Json(RedeemResponse {
        success: true,
        data: redemption,
    }))
}
