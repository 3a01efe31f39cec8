/// Referral endpoints
///
/// # Endpoints
///
/// - `POST /v1/referrals` — the caller names who referred them by code. The
///   link is recorded and the referrer's bonus is credited in the same
///   request; the lifecycle engine's check-then-set keeps the bonus
///   at-most-once even if the request is replayed.
/// - `GET  /v1/referrals/mine` — users the caller has referred
///
/// # Example request
///
/// ```json
/// { "referral_code": "K7KQZP2M" }
/// ```

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use soundtrump_shared::auth::middleware::AuthContext;
use soundtrump_shared::events::{ChangeAction, Topic};
use soundtrump_shared::lifecycle;
use soundtrump_shared::models::profile::Profile;
use soundtrump_shared::models::referral::ReferredUser;
use validator::Validate;

/// Apply-referral request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyReferralRequest {
    /// Referral code of the referrer
    #[validate(length(min = 1, max = 16))]
    pub referral_code: String,
}

/// Apply-referral response
#[derive(Debug, Serialize)]
pub struct ApplyReferralResponse {
    pub success: bool,

    /// Whether this request credited the referrer's bonus
    pub bonus_credited: bool,
}

/// Records who referred the caller and credits the referrer
///
/// # Errors
///
/// - 404 Not Found if the code matches no profile
/// - 400 Bad Request on self-referral
/// - 409 Conflict if the caller already has a referrer
pub async fn apply_referral(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ApplyReferralRequest>,
) -> ApiResult<Json<ApplyReferralResponse>> {
    request.validate().map_err(ApiError::from)?;

    let referrer = Profile::find_by_referral_code(&state.db, &request.referral_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Referral code not found".to_string()))?;

    if referrer.id == auth.user_id {
        return Err(ApiError::BadRequest(
            "You cannot refer yourself".to_string(),
        ));
    }

    // Friendly pre-check; the unique constraint on referred_id is what
    // actually guarantees one referrer per user under races.
    if ReferredUser::find_by_referred(&state.db, auth.user_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "A referrer is already recorded for this user".to_string(),
        ));
    }

    tracing::info!(
        referrer_id = %referrer.id,
        referred_id = %auth.user_id,
        "Applying referral"
    );

    ReferredUser::create(&state.db, referrer.id, auth.user_id)
        .await
        .map_err(|e| {
            if lifecycle::is_unique_violation(&e, "referred_users_referred_unique") {
                ApiError::Conflict("A referrer is already recorded for this user".to_string())
            } else {
                ApiError::from(e)
            }
        })?;

    let bonus_credited = lifecycle::credit_referral(&state.db, auth.user_id).await?;

    if bonus_credited {
        state
            .events
            .publish_best_effort(Topic::Profiles, ChangeAction::Update, referrer.id)
            .await;
    }

    Ok(Json(ApplyReferralResponse {
        success: true,
        bonus_credited,
    }))
}

/// Lists the users the caller has referred
pub async fn list_my_referrals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ReferredUser>>> {
    let referrals = ReferredUser::list_by_referrer(&state.db, auth.user_id).await?;
    Ok(Json(referrals))
}
