/// Profile and leaderboard endpoints
///
/// # Endpoints
///
/// - `GET /v1/profile` — the caller's profile (balance, referral code, role)
/// - `GET /v1/leaderboard` — top profiles by point balance

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use soundtrump_shared::auth::middleware::AuthContext;
use soundtrump_shared::models::profile::Profile;

/// Query parameters for the leaderboard
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// Number of entries to return (default 25)
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    25
}

/// Returns the caller's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Profile>> {
    let profile = Profile::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

/// Returns the top profiles by point balance
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<Vec<Profile>>> {
    let limit = query.limit.clamp(1, 100);
    let profiles = Profile::leaderboard(&state.db, limit).await?;
    Ok(Json(profiles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaderboard_default_limit() {
        let query: LeaderboardQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 25);
    }
}
