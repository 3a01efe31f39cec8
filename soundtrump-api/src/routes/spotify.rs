/// OAuth token broker endpoints
///
/// # Endpoints
///
/// - `POST /v1/spotify/exchange` — trade an authorization code for tokens and
///   store them for the caller
/// - `POST /v1/spotify/refresh` — refresh the caller's stored access token
///
/// Tokens are returned to the client and persisted in `connected_services`;
/// they never appear in logs. A refresh rejected with `invalid_grant` means
/// the provider revoked the grant: the stored connection is deleted and the
/// response reports `disconnected: true` so the client can restart the
/// authorization flow.

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::spotify::SpotifyError;
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soundtrump_shared::auth::middleware::AuthContext;
use soundtrump_shared::models::connected_service::{ConnectedService, SERVICE_SPOTIFY};
use validator::Validate;

/// Code exchange request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExchangeRequest {
    /// Authorization code from the provider's consent redirect
    #[validate(length(min = 1))]
    pub code: String,

    /// Redirect URI the code was issued for
    #[validate(length(min = 1, max = 512))]
    pub redirect_uri: String,
}

/// Successful token response returned to the client
#[derive(Debug, Serialize)]
pub struct TokenBrokerResponse {
    pub success: bool,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Response when a refresh finds the grant revoked
#[derive(Debug, Serialize, Deserialize)]
pub struct DisconnectedResponse {
    pub success: bool,
    pub error: String,
    pub disconnected: bool,
}

/// Refresh handler outcome: fresh tokens or a disconnect notice
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RefreshResponse {
    Refreshed(TokenBrokerResponse),
    Disconnected(DisconnectedResponse),
}

/// Exchanges an authorization code and stores the resulting tokens
///
/// # Errors
///
/// - 400 Bad Request if the provider rejects the code
/// - 502 Bad Gateway on other provider failures
pub async fn exchange_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ExchangeRequest>,
) -> ApiResult<Json<TokenBrokerResponse>> {
    request.validate().map_err(ApiError::from)?;

    tracing::info!(user_id = %auth.user_id, "Exchanging authorization code");

    let tokens = state
        .spotify
        .exchange_code(&request.code, &request.redirect_uri)
        .await?;

    let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
        ApiError::ProviderError("provider response missing refresh token".to_string())
    })?;

    let expires_at = tokens.expires_at(Utc::now());
    ConnectedService::upsert(
        &state.db,
        auth.user_id,
        SERVICE_SPOTIFY,
        &tokens.access_token,
        refresh_token,
        expires_at,
    )
    .await?;

    Ok(Json(TokenBrokerResponse {
        success: true,
        access_token: tokens.access_token,
        expires_at,
    }))
}

/// Refreshes the caller's stored access token
///
/// On `invalid_grant` the stored connection is deleted and the response body
/// carries `disconnected: true` with a 200 status; the client reacts by
/// restarting the authorization flow, not by retrying.
///
/// # Errors
///
/// - 404 Not Found if the caller has no stored connection
/// - 502 Bad Gateway on provider failures other than a revoked grant
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<RefreshResponse>> {
    let connection = ConnectedService::find(&state.db, auth.user_id, SERVICE_SPOTIFY)
        .await?
        .ok_or_else(|| ApiError::NotFound("No Spotify connection found".to_string()))?;

    tracing::info!(user_id = %auth.user_id, "Refreshing access token");

    let tokens = match state.spotify.refresh(&connection.refresh_token).await {
        Ok(tokens) => tokens,
        Err(SpotifyError::InvalidGrant) => {
            tracing::warn!(user_id = %auth.user_id, "Refresh token revoked, disconnecting");
            ConnectedService::delete(&state.db, auth.user_id, SERVICE_SPOTIFY).await?;
            return Ok(Json(RefreshResponse::Disconnected(DisconnectedResponse {
                success: false,
                error: "Spotify connection revoked, please reconnect".to_string(),
                disconnected: true,
            })));
        }
        Err(e) => return Err(e.into()),
    };

    // The provider may rotate the refresh token; keep the old one if not.
    let refresh_token = tokens
        .refresh_token
        .as_deref()
        .unwrap_or(&connection.refresh_token);

    let expires_at = tokens.expires_at(Utc::now());
    ConnectedService::upsert(
        &state.db,
        auth.user_id,
        SERVICE_SPOTIFY,
        &tokens.access_token,
        refresh_token,
        expires_at,
    )
    .await?;

    Ok(Json(RefreshResponse::Refreshed(TokenBrokerResponse {
        success: true,
        access_token: tokens.access_token,
        expires_at,
    })))
}
