/// OAuth token broker for the Spotify Web API
///
/// Two operations against the provider's token endpoint:
///
/// - `exchange_code`: trades an authorization code for access/refresh tokens
/// - `refresh`: trades a refresh token for a fresh access token
///
/// Provider failures are surfaced immediately and never retried. An
/// `invalid_grant` response is special-cased: it means the grant or refresh
/// token has been revoked, and the caller deletes the stored connection
/// instead of reporting a generic error.
///
/// Token values never appear in logs or error messages.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SpotifyConfig;

/// Token broker errors
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// The provider rejected the grant (revoked/expired code or refresh token)
    #[error("provider rejected the grant")]
    InvalidGrant,

    /// Any other provider-side failure
    #[error("provider error: {0}")]
    Provider(String),

    /// Transport failure reaching the provider
    #[error("request to provider failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Successful token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Absent on refresh responses that keep the old refresh token
    pub refresh_token: Option<String>,

    /// Lifetime of the access token in seconds
    pub expires_in: i64,
}

impl TokenResponse {
    /// Absolute expiry timestamp for the access token
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.expires_in)
    }
}

/// Error payload the provider returns with non-2xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderErrorPayload {
    pub error: String,

    #[serde(default)]
    pub error_description: Option<String>,
}

/// Classifies a provider error body
///
/// `invalid_grant` gets its own variant; everything else is a generic
/// provider error carrying the provider's description (not the tokens).
pub fn classify_provider_error(body: &str) -> SpotifyError {
    match serde_json::from_str::<ProviderErrorPayload>(body) {
        Ok(payload) if payload.error == "invalid_grant" => SpotifyError::InvalidGrant,
        Ok(payload) => SpotifyError::Provider(
            payload
                .error_description
                .unwrap_or(payload.error),
        ),
        Err(_) => SpotifyError::Provider("unrecognized provider response".to_string()),
    }
}

/// Client for the provider's token endpoint
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    config: SpotifyConfig,
}

impl SpotifyClient {
    /// Creates a client against the provider's token endpoint
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Exchanges an authorization code for tokens
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` if the provider rejects the code
    /// - `Provider` for other provider-side failures
    /// - `Transport` if the provider is unreachable
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, SpotifyError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        self.token_request(&params).await
    }

    /// Refreshes an access token
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` if the refresh token has been revoked — the caller
    ///   treats the connection as disconnected
    /// - `Provider` / `Transport` as for `exchange_code`
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, SpotifyError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        self.token_request(&params).await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, SpotifyError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(params)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json::<TokenResponse>().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(classify_provider_error(&body))
        }
    }
}
