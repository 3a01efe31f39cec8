/// ConnectedService model
///
/// Stores OAuth tokens for a user's connection to a third-party service
/// (currently Spotify). One row per (user, service). Token values are opaque
/// strings and are never logged; the `Debug` impl below redacts them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Service identifier for the music provider
pub const SERVICE_SPOTIFY: &str = "spotify";

/// A user's connection to a third-party service
#[derive(Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConnectedService {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Service identifier, e.g. "spotify"
    pub service: String,
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for ConnectedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tokens are secrets; keep them out of logs and panics.
        f.debug_struct("ConnectedService")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("service", &self.service)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

const CONNECTED_SERVICE_COLUMNS: &str = "id, user_id, service, access_token, refresh_token, \
     expires_at, created_at, updated_at";

impl ConnectedService {
    /// Inserts or replaces the stored tokens for a (user, service) pair
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        service: &str,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ConnectedService>(&format!(
            r#"
            INSERT INTO connected_services (user_id, service, access_token, refresh_token, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT connected_services_user_service_unique
            DO UPDATE SET access_token = EXCLUDED.access_token,
                          refresh_token = EXCLUDED.refresh_token,
                          expires_at = EXCLUDED.expires_at,
                          updated_at = NOW()
            RETURNING {CONNECTED_SERVICE_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(service)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    /// Finds the connection for a (user, service) pair
    pub async fn find(
        pool: &PgPool,
        user_id: Uuid,
        service: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ConnectedService>(&format!(
            "SELECT {CONNECTED_SERVICE_COLUMNS} FROM connected_services \
             WHERE user_id = $1 AND service = $2"
        ))
        .bind(user_id)
        .bind(service)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the connection for a (user, service) pair
    ///
    /// Used when the provider reports the refresh token as revoked
    /// (invalid_grant): the connection is treated as disconnected.
    pub async fn delete(
        pool: &PgPool,
        user_id: Uuid,
        service: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM connected_services WHERE user_id = $1 AND service = $2",
        )
        .bind(user_id)
        .bind(service)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
