/// Referral link model
///
/// One row per referred user, linking them to their referrer. The
/// `points_awarded` flag gates the referral bonus: the lifecycle engine flips
/// it with an atomic check-then-set so the bonus is credited at most once
/// even under concurrent crediting attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A referrer → referred link
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReferredUser {
    pub id: Uuid,
    pub referrer_id: Uuid,
    /// Unique: a user can be referred by at most one referrer
    pub referred_id: Uuid,
    /// Whether the referral bonus has been credited to the referrer
    pub points_awarded: bool,
    pub created_at: DateTime<Utc>,
}

impl ReferredUser {
    /// Records a referral link
    ///
    /// Fails with a unique violation if the referred user already has a
    /// referrer.
    pub async fn create(
        pool: &PgPool,
        referrer_id: Uuid,
        referred_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ReferredUser>(
            r#"
            INSERT INTO referred_users (referrer_id, referred_id)
            VALUES ($1, $2)
            RETURNING id, referrer_id, referred_id, points_awarded, created_at
            "#,
        )
        .bind(referrer_id)
        .bind(referred_id)
        .fetch_one(pool)
        .await
    }

    /// Finds the referral record for a referred user
    pub async fn find_by_referred(
        pool: &PgPool,
        referred_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReferredUser>(
            r#"
            SELECT id, referrer_id, referred_id, points_awarded, created_at
            FROM referred_users
            WHERE referred_id = $1
            "#,
        )
        .bind(referred_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists users referred by a given referrer
    pub async fn list_by_referrer(
        pool: &PgPool,
        referrer_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReferredUser>(
            r#"
            SELECT id, referrer_id, referred_id, points_awarded, created_at
            FROM referred_users
            WHERE referrer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(referrer_id)
        .fetch_all(pool)
        .await
    }
}
