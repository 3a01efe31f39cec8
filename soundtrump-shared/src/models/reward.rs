/// Reward catalog and redemption records
///
/// Rewards are catalog items users spend points on. A redemption creates a
/// `user_rewards` row; the balance check and decrement are performed
/// atomically by the lifecycle engine, never here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A redeemable catalog item
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reward {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Point cost (always positive)
    pub cost: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A redemption record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserReward {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reward_id: Uuid,
    /// Points deducted at redemption time (cost may change later)
    pub points_spent: i32,
    pub redeemed_at: DateTime<Utc>,
}

impl Reward {
    /// Finds a reward by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reward>(
            "SELECT id, name, description, cost, active, created_at FROM rewards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists active rewards, cheapest first
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reward>(
            r#"
            SELECT id, name, description, cost, active, created_at
            FROM rewards
            WHERE active = TRUE
            ORDER BY cost ASC
            "#,
        )
        .fetch_all(pool)
        .await
    }
}

impl UserReward {
    /// Lists a user's redemptions, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserReward>(
            r#"
            SELECT id, user_id, reward_id, points_spent, redeemed_at
            FROM user_rewards
            WHERE user_id = $1
            ORDER BY redeemed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
