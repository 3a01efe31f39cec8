/// Profile model and database operations
///
/// A profile row exists per authenticated identity (the row ID equals the
/// auth provider's user ID). It carries the point balance, the user's tier
/// and status classification, their role, and a unique referral code.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_tier AS ENUM ('free', 'premium');
/// CREATE TYPE user_status AS ENUM ('normal', 'influencer');
/// CREATE TYPE user_role AS ENUM ('user', 'admin');
///
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY,
///     username VARCHAR(255) NOT NULL,
///     avatar_url VARCHAR(512),
///     points BIGINT NOT NULL DEFAULT 0 CHECK (points >= 0),
///     tier user_tier NOT NULL DEFAULT 'free',
///     status user_status NOT NULL DEFAULT 'normal',
///     role user_role NOT NULL DEFAULT 'user',
///     referral_code VARCHAR(16) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The balance is only ever mutated by the lifecycle engine (task completion,
/// referral crediting, redemption); the CHECK constraint is the last line of
/// defense against a negative balance.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Subscription tier (affects UI, not lifecycle logic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserTier {
    Free,
    Premium,
}

/// Influencer flag (affects UI, not lifecycle logic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Normal,
    Influencer,
}

/// Role used for admin gating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

/// User profile with point balance
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Profile ID (equals the auth provider's user ID)
    pub id: Uuid,

    /// Display name
    pub username: String,

    /// Optional avatar URL
    pub avatar_url: Option<String>,

    /// Current point balance (never negative)
    pub points: i64,

    /// Subscription tier
    pub tier: UserTier,

    /// Influencer status
    pub status: UserStatus,

    /// Role (user or admin)
    pub role: UserRole,

    /// Unique code others use to name this user as their referrer
    pub referral_code: String,

    /// When the profile was created
    pub created_at: DateTime<Utc>,

    /// When the profile was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    /// Auth identity this profile belongs to
    pub id: Uuid,

    /// Display name
    pub username: String,

    /// Optional avatar URL
    pub avatar_url: Option<String>,
}

/// Length of generated referral codes
const REFERRAL_CODE_LEN: usize = 8;

/// Generates a random alphanumeric referral code
pub fn generate_referral_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERRAL_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

const PROFILE_COLUMNS: &str = "id, username, avatar_url, points, tier, status, role, \
     referral_code, created_at, updated_at";

impl Profile {
    /// Creates a new profile with a fresh referral code
    pub async fn create(pool: &PgPool, data: CreateProfile) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (id, username, avatar_url, referral_code)
            VALUES ($1, $2, $3, $4)
            RETURNING {PROFILE_COLUMNS}
            "#,
        ))
        .bind(data.id)
        .bind(data.username)
        .bind(data.avatar_url)
        .bind(generate_referral_code())
        .fetch_one(pool)
        .await
    }

    /// Finds a profile by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a profile by referral code
    pub async fn find_by_referral_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE referral_code = $1"
        ))
        .bind(code)
        .fetch_optional(pool)
        .await
    }

    /// Top profiles by point balance for the leaderboard
    pub async fn leaderboard(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            ORDER BY points DESC, created_at ASC
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// True if this profile may perform admin operations
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
