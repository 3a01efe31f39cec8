/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - Test database setup and cleanup
/// - Test profile creation (regular user and admin)
/// - JWT token generation
/// - API client helpers
///
/// Tests using this module run against a live Postgres and Redis and are
/// marked `#[ignore]`; run them with `cargo test -- --ignored` where those
/// services are provisioned.

use soundtrump_api::app::{build_router, AppState};
use soundtrump_api::config::Config;
use soundtrump_shared::auth::jwt::{create_token, Claims};
use soundtrump_shared::events::{EventPublisher, RedisConfig};
use soundtrump_shared::models::profile::{CreateProfile, Profile, UserRole};
use soundtrump_shared::models::task::{CreateTask, Task, TaskDifficulty, VerificationType};
use sqlx::PgPool;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub user: Profile,
    pub admin: Profile,
    pub user_token: String,
    pub admin_token: String,
}

impl TestContext {
    /// Creates a new test context with fresh profiles
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Run migrations (path relative to Cargo.toml, not this file)
        sqlx::migrate!("../migrations").run(&db).await?;

        let events = EventPublisher::connect(RedisConfig {
            url: config.redis_url.clone(),
        })
        .await?;

        let user = Profile::create(
            &db,
            CreateProfile {
                id: Uuid::new_v4(),
                username: format!("test-user-{}", Uuid::new_v4()),
                avatar_url: None,
            },
        )
        .await?;

        let admin = Profile::create(
            &db,
            CreateProfile {
                id: Uuid::new_v4(),
                username: format!("test-admin-{}", Uuid::new_v4()),
                avatar_url: None,
            },
        )
        .await?;
        sqlx::query("UPDATE profiles SET role = 'admin' WHERE id = $1")
            .bind(admin.id)
            .execute(&db)
            .await?;
        let admin = Profile::find_by_id(&db, admin.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("admin profile vanished"))?;
        anyhow::ensure!(admin.is_admin(), "admin role not applied");

        let user_token = create_token(&Claims::new(user.id, UserRole::User), &config.jwt.secret)?;
        let admin_token =
            create_token(&Claims::new(admin.id, UserRole::Admin), &config.jwt.secret)?;

        let state = AppState::new(db.clone(), events, config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            user,
            admin,
            user_token,
            admin_token,
        })
    }

    /// Returns the user's authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.user_token)
    }

    /// Returns the admin's authorization header value
    pub fn admin_auth_header(&self) -> String {
        format!("Bearer {}", self.admin_token)
    }

    /// Cleans up test data
    ///
    /// Deleting the profiles cascades to user_tasks, submissions, referrals,
    /// and connected services. Tasks created by a test are deleted by the
    /// test itself.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM profiles WHERE id = ANY($1)")
            .bind(vec![self.user.id, self.admin.id])
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Helper to create a test task
pub async fn create_test_task(
    ctx: &TestContext,
    points: i32,
    verification_type: VerificationType,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
) -> anyhow::Result<Task> {
    let task = Task::create(
        &ctx.db,
        CreateTask {
            title: format!("test-task-{}", Uuid::new_v4()),
            description: "integration test task".to_string(),
            points,
            difficulty: TaskDifficulty::Easy,
            verification_type,
            image_path: None,
            expires_at,
            category_id: None,
        },
    )
    .await?;

    Ok(task)
}

/// Fetches a profile's current point balance
pub async fn balance(ctx: &TestContext, user_id: Uuid) -> anyhow::Result<i64> {
    let (points,): (i64,) = sqlx::query_as("SELECT points FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_one(&ctx.db)
        .await?;
    Ok(points)
}
