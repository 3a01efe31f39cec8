/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use soundtrump_api::{app::AppState, config::Config};
/// use soundtrump_shared::events::{EventPublisher, RedisConfig};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let events = EventPublisher::connect(RedisConfig { url: config.redis_url.clone() }).await?;
/// let state = AppState::new(pool, events, config);
/// let app = soundtrump_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use soundtrump_shared::auth::{jwt, middleware::AuthContext};
use soundtrump_shared::events::EventPublisher;
use soundtrump_shared::storage::StorageClient;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Uses Arc
/// internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Realtime change-event publisher
    pub events: EventPublisher,

    /// OAuth token broker client
    pub spotify: crate::spotify::SpotifyClient,

    /// Object storage client (admin cleanup endpoint)
    pub storage: StorageClient,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, events: EventPublisher, config: Config) -> Self {
        let spotify = crate::spotify::SpotifyClient::new(config.spotify.clone());
        let storage = StorageClient::new(config.storage.to_storage_config());
        Self {
            db,
            events,
            spotify,
            storage,
            config: Arc::new(config),
        }
    }

    /// Gets the JWT secret for token validation
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/                             # API v1 (JWT authenticated)
///     ├── GET  /tasks                  # Available tasks
///     ├── GET  /tasks/mine             # Caller's user-tasks
///     ├── GET  /task-categories
///     ├── POST /tasks/:id/start
///     ├── POST /tasks/:id/complete     # Automatic verification path
///     ├── POST /user-tasks/:id/submission
///     ├── POST /submissions/:id/review # Admin
///     ├── GET  /profile
///     ├── GET  /leaderboard
///     ├── GET  /rewards
///     ├── GET  /rewards/mine
///     ├── POST /rewards/:id/redeem
///     ├── POST /referrals
///     ├── GET  /referrals/mine
///     ├── POST /spotify/exchange
///     ├── POST /spotify/refresh
///     └── /admin/                      # Admin (role-gated in handlers)
///         ├── POST  /tasks
///         ├── PATCH /tasks/:id
///         ├── POST  /categories
///         ├── GET   /submissions
///         └── POST  /cleanup
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Everything under /v1 requires a valid access token
    let v1_routes = Router::new()
        .route("/tasks", get(routes::tasks::list_tasks))
        .route("/tasks/mine", get(routes::tasks::list_my_tasks))
        .route("/task-categories", get(routes::tasks::list_categories))
        .route("/tasks/:task_id/start", post(routes::tasks::start_task))
        .route("/tasks/:task_id/complete", post(routes::tasks::complete_task))
        .route(
            "/user-tasks/:user_task_id/submission",
            post(routes::submissions::create_submission),
        )
        .route(
            "/submissions/:submission_id/review",
            post(routes::submissions::review_submission),
        )
        .route("/profile", get(routes::profile::get_profile))
        .route("/leaderboard", get(routes::profile::leaderboard))
        .route("/rewards", get(routes::rewards::list_rewards))
        .route("/rewards/mine", get(routes::rewards::list_my_rewards))
        .route("/rewards/:reward_id/redeem", post(routes::rewards::redeem_reward))
        .route("/referrals", post(routes::referrals::apply_referral))
        .route("/referrals/mine", get(routes::referrals::list_my_referrals))
        .route("/spotify/exchange", post(routes::spotify::exchange_token))
        .route("/spotify/refresh", post(routes::spotify::refresh_token))
        .route("/admin/tasks", post(routes::admin::create_task))
        .route("/admin/tasks/:task_id", patch(routes::admin::update_task))
        .route("/admin/categories", post(routes::admin::create_category))
        .route("/admin/submissions", get(routes::admin::list_unreviewed))
        .route("/admin/cleanup", post(routes::admin::run_cleanup))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the Bearer token from the Authorization header,
/// then injects an `AuthContext` into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| crate::error::ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_token(token, state.jwt_secret()).map_err(|e| match e {
        jwt::JwtError::Expired => crate::error::ApiError::Unauthorized("Token expired".to_string()),
        _ => crate::error::ApiError::Unauthorized(format!("Invalid token: {}", e)),
    })?;

    let auth_context = AuthContext::new(claims.sub, claims.role);
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Rejects non-admin callers
///
/// Handlers for admin operations call this first.
pub fn require_admin(auth: &AuthContext) -> Result<(), crate::error::ApiError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(crate::error::ApiError::Forbidden(
            "Admin role required".to_string(),
        ))
    }
}
