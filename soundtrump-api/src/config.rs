/// Configuration management for the API server
///
/// Loads configuration from environment variables into a type-safe struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `JWT_SECRET`: Secret shared with the auth provider (required, >= 32 chars)
/// - `REDIS_URL`: Redis URL for realtime change events (required)
/// - `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET`: OAuth app credentials (required)
/// - `SPOTIFY_TOKEN_URL`: token endpoint override (default: the provider's)
/// - `STORAGE_BASE_URL` / `STORAGE_BUCKET` / `STORAGE_SERVICE_KEY`: object storage (required)
/// - `RUST_LOG`: Log level (default: info)

use serde::{Deserialize, Serialize};
use soundtrump_shared::storage::StorageConfig;
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Redis URL for the event publisher
    pub redis_url: String,

    /// Spotify OAuth app configuration
    pub spotify: SpotifyConfig,

    /// Object storage configuration
    pub storage: StorageSettings,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins ("*" for permissive development mode)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret shared with the auth provider
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Spotify OAuth app configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Token endpoint; tests point this at a local stand-in
    #[serde(default = "default_spotify_token_url")]
    pub token_url: String,
}

/// Spotify's production token endpoint
pub fn default_spotify_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

/// Object storage settings (serializable mirror of `StorageConfig`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub base_url: String,
    pub bucket: String,
    pub service_key: String,
}

impl StorageSettings {
    /// Converts to the shared storage client configuration
    pub fn to_storage_config(&self) -> StorageConfig {
        StorageConfig {
            base_url: self.base_url.clone(),
            bucket: self.bucket.clone(),
            service_key: self.service_key.clone(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or have
    /// invalid values.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let redis_url = env::var("REDIS_URL")
            .map_err(|_| anyhow::anyhow!("REDIS_URL environment variable is required"))?;

        let spotify = SpotifyConfig {
            client_id: env::var("SPOTIFY_CLIENT_ID")
                .map_err(|_| anyhow::anyhow!("SPOTIFY_CLIENT_ID environment variable is required"))?,
            client_secret: env::var("SPOTIFY_CLIENT_SECRET").map_err(|_| {
                anyhow::anyhow!("SPOTIFY_CLIENT_SECRET environment variable is required")
            })?,
            token_url: env::var("SPOTIFY_TOKEN_URL")
                .unwrap_or_else(|_| default_spotify_token_url()),
        };

        let storage = StorageSettings {
            base_url: env::var("STORAGE_BASE_URL")
                .map_err(|_| anyhow::anyhow!("STORAGE_BASE_URL environment variable is required"))?,
            bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "task-media".to_string()),
            service_key: env::var("STORAGE_SERVICE_KEY")
                .map_err(|_| anyhow::anyhow!("STORAGE_SERVICE_KEY environment variable is required"))?,
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            redis_url,
            spotify,
            storage,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
