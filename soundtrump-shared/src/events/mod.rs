/// Realtime change-event publishing
///
/// Clients keep their caches fresh by subscribing to per-entity Redis pub/sub
/// topics; the API publishes a small change event after each committed write.
/// The channel is best-effort and at-least-once — it drives UI cache
/// invalidation only and is never a source of truth, so a failed publish is
/// logged and otherwise ignored.
///
/// # Architecture
///
/// ```text
/// API handler ── commit ──> EventPublisher ── PUBLISH st:{topic} ──> Redis
///                                                                      │
///                                              clients (cache invalidation)
/// ```

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Event layer errors
#[derive(Debug, Error)]
pub enum EventError {
    /// Connection error
    #[error("Redis connection error: {0}")]
    Connection(String),

    /// Publish failure
    #[error("Redis publish error: {0}")]
    Publish(#[from] redis::RedisError),

    /// Configuration error
    #[error("Redis configuration error: {0}")]
    Config(String),
}

/// Entity topics clients can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Tasks,
    UserTasks,
    Profiles,
    UserRewards,
}

impl Topic {
    /// Redis channel name for this topic
    pub fn channel(&self) -> &'static str {
        match self {
            Topic::Tasks => "st:tasks",
            Topic::UserTasks => "st:user_tasks",
            Topic::Profiles => "st:profiles",
            Topic::UserRewards => "st:user_rewards",
        }
    }
}

/// What happened to the row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// A single change event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened
    pub action: ChangeAction,

    /// ID of the affected row
    pub id: Uuid,

    /// When the change was published
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates an event stamped with the current time
    pub fn now(action: ChangeAction, id: Uuid) -> Self {
        Self {
            action,
            id,
            at: Utc::now(),
        }
    }
}

/// Redis configuration for the event publisher
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL, e.g. redis://localhost:6379
    pub url: String,
}

impl RedisConfig {
    /// Loads configuration from the REDIS_URL environment variable
    pub fn from_env() -> Result<Self, EventError> {
        let url = env::var("REDIS_URL")
            .map_err(|_| EventError::Config("REDIS_URL environment variable is required".into()))?;
        Ok(Self { url })
    }
}

/// Publisher for realtime change events
///
/// Cheap to clone; the underlying `ConnectionManager` handles reconnection.
#[derive(Clone)]
pub struct EventPublisher {
    conn: ConnectionManager,
}

impl EventPublisher {
    /// Connects to Redis and returns a publisher
    pub async fn connect(config: RedisConfig) -> Result<Self, EventError> {
        info!("Connecting event publisher to Redis");

        let client =
            Client::open(config.url.as_str()).map_err(|e| EventError::Connection(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| EventError::Connection(e.to_string()))?;

        info!("Event publisher connected");
        Ok(Self { conn })
    }

    /// Publishes a change event to a topic
    ///
    /// # Errors
    ///
    /// Returns a `Publish` error if the PUBLISH command fails. Most callers
    /// should prefer [`publish_best_effort`](Self::publish_best_effort).
    pub async fn publish(&self, topic: Topic, event: &ChangeEvent) -> Result<(), EventError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| EventError::Config(format!("event serialization failed: {}", e)))?;

        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(topic.channel(), payload).await?;

        debug!(topic = topic.channel(), receivers, "Published change event");
        Ok(())
    }

    /// Publishes a change event, swallowing failures
    ///
    /// The realtime stream is UI plumbing; correctness never depends on a
    /// publish landing, so failures are logged at warn and dropped.
    pub async fn publish_best_effort(&self, topic: Topic, action: ChangeAction, id: Uuid) {
        let event = ChangeEvent::now(action, id);
        if let Err(e) = self.publish(topic, &event).await {
            warn!(topic = topic.channel(), error = %e, "Failed to publish change event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_channels_are_distinct() {
        let channels = [
            Topic::Tasks.channel(),
            Topic::UserTasks.channel(),
            Topic::Profiles.channel(),
            Topic::UserRewards.channel(),
        ];
        for (i, a) in channels.iter().enumerate() {
            for b in channels.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_change_event_payload_shape() {
        let id = Uuid::new_v4();
        let event = ChangeEvent::now(ChangeAction::Update, id);
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();

        assert_eq!(json["action"], "update");
        assert_eq!(json["id"], id.to_string());
        assert!(json["at"].is_string());
    }

    #[test]
    fn test_config_from_env_missing() {
        // Only exercise the error path; setting env vars in tests races with
        // other tests in the same process.
        if env::var("REDIS_URL").is_err() {
            assert!(matches!(RedisConfig::from_env(), Err(EventError::Config(_))));
        }
    }
}
