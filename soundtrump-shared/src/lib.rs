//! # SoundTrump Shared Library
//!
//! This crate contains shared types, the data layer, and the task lifecycle
//! engine used by both the SoundTrump API server and the expiration sweeper.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `lifecycle`: Task lifecycle engine (start/submit/review/complete, reward
//!   redemption, referral crediting, expiration sweep)
//! - `auth`: Access-token validation and request auth context
//! - `db`: Connection pool and migration runner
//! - `events`: Realtime change-event publishing (Redis pub/sub)
//! - `storage`: Object storage helper (public URLs, best-effort deletes)

pub mod auth;
pub mod db;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod storage;

/// Current version of the SoundTrump shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
