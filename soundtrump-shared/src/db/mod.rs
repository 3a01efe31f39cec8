/// Database layer
///
/// Connection pool management and migration running for the SoundTrump
/// PostgreSQL database.

pub mod migrations;
pub mod pool;

pub use pool::{create_pool, health_check, DatabaseConfig};
