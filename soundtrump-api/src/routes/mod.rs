/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `tasks`: Task catalog and lifecycle operations (start/complete)
/// - `submissions`: Evidence submission and admin review
/// - `profile`: Profile and leaderboard
/// - `rewards`: Reward catalog and redemption
/// - `referrals`: Referral-code application and crediting
/// - `spotify`: OAuth token broker endpoints
/// - `admin`: Task management and the cleanup trigger

pub mod admin;
pub mod health;
pub mod profile;
pub mod referrals;
pub mod rewards;
pub mod spotify;
pub mod submissions;
pub mod tasks;
