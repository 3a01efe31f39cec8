/// Database models
///
/// This module contains all database models and their CRUD operations:
///
/// - `task`: Reward tasks and task categories (the admin-managed catalog)
/// - `user_task`: Per-(user, task) lifecycle state
/// - `submission`: Evidence submitted for manually verified tasks
/// - `profile`: User profiles and point balances
/// - `reward`: Reward catalog and redemption records
/// - `referral`: Referrer/referred links and bonus bookkeeping
/// - `connected_service`: Stored OAuth tokens for third-party services

pub mod connected_service;
pub mod profile;
pub mod referral;
pub mod reward;
pub mod submission;
pub mod task;
pub mod user_task;
