//! # SoundTrump Worker Library
//!
//! Background jobs for the SoundTrump platform. Currently one job: the
//! expiration sweeper, which periodically deletes expired tasks and their
//! stored media.

pub mod sweeper;
