//! # SoundTrump API Server Library
//!
//! This library provides the core functionality for the SoundTrump API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers
//! - `spotify`: OAuth token broker for the music service

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
pub mod spotify;
