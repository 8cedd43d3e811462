//! Plug-and-play Drive authorization middleware for Axum.
//!
//! This module wires the OAuth2/OIDC flow into an Axum application: the
//! consent redirect, the validated callback, and JSON endpoints for the
//! user's files and profile, all backed by an in-memory session store.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use drive_oidc::middleware::{DriveAuthConfig, auth_routes};
//!
//! // 1. Configure from environment
//! let config = DriveAuthConfig::from_env()?;
//!
//! // 2. Mount the routes
//! let app = axum::Router::new().merge(auth_routes(config));
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;

pub use config::DriveAuthConfig;
pub use error::AuthError;
pub use extractor::ActiveSession;
pub use routes::auth_routes;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
