//! Promptly API - dating profile prompt backend.
//!
//! This crate provides the HTTP service for the Promptly mobile/web client:
//! - Bearer-session authentication against the identity provider
//! - Prompt response and user profile persistence
//! - AI-assisted generation, evaluation, and revision of prompt answers
//!
//! ## Architecture
//!
//! ```text
//! Client → API (auth → validate → handler) → Store (SQLite)
//!                                          → AiService (mock | OpenAI)
//! ```
//!
//! The AI implementation is chosen once at startup from configuration and
//! injected into the router state; route handlers only see the
//! [`ai::AiService`] trait.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod ai;
pub mod auth;
pub mod error;
pub mod routes;
pub mod store;

pub use error::ApiError;

use std::net::SocketAddr;

use promptly_common::config::Config;

/// Start the API server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    let router = routes::build_router(config)?;

    tracing::info!("Starting Promptly API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
