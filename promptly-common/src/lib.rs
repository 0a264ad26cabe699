//! Shared types, configuration, and utilities for the Promptly API.
//!
//! This crate holds the pieces that are not tied to HTTP handling:
//! - Configuration loading with environment overrides
//! - The unified error type
//! - Logging initialization

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
