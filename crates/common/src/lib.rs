//! Shared utilities, configuration, and error handling for ThesisTrack
//!
//! This crate provides common functionality used across the ThesisTrack
//! workflow service:
//! - Configuration management following 12-factor principles
//! - The caller-facing error taxonomy shared by every domain

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
