//! ImageVault Common - Shared types and utilities
//!
//! This crate provides the record type, error taxonomy and configuration
//! structures used across all ImageVault components.

pub mod config;
pub mod error;
pub mod types;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use types::ImageRecord;
