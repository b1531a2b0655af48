//! Shared types, errors, and configuration for Loanbook.
//!
//! This crate provides common types used across all other crates:
//! - Money and currency types with decimal precision
//! - Typed IDs for type-safe entity references, plus external ids
//! - Application-wide error envelope
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ServicingConfig};
pub use error::{AppError, AppResult};
