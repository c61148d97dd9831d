//! Core types and configuration for the optval engine.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (bars, instrument series, indicator rows)
//! - Contract and pricing input types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
