//! Core module - shared infrastructure for queryforge
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ProviderKind};
pub use error::{QueryForgeError, Result};
pub use types::*;
