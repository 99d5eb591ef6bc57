//! # Kiosk Config
//!
//! Configuration management for the kiosk display orchestrator.
//!
//! The orchestrator treats a [`Config`] as a fully-loaded snapshot; only the
//! administration API writes it back to disk.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::{ConfigFormat, ConfigLoader};
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
