//! Core types for the ticker streaming service
//!
//! This crate provides shared types used across all components:
//! - Quote value type
//! - Wire message shapes
//! - Configuration structs
//! - Error types

pub mod config;
pub mod errors;
pub mod messages;
pub mod types;

pub use config::*;
pub use errors::*;
pub use messages::*;
pub use types::*;
