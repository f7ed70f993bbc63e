//! # Backoffice App
//!
//! Application layer - wiring and the command surface handed to the UI.
//!
//! This crate contains:
//! - Commands (presentation → backend bridge)
//! - Application context (dependency injection)
//! - Logging initialisation
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture
//! - Owns every long-lived service; commands only borrow them

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
