//! `Gatekeep` Core Library
//!
//! Shared functionality for `Gatekeep` components:
//! - Server configuration resolution and hierarchy
//! - Wire types for the device and operator HTTP APIs
//! - Command catalog and per-command payload validation
//! - Hardware address and credential id parsing
//! - `SQLite` helpers and tracing setup

pub mod commands;
pub mod config;
pub mod db;
pub mod entry;
pub mod error;
pub mod ids;
pub mod tracing_init;
pub mod wire;

pub use commands::{CommandName, validate_payload};
pub use config::ServerConfig;
pub use entry::EntryType;
pub use error::{Error, Result};
pub use ids::{CredentialId, MacAddress};
