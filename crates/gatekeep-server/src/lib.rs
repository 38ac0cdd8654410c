//! Gatekeep Server Library
//!
//! Core functionality for the Gatekeep server:
//! - SQLite storage for devices, commands, access logs, and occupancy
//! - Device tokens and operator authentication
//! - Per-device command queue and the poll dispatcher
//! - Access log ingestion and presence tracking
//! - The axum HTTP surface

pub mod auth;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod queue;
pub mod registry;
pub mod server;
pub mod storage;

pub use error::GateError;
