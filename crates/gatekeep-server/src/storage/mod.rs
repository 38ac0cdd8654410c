//! SQLite storage for the Gatekeep server.
//!
//! Provides persistence for devices, queued commands, access logs and
//! occupancy state.

mod models;
mod queries_commands;
mod queries_devices;
mod queries_logs;
mod queries_occupancy;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;

pub use gatekeep_core::db::DatabaseError;
pub use models::*;

gatekeep_core::define_database!(GateDatabase, "Gate database migrations complete");
