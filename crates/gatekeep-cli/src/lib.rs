//! Gatekeep CLI Library
//!
//! Operator-side tooling for a Gatekeep server: queue terminal commands,
//! page through access logs, inspect device sync state and occupancy.

pub mod client;
pub mod config;
pub mod device_cmd;
pub mod hash_cmd;
pub mod logs_cmd;
pub mod occupancy_cmd;
pub mod queue_cmd;

pub use client::{ClientError, Credentials, GateClient};
pub use config::CliConfig;
