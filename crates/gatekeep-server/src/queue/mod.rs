//! Per-device command queue.
//!
//! Commands are appended unsent and delivered oldest first. The only state
//! change after insertion is the one-way `sent` transition.
//!
//! Delivery is at-least-once in the server's bookkeeping and at-most-once on
//! the wire: once `sent` is committed, a response lost in transit loses the
//! command. Terminals do not acknowledge individual commands.

mod manager;

pub use manager::{CommandQueue, QueueError};
