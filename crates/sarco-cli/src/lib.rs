//! Sarco CLI - inspect Sarcophagus protocol snapshots
//!
//! Reads the state, ledger and config files written by
//! [`sarco_protocol::SnapshotStorage`] and prints them as text.

pub mod commands;
pub mod render;

pub use commands::{execute, Cli, Commands};
