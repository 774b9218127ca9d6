//! Sarco Protocol - Escrow engines for the Sarcophagus dead-man's switch
//!
//! An embalmer escrows a secret with `k` of `n` bonded custodians, who must
//! reveal it after the resurrection time unless the embalmer keeps
//! rewrapping it. This crate holds the protocol state and the engines that
//! move it:
//!
//! - **Registry**: custodian profiles, terms and free bond
//! - **Bonds**: free / cursed balance accounting
//! - **Lifecycle**: create, rewrap and bury
//! - **Publication**: reveals inside the grace period
//! - **Accusal**: slashing for leaks before resurrection
//! - **Cleanup**: slashing for custodians that never reveal
//! - **Fees**: protocol fee on digging fees
//!
//! [`Protocol`] is the service exposing all of them. Every operation is
//! all-or-nothing: a failed call leaves state and balances untouched.

pub mod admin;
pub mod bonds;
pub mod clock;
pub mod config;
pub mod custodian;
pub mod error;
pub mod events;
pub mod fees;
pub mod ledger;
pub mod sarcophagus;
pub mod service;
pub mod storage;
pub mod store;

mod accusal;
mod cleanup;
mod lifecycle;
mod publication;
mod registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use admin::ConfigField;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ProtocolConfig;
pub use custodian::{CustodianProfile, CustodianTerms};
pub use error::{ErrorKind, ProtocolError, Result};
pub use events::ProtocolEvent;
pub use ledger::{LedgerError, MemoryLedger, TokenLedger};
pub use sarcophagus::{
    AccusalOutcome, BondedCustodianRecord, CreateParams, CustodianCommitment, ResourceState,
    RevealMode, Sarcophagus,
};
pub use service::Protocol;
pub use storage::SnapshotStorage;
pub use store::ProtocolState;
