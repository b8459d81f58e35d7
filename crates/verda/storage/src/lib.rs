//! Verda storage contracts.
//!
//! This crate defines the durable-store interface the accounting core relies
//! on:
//! - one month store holding daily entries and their lifecycle-tracked
//!   monthly summary, with per-key atomic read-modify-write
//! - one official ledger store for the certification-facing dataset
//!
//! Design stance:
//! - every guard-check-and-mutate runs inside a single per-key atomic unit
//! - the in-memory adapter is the deterministic reference; a transactional
//!   backend must honor the same contract

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod traits;

pub use error::{StorageError, StorageResult};
pub use traits::{MonthStore, OfficialLedgerStore, VerdaStorage};
