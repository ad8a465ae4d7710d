//! Concurrent transfers between accounts of a shared in-memory ledger.
//!
//! [`TransferEngine`] moves funds between two accounts with all-or-nothing
//! semantics. The [`LockCoordinator`] it relies on takes both account locks
//! without a global lock order and without ever blocking while holding a
//! lock, so transfers racing in opposite directions cannot deadlock.

pub mod account_repository;
pub mod batch;
pub mod config;
pub mod dlq;
pub mod domain;
pub mod engine;
pub mod ingestion;
pub mod lock;
pub mod logging;
pub mod notification;

pub use account_repository::InMemoryAccountRepository;
pub use batch::{BatchRunner, BatchSummary};
pub use domain::{Account, AccountId, Error, ErrorKind, Transfer, TransferError, TransferState};
pub use engine::TransferEngine;
pub use lock::{LockCoordinator, LockSet};
pub use notification::LoggingNotifier;
