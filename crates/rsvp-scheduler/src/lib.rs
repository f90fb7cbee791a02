//! # RSVP Relay Scheduler
//!
//! The processed-email ledger, the reconciliation loop, and the two run modes.
//!
//! ## Architecture
//! ```text
//! Poller (tokio interval, try_lock guard)
//!   └── Reconciler::run_pass
//!         ├── RowSource::fetch_rows   (sheet snapshot, header dropped)
//!         ├── classify                (row → identity, name, attendance)
//!         ├── Ledger::contains        (skip already-notified)
//!         ├── Dispatcher::notify      (regret | thanks)
//!         └── LedgerStore::save       (only when something new was recorded)
//! ```

pub mod engine;
pub mod ledger;
pub mod reconcile;

#[cfg(test)]
mod test_utils;

pub use engine::{RunMode, SharedReconciler, exit_code, run_once, spawn_poller, try_pass};
pub use ledger::{Ledger, LedgerStore};
pub use reconcile::Reconciler;
