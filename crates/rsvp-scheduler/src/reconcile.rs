//! Reconciliation loop — one pass over the sheet against the ledger.
//!
//! ```text
//! Fetching → Classifying → per row: Skipping | Dispatching → Persisting (if dirty) → Idle
//! ```
//!
//! The ledger is loaded once when the reconciler is built and then lives in
//! memory for the rest of the process; every pass reads and extends it.

use rsvp_core::classify;
use rsvp_core::error::Result;
use rsvp_core::traits::RowSource;
use rsvp_core::types::{Outcome, PassSummary, RsvpRow};
use rsvp_mail::Dispatcher;

use crate::ledger::{Ledger, LedgerStore};

pub struct Reconciler {
    source: Box<dyn RowSource>,
    dispatcher: Dispatcher,
    store: LedgerStore,
    ledger: Ledger,
    /// In-memory entries not yet on disk.
    dirty: bool,
    passes: u64,
}

impl Reconciler {
    /// Build a reconciler and load the ledger from `store`.
    pub fn new(source: Box<dyn RowSource>, dispatcher: Dispatcher, store: LedgerStore) -> Self {
        let ledger = store.load();
        Self {
            source,
            dispatcher,
            store,
            ledger,
            dirty: false,
            passes: 0,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Number of passes started so far.
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    /// Run one pass. Only a fetch fault is returned as `Err`; send and
    /// persist faults are logged and reflected in the summary.
    pub async fn run_pass(&mut self) -> Result<PassSummary> {
        self.passes += 1;
        tracing::debug!("🔁 Pass #{} started ({})", self.passes, self.source.name());

        let rows = match self.source.fetch_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("❌ Pass #{} aborted: {e}", self.passes);
                self.flush_if_dirty();
                return Err(e);
            }
        };

        let mut summary = PassSummary::default();
        if rows.len() <= 1 {
            tracing::info!("📭 No data rows found");
            summary.persisted = self.flush_if_dirty();
            summary.ledger_size = self.ledger.len();
            return Ok(summary);
        }

        let data_rows = &rows[1..];
        summary.data_rows = data_rows.len();
        tracing::info!("📊 Found {} data rows in spreadsheet", data_rows.len());
        tracing::info!("📧 Already processed: {} emails", self.ledger.len());

        for (index, raw) in data_rows.iter().enumerate() {
            let row = classify(raw, index);
            let outcome = self.process_row(&row).await;
            summary.record(outcome);
        }

        if summary.newly_processed > 0 {
            tracing::info!("🎉 Done: {} new emails processed", summary.newly_processed);
        } else {
            tracing::info!("ℹ️ No new emails to process");
        }

        summary.persisted = self.flush_if_dirty();
        summary.ledger_size = self.ledger.len();
        tracing::info!("📊 Pass #{}: {summary}", self.passes);
        Ok(summary)
    }

    async fn process_row(&mut self, row: &RsvpRow) -> Outcome {
        let Some(id) = row.recipient.clone() else {
            tracing::info!("➡️ Row {}: No email found, skipping", row.row_number);
            return Outcome::SkippedNoIdentity;
        };

        if self.ledger.contains(&id) {
            tracing::info!("⏭️ Row {}: {} already notified", row.row_number, row.raw_email);
            return Outcome::SkippedDuplicate;
        }

        tracing::info!(
            "🆕 Row {}: new response - {} ({}) - {}",
            row.row_number,
            row.name,
            row.raw_email,
            row.attendance
        );

        match self.dispatcher.notify(row).await {
            Ok(_) => {
                self.ledger.insert(id);
                self.dirty = true;
                Outcome::Sent
            }
            Err(_) => {
                tracing::warn!(
                    "⚠️ Row {}: send to {} failed, will retry next pass",
                    row.row_number,
                    row.raw_email
                );
                Outcome::SendFailed
            }
        }
    }

    /// Persist unflushed entries. Returns whether a write happened.
    fn flush_if_dirty(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        match self.store.save(&self.ledger) {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                tracing::error!("❌ {e}; will retry at the end of the next pass");
                false
            }
        }
    }
}
