//! Shared fakes for the reconciliation and poller tests.

use async_trait::async_trait;
use rsvp_core::error::{Result, RsvpError};
use rsvp_core::traits::{MailTransport, RowSource};
use rsvp_core::types::{DeliveryReceipt, OutgoingMail, RawRow};
use rsvp_mail::{Dispatcher, InlineImage};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::ledger::LedgerStore;
use crate::reconcile::Reconciler;

/// Sheet snapshot the test can rewrite between passes.
#[derive(Clone, Default)]
pub struct FakeSheet {
    pub rows: Arc<Mutex<Vec<RawRow>>>,
    pub unavailable: Arc<AtomicBool>,
    pub fetches: Arc<AtomicUsize>,
}

impl FakeSheet {
    pub fn with_rows(rows: &[&[&str]]) -> Self {
        let sheet = Self::default();
        sheet.set_rows(rows);
        sheet
    }

    pub fn set_rows(&self, rows: &[&[&str]]) {
        *self.rows.lock().unwrap() = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
    }
}

#[async_trait]
impl RowSource for FakeSheet {
    fn name(&self) -> &str {
        "fake-sheet"
    }

    async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RsvpError::SourceUnavailable {
                attempts: 3,
                cause: "quota exceeded".into(),
            });
        }
        Ok(self.rows.lock().unwrap().clone())
    }
}

/// Records every accepted message; rejects recipients in `failing`.
#[derive(Clone, Default)]
pub struct FakeMail {
    pub sent: Arc<Mutex<Vec<OutgoingMail>>>,
    pub failing: Arc<Mutex<HashSet<String>>>,
}

impl FakeMail {
    pub fn fail_for(&self, to: &str) {
        self.failing.lock().unwrap().insert(to.to_string());
    }

    pub fn recover(&self, to: &str) {
        self.failing.lock().unwrap().remove(to);
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailTransport for FakeMail {
    fn name(&self) -> &str {
        "fake-mail"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<DeliveryReceipt> {
        if self.failing.lock().unwrap().contains(&mail.to) {
            return Err(RsvpError::SendFailed {
                recipient: mail.to.clone(),
                cause: "mailbox unavailable".into(),
                diagnostic: Some("550".into()),
            });
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(DeliveryReceipt {
            message_id: Some(format!("<{}@fake>", self.count())),
            response: "250 OK".into(),
        })
    }
}

pub const HEADER: &[&str] = &["Timestamp", "Name", "Email", "Attendance", "Guests", "Comment"];

/// Reconciler over the fakes with its ledger at `dir/processed_emails.json`.
pub fn reconciler(dir: &Path, sheet: &FakeSheet, mail: &FakeMail) -> Reconciler {
    let image = InlineImage::new(dir.join("just.png"), "just_married_image");
    Reconciler::new(
        Box::new(sheet.clone()),
        Dispatcher::new(Box::new(mail.clone()), image),
        LedgerStore::new(dir.join("processed_emails.json")),
    )
}
