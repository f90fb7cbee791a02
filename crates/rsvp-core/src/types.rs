//! Domain types shared by every crate.

use serde::Serialize;
use std::fmt;

/// One row exactly as the sheet returned it, cells in column order.
pub type RawRow = Vec<String>;

/// Attendance value that selects the regret template.
pub const DECLINED_SENTINEL: &str = "neither";

/// Normalized recipient email, the ledger's uniqueness key.
///
/// Only constructible through [`RecipientId::normalize`], so an instance is
/// always lower-cased, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    /// Lower-case and trim `raw`. Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A classified sheet row, rebuilt every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RsvpRow {
    /// 1-based sheet row number (header is row 1). Diagnostics only.
    pub row_number: usize,
    pub name: String,
    /// Email as typed in the sheet, for log lines.
    pub raw_email: String,
    /// `None` marks an inert row.
    pub recipient: Option<RecipientId>,
    /// Free text, compared case-insensitively.
    pub attendance: String,
    pub guests: String,
    pub comment: String,
}

impl RsvpRow {
    /// True when the attendance choice is the "declined" sentinel, in any case.
    /// Every other value, blank included, counts as attending.
    pub fn is_declined(&self) -> bool {
        self.attendance.to_lowercase() == DECLINED_SENTINEL
    }
}

/// Per-row result of a pass. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    SkippedDuplicate,
    SkippedNoIdentity,
    SendFailed,
}

/// An inline attachment referenced from the HTML body by content id.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineAttachment {
    pub filename: String,
    pub content_id: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A fully rendered message, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachment: Option<InlineAttachment>,
}

/// What the transport reports back on acceptance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReceipt {
    /// Delivery identifier (the Message-ID for SMTP).
    pub message_id: Option<String>,
    /// Server response line.
    pub response: String,
}

/// Statistics for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub data_rows: usize,
    pub previously_processed: usize,
    pub newly_processed: usize,
    pub skipped_no_identity: usize,
    pub failed: usize,
    pub ledger_size: usize,
    pub persisted: bool,
}

impl PassSummary {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Sent => self.newly_processed += 1,
            Outcome::SkippedDuplicate => self.previously_processed += 1,
            Outcome::SkippedNoIdentity => self.skipped_no_identity += 1,
            Outcome::SendFailed => self.failed += 1,
        }
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "previously processed: {}, newly processed: {}, total processed: {} \
             (rows: {}, no email: {}, failed: {})",
            self.previously_processed,
            self.newly_processed,
            self.ledger_size,
            self.data_rows,
            self.skipped_no_identity,
            self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(attendance: &str) -> RsvpRow {
        RsvpRow {
            row_number: 2,
            name: "Alice".into(),
            raw_email: "a@x.com".into(),
            recipient: RecipientId::normalize("a@x.com"),
            attendance: attendance.into(),
            guests: String::new(),
            comment: String::new(),
        }
    }

    #[test]
    fn test_normalize_lowercases_and_trims() {
        let id = RecipientId::normalize("  Alice@Example.COM \t").unwrap();
        assert_eq!(id.as_str(), "alice@example.com");
    }

    #[test]
    fn test_normalize_blank_is_none() {
        assert!(RecipientId::normalize("").is_none());
        assert!(RecipientId::normalize("   ").is_none());
    }

    #[test]
    fn test_declined_sentinel_any_case() {
        assert!(row("Neither").is_declined());
        assert!(row("NEITHER").is_declined());
        assert!(row("neither").is_declined());
        assert!(!row("Yes").is_declined());
        assert!(!row("").is_declined());
        assert!(!row("neither of us").is_declined());
    }

    #[test]
    fn test_summary_record() {
        let mut summary = PassSummary::default();
        summary.record(Outcome::Sent);
        summary.record(Outcome::Sent);
        summary.record(Outcome::SkippedDuplicate);
        summary.record(Outcome::SkippedNoIdentity);
        summary.record(Outcome::SendFailed);
        assert_eq!(summary.newly_processed, 2);
        assert_eq!(summary.previously_processed, 1);
        assert_eq!(summary.skipped_no_identity, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_recipient_serializes_as_plain_string() {
        let id = RecipientId::normalize("a@x.com").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"a@x.com\"");
    }
}
