//! Seams to the outside world: where rows come from and how mail goes out.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DeliveryReceipt, OutgoingMail, RawRow};

/// A tabular data source holding the RSVP responses.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &str;

    /// Fetch the whole current table, header row included.
    /// An empty or header-only table is `Ok`, not an error.
    async fn fetch_rows(&self) -> Result<Vec<RawRow>>;
}

/// Outbound mail delivery.
#[async_trait]
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one message. `Ok` only when the server accepted it.
    async fn send(&self, mail: &OutgoingMail) -> Result<DeliveryReceipt>;
}
