//! # RSVP Relay Core
//!
//! Shared vocabulary for the relay crates: the error taxonomy, configuration,
//! domain types, the row classifier and the `RowSource` / `MailTransport`
//! seams that the reconciliation loop is written against.

pub mod classify;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use classify::classify;
pub use config::RsvpConfig;
pub use error::{Result, RsvpError};
pub use traits::{MailTransport, RowSource};
pub use types::{
    DeliveryReceipt, InlineAttachment, Outcome, OutgoingMail, PassSummary, RawRow, RecipientId,
    RsvpRow,
};
