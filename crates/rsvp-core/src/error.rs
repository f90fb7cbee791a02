//! Error taxonomy shared by every RSVP Relay crate.

use thiserror::Error;

/// All faults the relay can raise.
#[derive(Debug, Error)]
pub enum RsvpError {
    /// Every row-fetch strategy failed. Carries the last underlying cause.
    #[error("Source unavailable after {attempts} attempt(s): {cause}")]
    SourceUnavailable { attempts: usize, cause: String },

    /// The mail transport rejected or errored on one message.
    #[error("Send to {recipient} failed: {cause}")]
    SendFailed {
        recipient: String,
        cause: String,
        /// Protocol-level detail (e.g. SMTP reply code) when the transport has one.
        diagnostic: Option<String>,
    },

    /// The ledger could not be written.
    #[error("Ledger persist failed: {0}")]
    PersistFailed(String),

    /// The ledger could not be read and was treated as empty.
    #[error("Ledger load degraded: {0}")]
    LoadDegraded(String),

    /// A single Sheets API call failed.
    #[error("Sheets error: {0}")]
    Sheets(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RsvpError {
    /// Protocol diagnostic attached to a send failure, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::SendFailed { diagnostic, .. } => diagnostic.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RsvpError>;
