//! # RSVP Relay Sheets
//!
//! Row source backed by the Google Sheets v4 REST API.
//!
//! ```text
//! SheetRowSource (RowSource)
//!   ├── NamedTab          "RSVP!A:Z"
//!   ├── DefaultRange      "A:Z"
//!   └── DiscoverFirstTab  spreadsheets.get → "<first tab>!A:Z"
//!         │
//!         └── SheetsClient (SheetApi) ── ServiceAccountAuth (TokenSource)
//! ```

pub mod auth;
pub mod client;
pub mod source;

pub use auth::{ServiceAccountAuth, ServiceAccountKey, TokenSource};
pub use client::SheetsClient;
pub use source::{FetchStrategy, SheetApi, SheetRowSource, a1_range};

use rsvp_core::config::{SheetConfig, expand_path};
use std::sync::Arc;

/// Wire up the production row source from configuration.
pub fn row_source_from_config(config: &SheetConfig) -> SheetRowSource<SheetsClient> {
    let auth = ServiceAccountAuth::new(expand_path(&config.credentials_path))
        .with_p12_email(&config.service_account_email);
    let client = SheetsClient::new(&config.api_base_url, &config.spreadsheet_id, Arc::new(auth));
    SheetRowSource::new(client, &config.tab_name, &config.columns)
}
