//! Fallback-chain row source.
//!
//! Lightweight chain: named tab → default range → discovered first tab.
//! Each strategy either returns rows or a fault; the next one only runs on a
//! fault, and exhaustion reports the last cause.

use async_trait::async_trait;
use rsvp_core::error::{Result, RsvpError};
use rsvp_core::traits::RowSource;
use rsvp_core::types::RawRow;

/// The two spreadsheet reads the fallback chain is built from.
#[async_trait]
pub trait SheetApi: Send + Sync {
    /// Values for an A1 range, row-major.
    async fn values_get(&self, range: &str) -> Result<Vec<RawRow>>;
    /// Title of the first tab in the document.
    async fn first_sheet_title(&self) -> Result<String>;
}

/// One way of locating the RSVP table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// `<configured tab>!<columns>`
    NamedTab,
    /// `<columns>` on whatever tab the API treats as default.
    DefaultRange,
    /// Look up the first tab's title, then `<title>!<columns>`.
    DiscoverFirstTab,
}

impl FetchStrategy {
    /// Default resolution order.
    pub const CHAIN: [FetchStrategy; 3] = [
        FetchStrategy::NamedTab,
        FetchStrategy::DefaultRange,
        FetchStrategy::DiscoverFirstTab,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::NamedTab => "named tab",
            Self::DefaultRange => "default range",
            Self::DiscoverFirstTab => "first tab",
        }
    }
}

/// Build an A1 range for `tab`, quoting the tab name when it needs it.
pub fn a1_range(tab: &str, columns: &str) -> String {
    let plain = !tab.is_empty() && tab.chars().all(|c| c.is_alphanumeric() || c == '_');
    if plain {
        format!("{tab}!{columns}")
    } else {
        format!("'{}'!{columns}", tab.replace('\'', "''"))
    }
}

/// [`RowSource`] over a spreadsheet, trying each [`FetchStrategy`] in turn.
pub struct SheetRowSource<A> {
    api: A,
    tab_name: String,
    columns: String,
    strategies: Vec<FetchStrategy>,
}

impl<A: SheetApi> SheetRowSource<A> {
    pub fn new(api: A, tab_name: &str, columns: &str) -> Self {
        Self {
            api,
            tab_name: tab_name.to_string(),
            columns: columns.to_string(),
            strategies: FetchStrategy::CHAIN.to_vec(),
        }
    }

    /// Replace the resolution order.
    pub fn with_strategies(mut self, strategies: Vec<FetchStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    async fn attempt(&self, strategy: FetchStrategy) -> Result<Vec<RawRow>> {
        match strategy {
            FetchStrategy::NamedTab => {
                self.api
                    .values_get(&a1_range(&self.tab_name, &self.columns))
                    .await
            }
            FetchStrategy::DefaultRange => self.api.values_get(&self.columns).await,
            FetchStrategy::DiscoverFirstTab => {
                let title = self.api.first_sheet_title().await?;
                tracing::debug!("🔎 Discovered first tab: '{title}'");
                self.api.values_get(&a1_range(&title, &self.columns)).await
            }
        }
    }
}

#[async_trait]
impl<A: SheetApi> RowSource for SheetRowSource<A> {
    fn name(&self) -> &str {
        "google-sheets"
    }

    async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
        let mut last_error = None;

        for (idx, strategy) in self.strategies.iter().enumerate() {
            match self.attempt(*strategy).await {
                Ok(rows) => {
                    if idx > 0 {
                        tracing::info!(
                            "🔄 Fallback: {} → {} (success)",
                            self.strategies[0].label(),
                            strategy.label()
                        );
                    }
                    return Ok(rows);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Fetch via {} failed: {e}", strategy.label());
                    last_error = Some(e);
                }
            }
        }

        Err(RsvpError::SourceUnavailable {
            attempts: self.strategies.len(),
            cause: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no fetch strategies configured".into()),
        })
    }
}
