use async_trait::async_trait;

use crate::{Bar, Result};

/// Abstraction over the candlestick data source.
///
/// `BinanceRest` implements this against the public REST API. Tests provide
/// in-memory fakes. Implementations must return an error for any non-success
/// upstream condition; skipping a failed symbol is the scanner's job.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// The `limit` most recent bars for `symbol` on `interval`, oldest first.
    async fn klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Bar>>;

    /// All currently tradeable symbols quoted in `quote_asset`.
    async fn tradeable_symbols(&self, quote_asset: &str) -> Result<Vec<String>>;
}
