use std::path::Path;

use tracing::{info, warn};

use common::{MarketData, Result};

use crate::config::{SymbolMode, SymbolsConfig};

/// Used when every other source fails, so the scanner never starts empty.
pub const FALLBACK_SYMBOLS: [&str; 3] = ["BTCUSDT", "ETHUSDT", "SOLUSDT"];

/// Resolve the scan universe: the static list, or the advisor file, or the
/// exchange's tradeable symbols, or [`FALLBACK_SYMBOLS`]. The result is
/// non-empty and free of duplicates, in source order.
pub async fn resolve_universe(cfg: &SymbolsConfig, market: &dyn MarketData) -> Vec<String> {
    let symbols = match cfg.mode {
        SymbolMode::Static => {
            info!(target: "boot", count = cfg.static_list.len(), "Using static symbol list");
            cfg.static_list.clone()
        }
        SymbolMode::TierAdvisor => from_advisor_or_exchange(cfg, market).await,
    };

    let symbols = dedup(symbols);
    if symbols.is_empty() {
        warn!(target: "boot", fallback = ?FALLBACK_SYMBOLS, "No symbols resolved, using fallback set");
        return FALLBACK_SYMBOLS.iter().map(|s| s.to_string()).collect();
    }
    symbols
}

async fn from_advisor_or_exchange(cfg: &SymbolsConfig, market: &dyn MarketData) -> Vec<String> {
    if let Some(path) = cfg.tier_file.as_deref() {
        match read_tier_file(path, &cfg.quote_asset) {
            Ok(symbols) if !symbols.is_empty() => {
                info!(target: "boot", path = %path.display(), count = symbols.len(), "Loaded symbols from tier file");
                return symbols;
            }
            Ok(_) => warn!(target: "boot", path = %path.display(), "Tier file has no matching symbols"),
            Err(e) => warn!(target: "boot", path = %path.display(), error = %e, "Tier file unreadable"),
        }
    }

    match market.tradeable_symbols(&cfg.quote_asset).await {
        Ok(symbols) => {
            info!(target: "boot", quote = %cfg.quote_asset, count = symbols.len(), "Loaded symbols from exchange info");
            symbols
        }
        Err(e) => {
            warn!(target: "boot", error = %e, "Exchange symbol lookup failed");
            Vec::new()
        }
    }
}

/// One symbol per line; blank lines and symbols not quoted in
/// `quote_asset` are ignored.
fn read_tier_file(path: &Path, quote_asset: &str) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.ends_with(quote_asset))
        .map(str::to_string)
        .collect())
}

pub(crate) fn dedup(symbols: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    symbols.into_iter().filter(|s| seen.insert(s.clone())).collect()
}
