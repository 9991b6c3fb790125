#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use common::{AlertSink, Bar, Error, MarketData, Result};

// ─── Fakes ────────────────────────────────────────────────────────────────────

pub enum Feed {
    Bars(Vec<Bar>),
    Fail,
    Panic,
}

#[derive(Default)]
pub struct FakeMarket {
    feeds: HashMap<String, Feed>,
}

impl FakeMarket {
    pub fn with(mut self, symbol: &str, feed: Feed) -> Self {
        self.feeds.insert(symbol.to_string(), feed);
        self
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn klines(&self, symbol: &str, _interval: &str, limit: usize) -> Result<Vec<Bar>> {
        match self.feeds.get(symbol) {
            Some(Feed::Bars(bars)) => Ok(bars[bars.len().saturating_sub(limit)..].to_vec()),
            Some(Feed::Fail) => Err(Error::Exchange { status: 400, body: "Invalid symbol.".into() }),
            Some(Feed::Panic) => panic!("corrupt feed for {symbol}"),
            None => Ok(Vec::new()),
        }
    }

    async fn tradeable_symbols(&self, _quote_asset: &str) -> Result<Vec<String>> {
        Ok(self.feeds.keys().cloned().collect())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn deliver(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

// ─── Series ───────────────────────────────────────────────────────────────────

/// 149 bars of a gentle uptrend capped near 100.4, then one bar that closes
/// well above the 32-bar range high on ten times the usual volume. The body
/// of that bar is small, so only the breakout rule should see it.
pub fn breakout_series() -> Vec<Bar> {
    let mut bars: Vec<Bar> = (0..149)
        .map(|i| {
            let close = 90.0 + 0.07 * i as f64;
            Bar::new(close - 0.02, close + 0.05, close - 0.05, close, 100.0)
        })
        .collect();
    bars.push(Bar::new(100.40, 101.10, 100.35, 101.0, 1000.0));
    bars
}

pub fn quiet_series() -> Vec<Bar> {
    (0..150)
        .map(|i| {
            let close = 90.0 + 0.07 * i as f64;
            Bar::new(close - 0.02, close + 0.05, close - 0.05, close, 100.0)
        })
        .collect()
}
