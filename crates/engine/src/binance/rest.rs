use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use common::{Bar, Error, MarketData, Result};

pub const BASE_URL: &str = "https://api.binance.com";

/// Public (unsigned) Binance spot REST client used for klines and symbol
/// discovery. Every request carries a timeout and is retried a bounded
/// number of times with a randomized pause.
pub struct BinanceRest {
    base_url: String,
    http: Client,
    max_retries: u32,
}

impl BinanceRest {
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            max_retries,
        })
    }

    /// GET `path` and decode the JSON body. Network errors, 5xx and 429 are
    /// retried; any other non-success status fails immediately.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut retries = 0u32;

        loop {
            let started = Instant::now();
            let outcome = self.http.get(&url).query(query).send().await;
            let ms = started.elapsed().as_millis() as u64;

            let err = match outcome {
                Ok(resp) => {
                    let status = resp.status();
                    debug!(target: "http", url = %url, status = status.as_u16(), ms, retries, "GET");
                    if status.is_success() {
                        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
                        return Ok(serde_json::from_str(&body)?);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = Error::Exchange { status: status.as_u16(), body };
                    if !is_retryable(status) {
                        warn!(target: "http", url = %url, status = status.as_u16(), ms, retries, "GET failed");
                        return Err(err);
                    }
                    err
                }
                Err(e) => Error::Http(e.to_string()),
            };

            warn!(target: "http", url = %url, ms, retries, error = %err, "GET failed");
            if retries >= self.max_retries {
                return Err(err);
            }
            retries += 1;
            tokio::time::sleep(jitter()).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Randomized pause between attempts, 400 to 800 ms.
fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(400..=800))
}

#[async_trait]
impl MarketData for BinanceRest {
    async fn klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Bar>> {
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.get_json("/api/v3/klines", &query).await?;
        parse_klines(&body, Utc::now().timestamp_millis())
    }

    async fn tradeable_symbols(&self, quote_asset: &str) -> Result<Vec<String>> {
        let body = self.get_json("/api/v3/exchangeInfo", &[]).await?;
        let info: ExchangeInfo = serde_json::from_value(body)?;
        Ok(quoted_symbols(info, quote_asset))
    }
}

// ─── Response parsing ─────────────────────────────────────────────────────────

/// Decode the kline array-of-arrays:
/// `[openTime, open, high, low, close, volume, closeTime, ...]`.
///
/// The exchange includes the still-forming candle last; it is dropped when
/// its close time lies after `now_ms`, so the returned series ends on a
/// closed bar.
fn parse_klines(body: &Value, now_ms: i64) -> Result<Vec<Bar>> {
    let rows = body
        .as_array()
        .ok_or_else(|| Error::Parse("klines response is not an array".into()))?;

    let mut bars = Vec::with_capacity(rows.len());
    let mut last_close_time = None;
    for row in rows {
        let fields = row
            .as_array()
            .ok_or_else(|| Error::Parse("kline row is not an array".into()))?;
        if fields.len() < 7 {
            return Err(Error::Parse(format!("kline row has {} fields", fields.len())));
        }
        bars.push(Bar::new(
            number(&fields[1])?,
            number(&fields[2])?,
            number(&fields[3])?,
            number(&fields[4])?,
            number(&fields[5])?,
        ));
        last_close_time = fields[6].as_i64();
    }

    if matches!(last_close_time, Some(t) if t > now_ms) {
        bars.pop();
    }
    Ok(bars)
}

/// Binance encodes prices and volumes as decimal strings.
fn number(v: &Value) -> Result<f64> {
    match v {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| Error::Parse(format!("bad number '{s}': {e}"))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::Parse(format!("bad number {n}"))),
        other => Err(Error::Parse(format!("expected number, got {other}"))),
    }
}

/// Symbols currently `TRADING` against `quote_asset`, in exchange order.
fn quoted_symbols(info: ExchangeInfo, quote_asset: &str) -> Vec<String> {
    info.symbols
        .into_iter()
        .filter(|s| s.quote_asset == quote_asset && s.status == "TRADING")
        .map(|s| s.symbol)
        .collect()
}

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    quote_asset: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(open_time: i64, close: &str, close_time: i64) -> Value {
        json!([open_time, "1.0", "2.0", "0.5", close, "123.4", close_time, "0", 10, "0", "0", "0"])
    }

    #[test]
    fn parses_rows_in_order() {
        let body = json!([row(0, "1.5", 59_999), row(60_000, "1.7", 119_999)]);
        let bars = parse_klines(&body, 1_000_000).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0], Bar::new(1.0, 2.0, 0.5, 1.5, 123.4));
        assert_eq!(bars[1].close, 1.7);
    }

    #[test]
    fn drops_forming_candle() {
        let body = json!([row(0, "1.5", 59_999), row(60_000, "1.7", 119_999)]);
        let bars = parse_klines(&body, 100_000).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 1.5);
    }

    #[test]
    fn rejects_malformed_rows() {
        assert!(parse_klines(&json!({"code": -1121}), 0).is_err());
        assert!(parse_klines(&json!([[0, "1.0", "2.0"]]), 0).is_err());
        assert!(parse_klines(&json!([[0, "x", "2", "1", "1", "1", 5]]), 0).is_err());
    }

    #[test]
    fn empty_array_is_empty_series() {
        assert!(parse_klines(&json!([]), 0).unwrap().is_empty());
    }

    #[test]
    fn exchange_info_filters_quote_and_status() {
        let body = json!({"symbols": [
            {"symbol": "BTCUSDT", "status": "TRADING", "quoteAsset": "USDT", "baseAsset": "BTC"},
            {"symbol": "ETHBTC", "status": "TRADING", "quoteAsset": "BTC"},
            {"symbol": "LUNAUSDT", "status": "BREAK", "quoteAsset": "USDT"}
        ]});
        let info: ExchangeInfo = serde_json::from_value(body).unwrap();
        assert_eq!(quoted_symbols(info, "USDT"), vec!["BTCUSDT"]);
    }

    #[test]
    fn retry_policy() {
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    // ─── Retry loop against a local HTTP stub ────────────────────────────────

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one response per connection, taking statuses from `statuses`
    /// in order and repeating the last. Returns the base URL and a hit count.
    async fn stub(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses.get(n).or(statuses.last()).copied().unwrap_or(500);
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let body = if status == 200 { "[]" } else { r#"{"code":-1,"msg":"stub"}"# };
                let resp = format!(
                    "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        (format!("http://{addr}"), hits)
    }

    fn client(base_url: &str, max_retries: u32) -> BinanceRest {
        BinanceRest::new(base_url, Duration::from_secs(5), max_retries).unwrap()
    }

    #[tokio::test]
    async fn server_error_is_retried_then_surfaced() {
        let (url, hits) = stub(vec![503]).await;
        let err = client(&url, 2).get_json("/api/v3/klines", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Exchange { status: 503, .. }), "{err}");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_error_fails_without_retry() {
        let (url, hits) = stub(vec![400]).await;
        let err = client(&url, 2).get_json("/api/v3/klines", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Exchange { status: 400, ref body } if body.contains("stub")), "{err}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let (url, hits) = stub(vec![503, 200]).await;
        let bars = client(&url, 2)
            .klines("BTCUSDT", "5m", 120)
            .await
            .unwrap();
        assert!(bars.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rate_limit_is_retried() {
        let (url, hits) = stub(vec![429, 429, 200]).await;
        assert!(client(&url, 2).get_json("/api/v3/exchangeInfo", &[]).await.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client(&format!("http://{addr}"), 1).get_json("/api/v3/klines", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "{err}");
    }

    #[test]
    fn jitter_is_bounded() {
        for _ in 0..50 {
            let d = jitter();
            assert!(d >= Duration::from_millis(400) && d <= Duration::from_millis(800));
        }
    }
}
