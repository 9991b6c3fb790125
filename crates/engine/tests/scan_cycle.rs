mod support;

use std::sync::Arc;
use std::time::Duration;

use common::Bar;
use engine::config::ScannerConfig;
use engine::{Scanner, Snapshot};

use support::{breakout_series, quiet_series, FakeMarket, Feed, RecordingSink};

fn snapshot(edit: impl FnOnce(&mut ScannerConfig)) -> Snapshot {
    let mut config: ScannerConfig = toml::from_str("[timeframes.\"5m\"]").unwrap();
    config.telegram.throttle_ms = 0;
    edit(&mut config);
    Snapshot::build(config).unwrap()
}

fn scanner(market: FakeMarket) -> (Scanner, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (Scanner::new(Arc::new(market), sink.clone()), sink)
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn engineered_breakout_alerts_exactly_once() {
    let (scanner, sink) = scanner(FakeMarket::default().with("BTCUSDT", Feed::Bars(breakout_series())));
    let snap = snapshot(|_| {});

    let report = scanner.run_cycle(&snap, &symbols(&["BTCUSDT"])).await;

    assert_eq!(report.pairs_scanned, 1);
    assert_eq!(report.alerts, 1);
    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(
        messages[0].starts_with("[TS] BREAKOUT_UP | BTCUSDT 5m @ 101 | {\"range_hi\":"),
        "{}",
        messages[0]
    );
}

#[tokio::test]
async fn cycle_runs_on_a_spawned_task() {
    let (scanner, sink) = scanner(FakeMarket::default().with("BTCUSDT", Feed::Bars(breakout_series())));
    let scanner = Arc::new(scanner);
    let snap = Arc::new(snapshot(|_| {}));
    let universe = Arc::new(symbols(&["BTCUSDT", "ETHUSDT"]));

    let report = tokio::spawn(async move { scanner.run_cycle(&snap, &universe).await })
        .await
        .unwrap();

    assert_eq!(report.pairs_scanned, 1);
    assert_eq!(report.pairs_skipped, 1);
    assert_eq!(report.alerts, 1);
    assert_eq!(sink.messages().len(), 1);
}

#[tokio::test]
async fn quiet_series_raises_nothing() {
    let (scanner, sink) = scanner(FakeMarket::default().with("BTCUSDT", Feed::Bars(quiet_series())));
    let report = scanner.run_cycle(&snapshot(|_| {}), &symbols(&["BTCUSDT"])).await;
    assert_eq!(report.pairs_scanned, 1);
    assert_eq!(report.alerts, 0);
    assert!(sink.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeat_breakout_is_suppressed_until_cooldown_expires() {
    let (scanner, sink) = scanner(FakeMarket::default().with("BTCUSDT", Feed::Bars(breakout_series())));
    let snap = snapshot(|_| {});
    let universe = symbols(&["BTCUSDT"]);

    assert_eq!(scanner.run_cycle(&snap, &universe).await.alerts, 1);
    assert_eq!(scanner.run_cycle(&snap, &universe).await.alerts, 0);

    tokio::time::advance(Duration::from_secs(19 * 60)).await;
    assert_eq!(scanner.run_cycle(&snap, &universe).await.alerts, 0);

    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(scanner.run_cycle(&snap, &universe).await.alerts, 1);
    assert_eq!(sink.messages().len(), 2);
}

#[tokio::test]
async fn cooldown_spans_timeframes() {
    let (scanner, sink) = scanner(FakeMarket::default().with("BTCUSDT", Feed::Bars(breakout_series())));
    let snap = snapshot(|c| {
        c.timeframes.insert("1h".into(), Default::default());
    });

    let report = scanner.run_cycle(&snap, &symbols(&["BTCUSDT"])).await;
    assert_eq!(report.pairs_scanned, 2);
    assert_eq!(report.alerts, 1);
    assert_eq!(sink.messages().len(), 1);
    assert!(sink.messages()[0].contains("BTCUSDT 5m"));
}

#[tokio::test]
async fn first_listed_timeframe_owns_the_alert() {
    let (scanner, sink) = scanner(FakeMarket::default().with("BTCUSDT", Feed::Bars(breakout_series())));
    let config: ScannerConfig =
        toml::from_str("[timeframes.\"5m\"]\n[timeframes.\"1h\"]\n[telegram]\nthrottle_ms = 0").unwrap();
    let snap = Snapshot::build(config).unwrap();
    assert_eq!(snap.interval_names(), vec!["5m", "1h"]);

    let report = scanner.run_cycle(&snap, &symbols(&["BTCUSDT"])).await;

    assert_eq!(report.alerts, 1);
    assert!(sink.messages()[0].starts_with("[TS] BREAKOUT_UP | BTCUSDT 5m @ 101"));
}

#[tokio::test]
async fn failing_symbols_do_not_abort_the_cycle() {
    let market = FakeMarket::default()
        .with("BADUSDT", Feed::Fail)
        .with("BOOMUSDT", Feed::Panic)
        .with("BTCUSDT", Feed::Bars(breakout_series()));
    let (scanner, sink) = scanner(market);

    let report = scanner
        .run_cycle(&snapshot(|_| {}), &symbols(&["BADUSDT", "BOOMUSDT", "BTCUSDT"]))
        .await;

    assert_eq!(report.pairs_failed, 2);
    assert_eq!(report.pairs_scanned, 1);
    assert_eq!(report.alerts, 1);
    assert_eq!(sink.messages().len(), 1);
}

#[tokio::test]
async fn short_history_is_skipped() {
    let short: Vec<Bar> = breakout_series().split_off(150 - 36);
    let (scanner, sink) = scanner(FakeMarket::default().with("NEWUSDT", Feed::Bars(short)));

    let report = scanner.run_cycle(&snapshot(|_| {}), &symbols(&["NEWUSDT"])).await;

    assert_eq!(report.pairs_skipped, 1);
    assert_eq!(report.pairs_scanned, 0);
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn disabled_rule_is_not_evaluated() {
    let (scanner, sink) = scanner(FakeMarket::default().with("BTCUSDT", Feed::Bars(breakout_series())));
    let snap = snapshot(|c| c.rules.enable.breakout_up = false);

    let report = scanner.run_cycle(&snap, &symbols(&["BTCUSDT"])).await;

    assert_eq!(report.alerts, 0);
    assert!(sink.messages().is_empty());
    assert!(scanner.cooldowns().lock().await.is_empty());
}

#[tokio::test]
async fn notional_floor_filters_fired_rule() {
    let (scanner, sink) = scanner(FakeMarket::default().with("BTCUSDT", Feed::Bars(breakout_series())));
    let snap = snapshot(|c| {
        let tf = c.timeframes.get_mut("5m").unwrap();
        tf.bo_up_adjust.insert("min_notional".into(), toml::Value::Float(1e9));
    });

    let report = scanner.run_cycle(&snap, &symbols(&["BTCUSDT"])).await;

    assert_eq!(report.alerts, 0);
    assert!(sink.messages().is_empty());
    assert!(scanner.cooldowns().lock().await.is_empty());
}

#[tokio::test]
async fn delivery_toggle_still_records_cooldown() {
    let (scanner, sink) = scanner(FakeMarket::default().with("BTCUSDT", Feed::Bars(breakout_series())));
    let snap = snapshot(|c| c.telegram.enable = false);

    let report = scanner.run_cycle(&snap, &symbols(&["BTCUSDT"])).await;

    assert_eq!(report.alerts, 1);
    assert!(sink.messages().is_empty());
    assert_eq!(scanner.cooldowns().lock().await.len(), 1);
}

#[tokio::test]
async fn concurrent_symbols_each_alert_once() {
    let names: Vec<String> = (0..12).map(|i| format!("SYM{i}USDT")).collect();
    let market = names
        .iter()
        .fold(FakeMarket::default(), |m, s| m.with(s, Feed::Bars(breakout_series())));
    let (scanner, sink) = scanner(market);
    let snap = snapshot(|c| c.scanner.concurrency = 4);

    let report = scanner.run_cycle(&snap, &names).await;

    assert_eq!(report.pairs_scanned, 12);
    assert_eq!(report.alerts, 12);
    let mut messages = sink.messages();
    messages.sort();
    messages.dedup();
    assert_eq!(messages.len(), 12);
}

#[tokio::test]
async fn custom_prefix_is_used() {
    let (scanner, sink) = scanner(FakeMarket::default().with("ETHUSDT", Feed::Bars(breakout_series())));
    let snap = snapshot(|c| c.telegram.prefix = "SEEK".into());
    scanner.run_cycle(&snap, &symbols(&["ETHUSDT"])).await;
    assert!(sink.messages()[0].starts_with("[SEEK] BREAKOUT_UP | ETHUSDT 5m"));
}
