use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use common::AlertKind;

/// Last firing time per (symbol, alert kind).
///
/// Owned by the scanner and shared behind a mutex. Callers must treat
/// check, evaluate, deliver and mark as one step per pair; the scanner
/// guarantees that by never scanning the same symbol twice at once.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_fired: HashMap<String, HashMap<AlertKind, Instant>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `kind` fired for `symbol` less than `window` ago.
    /// A pair that never fired is never on cooldown.
    pub fn is_on_cooldown(&self, symbol: &str, kind: AlertKind, window: Duration) -> bool {
        self.last_fired
            .get(symbol)
            .and_then(|kinds| kinds.get(&kind))
            .is_some_and(|last| last.elapsed() < window)
    }

    /// Record now as the last firing time, replacing any earlier one.
    pub fn mark_fired(&mut self, symbol: &str, kind: AlertKind) {
        self.last_fired
            .entry(symbol.to_string())
            .or_default()
            .insert(kind, Instant::now());
    }

    /// Number of (symbol, kind) pairs with a recorded firing.
    pub fn len(&self) -> usize {
        self.last_fired.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
