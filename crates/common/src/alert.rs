use async_trait::async_trait;

/// Destination for rendered alert lines.
///
/// Delivery is best-effort: implementations swallow their own failures and
/// must not hold up the caller for longer than it takes to hand the message
/// off.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, message: &str);
}

/// Sink used when no delivery channel is configured. Alerts still reach the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl AlertSink for NullSink {
    async fn deliver(&self, _message: &str) {}
}
