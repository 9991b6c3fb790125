pub mod ema;
pub mod stats;

pub use ema::{ema, ema_last};
pub use stats::{median, notional, round_to, volume_median, volume_ok, VOLUME_WINDOW};
