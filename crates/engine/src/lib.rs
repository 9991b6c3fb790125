pub mod binance;
pub mod config;
pub mod cooldown;
pub mod scanner;
pub mod scheduler;
pub mod universe;

pub use binance::BinanceRest;
pub use config::{ConfigWatcher, ScannerConfig, Snapshot};
pub use cooldown::CooldownTracker;
pub use scanner::{CycleReport, Scanner};
pub use scheduler::Scheduler;
pub use universe::resolve_universe;
