//! Indicator math, rule settings and the five signal detectors.
//!
//! Everything in this crate is pure: no I/O, no clocks, no shared state.

pub mod evaluators;
pub mod indicators;
pub mod settings;

pub use evaluators::{evaluate, min_notional, CrossDirection, EmaLengths};
pub use settings::{
    merge, BreakoutSettings, CrossSettings, EffectiveSettings, RuleFamily, RuleTable,
    SettingsError, SpikeSettings,
};
