//! Gazelens Focus Engine
//!
//! Turns a noisy stream of gaze estimates into reversible style changes on
//! the elements a reader actually looks at:
//! - **Gaze Smoothing:** Moving average over raw samples plus an eye-ratio anomaly flag
//! - **Dwell Tracking:** Hit-testing and a rolling 2-second set of gazed elements
//! - **Style Ledger:** Apply per-tag styles and restore the exact prior inline values
//! - **Config Store:** Hot-swappable per-tag configuration and debug flag
//! - **Focus Engine:** Per-sample orchestration of all of the above
//!
//! Everything runs on a single event-handling context; no locking is needed
//! and every handler runs to completion before the next one starts.

pub mod config_store;
pub mod dwell;
pub mod engine;
pub mod gaze_smooth;
pub mod style_ledger;

pub use config_store::{ConfigStore, ConfigSubscription, SettingsChange, SharedConfig};
pub use dwell::{DwellConfig, DwellSnapshot, DwellTracker, FocusTransition, UnfocusReason};
pub use engine::{EngineStats, FocusEngine, SampleOutcome};
pub use gaze_smooth::GazeSmoother;
pub use style_ledger::StyleLedger;
