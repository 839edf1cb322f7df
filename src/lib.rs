//! Stopwatch with lap notes whose state lives in a shared key-value store,
//! so every open view of it converges on the last write.

pub mod clock;
pub mod config;
pub mod error;
pub mod file_store;
pub mod input;
pub mod memory_store;
pub mod pump;
pub mod stopwatch;
pub mod storage;
pub mod ui;
#[cfg(feature = "web")]
pub mod web;

pub use config::Config;
pub use error::StoreError;
pub use pump::{ManualScheduler, Scheduler, TickHandle};
pub use stopwatch::{StopwatchWidget, WidgetEvent};
pub use storage::{KeyValueStore, StorageChange};
pub use timer_core::{format_elapsed, LapLedger, LapRecord, TimerState};
pub use ui::{Button, ButtonStates, LapRow, SnapshotView, View};
