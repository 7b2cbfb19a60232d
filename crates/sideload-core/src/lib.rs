//! Acquisition engine for Sideload.
//!
//! The `Engine` takes one catalog item at a time through
//! permission → download → installer handoff → install polling → optional launch.
//! Each item has its own `WorkflowState` in a `WorkflowRegistry`; transitions are
//! checked by `validate_transition` and reported to a `StatusSink`. Install
//! detection is a bounded poll owned by a `PollHandle`, released on every exit
//! path before the terminal state is reported.

pub mod concurrency;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod poll;
pub mod registry;
pub mod sink;

pub use concurrency::{install_signal_handler, ShutdownHandle};
pub use config::{default_downloads_dir, expand_tilde, EngineSettings};
pub use engine::{Engine, Outcome};
pub use lifecycle::{validate_transition, WorkflowState};
pub use poll::{PollGauge, PollHandle};
pub use registry::{RegistryEntry, RunLease, WorkflowRegistry};
pub use sink::{ChannelSink, LogSink, StatusEvent, StatusSink};

use serde::Serialize;
use sideload_schema::ItemId;
use thiserror::Error;

/// Why a started run ended in `Failed`. No other failure leaves the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AcquireError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("download failed: HTTP {http_status}")]
    DownloadFailed { http_status: u16 },
    #[error("download error: {cause}")]
    DownloadError { cause: String },
    #[error("install error: {cause}")]
    InstallHandoffError { cause: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("a run for '{0}' is already in flight")]
    InFlight(ItemId),
    #[error("engine is shutting down, '{0}' not started")]
    ShuttingDown(ItemId),
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}
