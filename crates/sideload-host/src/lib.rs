//! Host integration for Sideload.
//!
//! The acquisition engine never talks to the operating system directly. It goes
//! through a `HostBackend` (installer handoff, install query, launch) and a
//! `PermissionGate` (shared-storage consent). This crate holds both traits, the
//! command-template backend for real hosts, scripted mocks, and the prerequisite
//! check behind `sideload doctor`.

pub mod backend;
pub mod command;
pub mod gate;
pub mod mock;
pub mod prereq;

pub use backend::{select_backend, HostBackend};
pub use command::{CommandBackend, CommandTemplates, PROVIDER_AUTHORITY_ENV};
pub use gate::{PermissionGate, PolicyGate};
pub use mock::{FixedGate, MockHost, QueryAnswer};
pub use prereq::{check_host_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("host backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("installer handoff failed: {0}")]
    Handoff(String),
    #[error("install query failed: {0}")]
    Query(String),
    #[error("launch failed: {0}")]
    Launch(String),
    #[error("{0} command template is empty")]
    EmptyCommand(&'static str),
}
