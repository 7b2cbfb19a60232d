use crate::concurrency::ShutdownHandle;
use crate::config::EngineSettings;
use crate::lifecycle::{validate_transition, WorkflowState};
use crate::poll::{PollEvent, PollGauge, PollHandle};
use crate::registry::{RunLease, WorkflowRegistry};
use crate::sink::StatusSink;
use crate::{AcquireError, CoreError};
use serde::Serialize;
use sideload_fetch::Fetcher;
use sideload_host::{HostBackend, PermissionGate};
use sideload_schema::{CatalogItem, PackageId};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::task::{self, JoinError};
use tracing::{debug, error, info, warn};

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Installed,
    Launched,
    /// The deadline passed (or the engine shut down) before the package showed
    /// up. The installer may still finish on its own.
    TimedOut,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Installed => write!(f, "installed"),
            Outcome::Launched => write!(f, "launched"),
            Outcome::TimedOut => write!(f, "timed out"),
        }
    }
}

enum PollVerdict {
    Installed,
    DeadlineElapsed,
    Abandoned,
}

/// Run a blocking collaborator call on the blocking pool. A panic inside `f`
/// comes back as `Err` with the panic message.
async fn off_thread<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f).await.map_err(join_cause)
}

fn join_cause(err: JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic().as_ref())
    } else {
        err.to_string()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_owned()
    }
}

/// One in-flight run: the item, its lease, and where transitions are reported.
struct Run<'a> {
    item: &'a CatalogItem,
    lease: RunLease,
    sink: &'a dyn StatusSink,
}

impl Run<'_> {
    fn advance(&self, to: WorkflowState) {
        let from = self.lease.state();
        let checked = validate_transition(&from, &to);
        debug_assert!(checked.is_ok(), "{}: {from} -> {to} rejected", self.item.id);
        if let Err(e) = checked {
            error!("{}: {e}", self.item.id);
            return;
        }
        self.lease.set_state(to.clone());
        info!("{}: {} -> {}", self.item.id, from.label(), to);
        self.sink.on_transition(&self.item.id, &to);
    }
}

/// Drives catalog items through permission, download, installer handoff,
/// install polling and optional launch.
///
/// Runs of different items proceed concurrently and independently. A second
/// run of an item whose previous run has not finished is rejected with
/// [`CoreError::InFlight`] and changes nothing.
pub struct Engine {
    settings: EngineSettings,
    gate: Arc<dyn PermissionGate>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn HostBackend>,
    sink: Arc<dyn StatusSink>,
    registry: Arc<WorkflowRegistry>,
    gauge: Arc<PollGauge>,
    shutdown: ShutdownHandle,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        gate: Arc<dyn PermissionGate>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn HostBackend>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            settings,
            gate,
            fetcher,
            host,
            sink,
            registry: Arc::new(WorkflowRegistry::new()),
            gauge: Arc::new(PollGauge::new()),
            shutdown: ShutdownHandle::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    pub fn poll_gauge(&self) -> Arc<PollGauge> {
        Arc::clone(&self.gauge)
    }

    pub fn state(&self, id: &str) -> WorkflowState {
        self.registry.state(id)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Release every active poll. Affected runs end as `TimedOut`.
    ///
    /// Runs started afterwards are rejected with [`CoreError::ShuttingDown`].
    /// A run already past the gate finishes its transfer and handoff, then
    /// ends as `TimedOut` without querying the host.
    pub fn shutdown(&self) {
        info!(
            "engine shutdown, {} run(s) in flight",
            self.registry.in_flight()
        );
        self.shutdown.trigger();
    }

    /// Acquire one item. Returns once the run reaches a terminal state.
    pub async fn run(&self, item: Arc<CatalogItem>) -> Result<Outcome, CoreError> {
        if self.shutdown.is_triggered() {
            warn!("{}: run rejected, engine is shutting down", item.id);
            return Err(CoreError::ShuttingDown(item.id.clone()));
        }
        let Some(lease) = self.registry.try_begin(&item.id) else {
            warn!("{}: run rejected, previous run still in flight", item.id);
            return Err(CoreError::InFlight(item.id.clone()));
        };

        let run = Run {
            item: &item,
            lease,
            sink: self.sink.as_ref(),
        };
        run.advance(WorkflowState::AwaitingPermission);

        match self.drive(&run).await {
            Ok(outcome) => {
                info!("{}: run finished, {outcome}", item.id);
                Ok(outcome)
            }
            Err(e) => {
                warn!("{}: run failed, {e}", item.id);
                run.advance(WorkflowState::Failed(e.clone()));
                Err(e.into())
            }
        }
    }

    async fn drive(&self, run: &Run<'_>) -> Result<Outcome, AcquireError> {
        let item = run.item;

        let gate = Arc::clone(&self.gate);
        let granted = off_thread(move || gate.check_and_request())
            .await
            .unwrap_or_else(|cause| {
                warn!("{}: permission gate {cause}, treating as denied", item.id);
                false
            });
        if !granted {
            return Err(AcquireError::PermissionDenied);
        }

        let dest = self.settings.destination_for(item);
        run.advance(WorkflowState::Downloading);
        let fetcher = Arc::clone(&self.fetcher);
        let url = item.source_url.clone();
        let download = off_thread(move || fetcher.fetch(&url, &dest))
            .await
            .map_err(|cause| AcquireError::DownloadError { cause })?
            .map_err(|e| AcquireError::DownloadError {
                cause: e.to_string(),
            })?;
        if !download.is_ok() {
            return Err(AcquireError::DownloadFailed {
                http_status: download.status_code,
            });
        }
        debug!(
            "{}: {} bytes at {}",
            item.id,
            download.bytes,
            download.local_path.display()
        );

        run.advance(WorkflowState::HandingOffToInstaller);
        let host = Arc::clone(&self.host);
        let path = download.local_path;
        let content_type = self.settings.content_type.clone();
        let authority = self.settings.provider_authority.clone();
        off_thread(move || host.hand_off(&path, &content_type, &authority))
            .await
            .map_err(|cause| AcquireError::InstallHandoffError { cause })?
            .map_err(|e| AcquireError::InstallHandoffError {
                cause: e.to_string(),
            })?;

        run.advance(WorkflowState::PollingForInstall);
        let handle = PollHandle::arm(
            item.id.clone(),
            self.settings.poll_interval,
            self.settings.poll_deadline,
            self.shutdown.subscribe(),
            Arc::clone(&self.gauge),
        );

        match self.await_install(handle, item).await {
            PollVerdict::Installed => {
                run.advance(WorkflowState::Installed);
                if self.settings.auto_launch && self.launch(item).await {
                    run.advance(WorkflowState::Launched);
                    return Ok(Outcome::Launched);
                }
                Ok(Outcome::Installed)
            }
            PollVerdict::DeadlineElapsed => {
                info!(
                    "{}: not installed within {:?}, installer may still be waiting on the user",
                    item.id, self.settings.poll_deadline
                );
                run.advance(WorkflowState::TimedOut);
                Ok(Outcome::TimedOut)
            }
            PollVerdict::Abandoned => {
                warn!("{}: install polling abandoned at shutdown", item.id);
                run.advance(WorkflowState::TimedOut);
                Ok(Outcome::TimedOut)
            }
        }
    }

    /// Poll until installed, deadline or shutdown. The handle is released
    /// before this returns.
    async fn await_install(&self, mut handle: PollHandle, item: &CatalogItem) -> PollVerdict {
        let verdict = loop {
            match handle.next_event().await {
                PollEvent::Tick => {
                    if self.check_installed(item).await {
                        break PollVerdict::Installed;
                    }
                }
                PollEvent::DeadlineElapsed => break PollVerdict::DeadlineElapsed,
                PollEvent::Shutdown => break PollVerdict::Abandoned,
            }
        };
        handle.release();
        verdict
    }

    /// One install query. Any fault counts as "not installed yet".
    async fn check_installed(&self, item: &CatalogItem) -> bool {
        let host = Arc::clone(&self.host);
        let package: PackageId = item.target_package.clone();
        match off_thread(move || host.is_installed(&package)).await {
            Ok(Ok(installed)) => {
                debug!("{}: install check -> {installed}", item.id);
                installed
            }
            Ok(Err(e)) => {
                warn!("{}: install check failed, treating as not installed: {e}", item.id);
                false
            }
            Err(cause) => {
                warn!("{}: install check {cause}, treating as not installed", item.id);
                false
            }
        }
    }

    /// Best-effort launch. `false` on any fault, which is logged and dropped.
    async fn launch(&self, item: &CatalogItem) -> bool {
        let host = Arc::clone(&self.host);
        let package = item.target_package.clone();
        match off_thread(move || host.launch(&package)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("{}: launch failed, staying installed: {e}", item.id);
                false
            }
            Err(cause) => {
                warn!("{}: launch {cause}, staying installed", item.id);
                false
            }
        }
    }
}
