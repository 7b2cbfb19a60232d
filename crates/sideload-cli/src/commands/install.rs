use super::prompt::PromptGate;
use super::{
    colorize_state, exit_code_for, load_catalog, load_manifest, make_host, resolve_item,
    spin_fail, spin_ok, spinner, terminal_message, worst_exit_code, EXIT_SUCCESS,
};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use sideload_core::{
    install_signal_handler, ChannelSink, CoreError, Engine, EngineSettings, Outcome,
    StatusEvent, WorkflowState,
};
use sideload_fetch::{FetchConfig, HttpFetcher};
use sideload_host::{PermissionGate, PolicyGate};
use sideload_schema::{CatalogItem, ItemId};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;

pub struct InstallOptions {
    pub auto_launch: bool,
    pub yes: bool,
    pub backend: Option<String>,
    pub notify: bool,
}

type RunResult = (ItemId, Result<Outcome, CoreError>);

pub fn run(
    manifest_path: &Path,
    ids: &[String],
    opts: &InstallOptions,
    json: bool,
) -> Result<u8, String> {
    let manifest = load_manifest(manifest_path)?;
    let catalog = load_catalog(&manifest)?;
    let items = ids
        .iter()
        .map(|id| resolve_item(&catalog, id))
        .collect::<Result<Vec<_>, _>>()?;

    let host = make_host(&manifest, opts.backend.as_deref())?;
    if !host.available() {
        return Err(format!(
            "host backend '{}' is not available (run 'sideload doctor')",
            host.name()
        ));
    }

    let mut settings = EngineSettings::from_section(&manifest.settings);
    if opts.auto_launch {
        settings = settings.with_auto_launch(true);
    }
    std::fs::create_dir_all(&settings.downloads_dir).map_err(|e| {
        format!(
            "cannot create downloads directory {}: {e}",
            settings.downloads_dir.display()
        )
    })?;

    let progress = if json {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::new()
    };
    let gate: Arc<dyn PermissionGate> = if manifest.permission.require_consent && !opts.yes {
        Arc::new(PromptGate::new(
            progress.clone(),
            settings.downloads_dir.clone(),
        ))
    } else {
        Arc::new(PolicyGate)
    };
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from_section(&manifest.fetch)));
    let (sink, events) = ChannelSink::new();
    let renderer = Renderer::new(progress, &items, settings.poll_deadline, json, opts.notify);

    let engine = Arc::new(Engine::new(settings, gate, fetcher, host, Arc::new(sink)));
    install_signal_handler(engine.shutdown_handle());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;
    let results = runtime.block_on(drive(engine, items, events, renderer))?;

    report(&results, json);
    Ok(results
        .iter()
        .map(|(_, result)| exit_code_for(result))
        .fold(EXIT_SUCCESS, worst_exit_code))
}

/// Run every item concurrently and render transitions until the last run ends.
/// Results come back in request order.
async fn drive(
    engine: Arc<Engine>,
    items: Vec<Arc<CatalogItem>>,
    mut events: UnboundedReceiver<StatusEvent>,
    mut renderer: Renderer,
) -> Result<Vec<RunResult>, String> {
    let render = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            renderer.show(&event);
        }
    });

    let mut runs = JoinSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let engine = Arc::clone(&engine);
        runs.spawn(async move {
            let id = item.id.clone();
            let result = engine.run(item).await;
            (index, (id, result))
        });
    }
    // The sink's sender lives in the engine; the renderer stops once every
    // run has dropped its clone.
    drop(engine);

    let mut results = Vec::new();
    while let Some(joined) = runs.join_next().await {
        results.push(joined.map_err(|e| format!("install task failed: {e}"))?);
    }
    render
        .await
        .map_err(|e| format!("status renderer failed: {e}"))?;

    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, result)| result).collect())
}

fn report(results: &[RunResult], json: bool) {
    for (id, result) in results {
        if json {
            println!("{}", result_line(id, result));
        } else if let Err(e @ (CoreError::InFlight(_) | CoreError::ShuttingDown(_))) = result {
            // Rejected runs produce no transitions, so nothing was rendered.
            eprintln!("{id}: {e}");
        }
    }
}

fn result_line(id: &ItemId, result: &Result<Outcome, CoreError>) -> serde_json::Value {
    match result {
        Ok(outcome) => serde_json::json!({"item": id.as_str(), "outcome": outcome}),
        Err(CoreError::Acquire(reason)) => {
            serde_json::json!({"item": id.as_str(), "error": reason})
        }
        Err(e) => serde_json::json!({
            "item": id.as_str(),
            "error": {"kind": "rejected", "cause": e.to_string()},
        }),
    }
}

/// Draws one spinner per item, or prints JSON lines, and optionally raises a
/// desktop notification for each terminal state.
struct Renderer {
    progress: MultiProgress,
    bars: HashMap<ItemId, ProgressBar>,
    titles: HashMap<ItemId, String>,
    deadline: Duration,
    json: bool,
    notify: bool,
}

impl Renderer {
    fn new(
        progress: MultiProgress,
        items: &[Arc<CatalogItem>],
        deadline: Duration,
        json: bool,
        notify: bool,
    ) -> Self {
        Self {
            progress,
            bars: HashMap::new(),
            titles: items
                .iter()
                .map(|item| (item.id.clone(), item.title.clone()))
                .collect(),
            deadline,
            json,
            notify,
        }
    }

    fn title(&self, id: &ItemId) -> String {
        self.titles
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn show(&mut self, event: &StatusEvent) {
        if self.json {
            print_event(event);
        } else {
            self.draw(event);
        }
        if self.notify {
            if let Some(body) = terminal_message(&event.state, self.deadline) {
                let summary = self.title(&event.item);
                tokio::task::spawn_blocking(move || send_notification(&summary, &body));
            }
        }
    }

    fn draw(&mut self, event: &StatusEvent) {
        let title = self.title(&event.item);
        let progress = &self.progress;
        let bar = self.bars.entry(event.item.clone()).or_insert_with(|| {
            let pb = progress.add(spinner(""));
            pb.set_prefix(title);
            pb
        });

        let label = event.state.label();
        match terminal_message(&event.state, self.deadline) {
            Some(msg) => {
                let line = format!("{} {msg}", colorize_state(label));
                if matches!(
                    event.state,
                    WorkflowState::Installed | WorkflowState::Launched
                ) {
                    spin_ok(bar, &line);
                } else {
                    spin_fail(bar, &line);
                }
            }
            None if event.state.is_busy() => bar.set_message(colorize_state(label)),
            None => {
                // The installer owns the screen now; stop animating.
                bar.disable_steady_tick();
                bar.set_message(format!(
                    "{} waiting for the installer",
                    colorize_state(label)
                ));
            }
        }
    }
}

fn print_event(event: &StatusEvent) {
    let reason = match &event.state {
        WorkflowState::Failed(reason) => serde_json::to_value(reason).ok(),
        _ => None,
    };
    let line = serde_json::json!({
        "item": event.item.as_str(),
        "state": event.state.label(),
        "reason": reason,
        "at": event.at.to_rfc3339(),
    });
    println!("{line}");
}

fn send_notification(summary: &str, body: &str) {
    if let Err(e) = notify_rust::Notification::new()
        .appname("Sideload")
        .summary(summary)
        .body(body)
        .timeout(notify_rust::Timeout::Milliseconds(5000))
        .show()
    {
        tracing::debug!("desktop notification failed (non-fatal): {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sideload_core::AcquireError;

    fn renderer() -> Renderer {
        let item = Arc::new(CatalogItem {
            id: ItemId::new("space-jump"),
            title: "Space Jump!".to_owned(),
            description: String::new(),
            icon: None,
            source_url: "https://example.com/space-jump.apk".to_owned(),
            target_package: sideload_schema::PackageId::new("com.example.spacejump"),
        });
        Renderer::new(
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            &[item],
            Duration::from_secs(20),
            false,
            false,
        )
    }

    fn event(state: WorkflowState) -> StatusEvent {
        StatusEvent {
            item: ItemId::new("space-jump"),
            state,
            at: chrono::Utc::now(),
        }
    }

    #[test]
    fn one_bar_per_item_finished_on_terminal_state() {
        let mut r = renderer();
        r.show(&event(WorkflowState::AwaitingPermission));
        r.show(&event(WorkflowState::Downloading));
        assert_eq!(r.bars.len(), 1);
        assert!(!r.bars[&ItemId::new("space-jump")].is_finished());

        r.show(&event(WorkflowState::Failed(AcquireError::PermissionDenied)));
        let bar = &r.bars[&ItemId::new("space-jump")];
        assert!(bar.is_finished());
        assert!(bar.message().contains("permission denied"));
        assert_eq!(bar.prefix(), "Space Jump!");
    }

    #[test]
    fn redundant_terminal_notification_is_harmless() {
        let mut r = renderer();
        r.show(&event(WorkflowState::TimedOut));
        r.show(&event(WorkflowState::TimedOut));
        assert_eq!(r.bars.len(), 1);
        assert!(r.bars[&ItemId::new("space-jump")].is_finished());
    }

    #[test]
    fn result_lines_by_outcome() {
        let id = ItemId::new("space-jump");
        assert_eq!(
            result_line(&id, &Ok(Outcome::TimedOut)),
            serde_json::json!({"item": "space-jump", "outcome": "timed_out"})
        );

        let denied = result_line(&id, &Err(AcquireError::PermissionDenied.into()));
        assert_eq!(denied["error"]["kind"], "permission_denied");

        let rejected = result_line(&id, &Err(CoreError::ShuttingDown(id.clone())));
        assert_eq!(rejected["error"]["kind"], "rejected");
        assert!(rejected["error"]["cause"]
            .as_str()
            .unwrap()
            .contains("shutting down"));
    }

    #[test]
    fn unknown_items_use_their_id_as_title() {
        let r = renderer();
        assert_eq!(r.title(&ItemId::new("other")), "other");
    }
}
