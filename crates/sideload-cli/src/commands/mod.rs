pub mod check;
pub mod completions;
pub mod doctor;
pub mod install;
pub mod launch;
pub mod list;
pub mod prompt;
pub mod show;

use indicatif::{ProgressBar, ProgressStyle};
use sideload_core::{AcquireError, CoreError, Outcome, WorkflowState};
use sideload_host::{select_backend, CommandTemplates, HostBackend};
use sideload_schema::{parse_manifest_file, Catalog, CatalogItem, SideloadManifest};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_PERMISSION_DENIED: u8 = 3;
pub const EXIT_TIMED_OUT: u8 = 4;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{prefix:.bold} {msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{prefix:.bold} {msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "installed" | "launched" => Style::new().green().apply_to(state).to_string(),
        "downloading" | "handing_off" => Style::new().cyan().bold().apply_to(state).to_string(),
        "awaiting_permission" | "polling" => Style::new().yellow().apply_to(state).to_string(),
        "failed" => Style::new().red().bold().apply_to(state).to_string(),
        "timed_out" => Style::new().dim().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

/// Read and validate the manifest. Errors are prefixed so `main` can map them
/// to the manifest exit code.
pub fn load_manifest(path: &Path) -> Result<SideloadManifest, String> {
    parse_manifest_file(path).map_err(|e| format!("manifest error: {e}"))
}

pub fn load_catalog(manifest: &SideloadManifest) -> Result<Catalog, String> {
    manifest
        .catalog()
        .map_err(|e| format!("manifest error: {e}"))
}

pub fn resolve_item(catalog: &Catalog, id: &str) -> Result<Arc<CatalogItem>, String> {
    if let Some(item) = catalog.get(id) {
        return Ok(Arc::clone(item));
    }
    let known: Vec<&str> = catalog.items().iter().map(|i| i.id.as_str()).collect();
    if known.is_empty() {
        Err(format!("no catalog item '{id}' (the catalog is empty)"))
    } else {
        Err(format!(
            "no catalog item '{id}' (known: {})",
            known.join(", ")
        ))
    }
}

/// Host backend named by `--backend`, else by the manifest.
pub fn make_host(
    manifest: &SideloadManifest,
    backend_override: Option<&str>,
) -> Result<Arc<dyn HostBackend>, String> {
    let name = backend_override.unwrap_or(&manifest.host.backend);
    let templates = CommandTemplates::from_section(&manifest.host);
    let host = select_backend(name, templates).map_err(|e| e.to_string())?;
    Ok(Arc::from(host))
}

/// One line for each terminal state, used by the console renderer and for
/// desktop notifications.
pub fn terminal_message(state: &WorkflowState, deadline: Duration) -> Option<String> {
    let msg = match state {
        WorkflowState::Failed(AcquireError::PermissionDenied) => {
            "permission denied, nothing downloaded".to_owned()
        }
        WorkflowState::Failed(reason) => reason.to_string(),
        WorkflowState::Installed => "installed".to_owned(),
        WorkflowState::Launched => "installed and launched".to_owned(),
        WorkflowState::TimedOut => format!(
            "not confirmed within {}s, the installer may still be open",
            deadline.as_secs()
        ),
        _ => return None,
    };
    Some(msg)
}

pub fn exit_code_for(result: &Result<Outcome, CoreError>) -> u8 {
    match result {
        Ok(Outcome::Installed | Outcome::Launched) => EXIT_SUCCESS,
        Ok(Outcome::TimedOut) => EXIT_TIMED_OUT,
        Err(CoreError::Acquire(AcquireError::PermissionDenied)) => EXIT_PERMISSION_DENIED,
        Err(_) => EXIT_FAILURE,
    }
}

/// The more severe of two run exit codes: failure, then denial, then timeout.
pub fn worst_exit_code(a: u8, b: u8) -> u8 {
    fn rank(code: u8) -> u8 {
        match code {
            EXIT_SUCCESS => 0,
            EXIT_TIMED_OUT => 1,
            EXIT_PERMISSION_DENIED => 2,
            _ => 3,
        }
    }
    if rank(b) > rank(a) {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sideload_schema::{parse_manifest_str, ItemId};

    const MANIFEST: &str = r#"
manifest_version = 1

[[items]]
id = "space-jump"
title = "Space Jump!"
source_url = "https://example.com/space-jump.apk"
target_package = "com.example.spacejump"

[[items]]
id = "tower"
title = "Tower Defense"
source_url = "https://example.com/tower.apk"
target_package = "com.example.tower"
"#;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn colorize_state_keeps_label() {
        for label in ["installed", "downloading", "polling", "failed", "timed_out"] {
            assert!(colorize_state(label).contains(label));
        }
        assert_eq!(colorize_state("idle"), "idle");
    }

    #[test]
    fn resolve_item_lists_known_ids() {
        let catalog = parse_manifest_str(MANIFEST).unwrap().catalog().unwrap();
        assert_eq!(resolve_item(&catalog, "tower").unwrap().title, "Tower Defense");
        let err = resolve_item(&catalog, "chess").unwrap_err();
        assert!(err.contains("space-jump, tower"), "{err}");
    }

    #[test]
    fn make_host_honours_override() {
        let manifest = parse_manifest_str(MANIFEST).unwrap();
        assert_eq!(make_host(&manifest, Some("mock")).unwrap().name(), "mock");
        assert!(make_host(&manifest, Some("adb")).is_err());
    }

    #[test]
    fn terminal_messages() {
        let deadline = Duration::from_secs(20);
        assert_eq!(
            terminal_message(
                &WorkflowState::Failed(AcquireError::DownloadFailed { http_status: 404 }),
                deadline
            )
            .unwrap(),
            "download failed: HTTP 404"
        );
        assert!(terminal_message(&WorkflowState::TimedOut, deadline)
            .unwrap()
            .contains("20s"));
        assert!(terminal_message(&WorkflowState::Downloading, deadline).is_none());
    }

    #[test]
    fn exit_codes_follow_outcomes() {
        assert_eq!(exit_code_for(&Ok(Outcome::Launched)), EXIT_SUCCESS);
        assert_eq!(exit_code_for(&Ok(Outcome::TimedOut)), EXIT_TIMED_OUT);
        assert_eq!(
            exit_code_for(&Err(AcquireError::PermissionDenied.into())),
            EXIT_PERMISSION_DENIED
        );
        assert_eq!(
            exit_code_for(&Err(CoreError::InFlight(ItemId::new("a")))),
            EXIT_FAILURE
        );
    }

    #[test]
    fn worst_exit_code_prefers_failures() {
        assert_eq!(worst_exit_code(EXIT_SUCCESS, EXIT_TIMED_OUT), EXIT_TIMED_OUT);
        assert_eq!(
            worst_exit_code(EXIT_PERMISSION_DENIED, EXIT_TIMED_OUT),
            EXIT_PERMISSION_DENIED
        );
        assert_eq!(worst_exit_code(EXIT_FAILURE, EXIT_PERMISSION_DENIED), EXIT_FAILURE);
        assert_eq!(worst_exit_code(EXIT_SUCCESS, EXIT_SUCCESS), EXIT_SUCCESS);
    }

    #[test]
    fn spinner_finishes() {
        let pb = spinner("downloading");
        spin_ok(&pb, "done");
        let pb = spinner("downloading");
        spin_fail(&pb, "failed");
    }
}
