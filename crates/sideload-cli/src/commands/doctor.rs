use super::{json_pretty, make_host, EXIT_FAILURE, EXIT_SUCCESS};
use sideload_core::EngineSettings;
use sideload_host::{check_host_prereqs, format_missing, CommandTemplates};
use sideload_schema::{parse_manifest_file, SideloadManifest};
use std::path::Path;

pub fn run(manifest_path: &Path, backend: Option<&str>, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let manifest = check_manifest(manifest_path, &mut checks, &mut all_pass);
    if let Some(manifest) = &manifest {
        check_backend(manifest, backend, &mut checks, &mut all_pass);
        check_downloads_dir(manifest, &mut checks);
    }

    print_results(&checks, all_pass, json_output)
}

fn check_manifest(
    path: &Path,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) -> Option<SideloadManifest> {
    match parse_manifest_file(path) {
        Ok(manifest) => match manifest.catalog() {
            Ok(catalog) => {
                checks.push(Check::pass(
                    "manifest",
                    &format!("Manifest valid ({} catalog items)", catalog.len()),
                ));
                Some(manifest)
            }
            Err(e) => {
                *all_pass = false;
                checks.push(Check::fail("manifest", &format!("Catalog invalid: {e}")));
                Some(manifest)
            }
        },
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "manifest",
                &format!("Cannot load {}: {e}", path.display()),
            ));
            None
        }
    }
}

fn check_backend(
    manifest: &SideloadManifest,
    backend: Option<&str>,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let host = match make_host(manifest, backend) {
        Ok(host) => host,
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("host_backend", &e));
            return;
        }
    };

    if host.name() == "command" {
        let missing = check_host_prereqs(&CommandTemplates::from_section(&manifest.host));
        if missing.is_empty() {
            checks.push(Check::pass(
                "host_prereqs",
                "Handoff, query and launch commands found",
            ));
        } else {
            *all_pass = false;
            checks.push(Check::fail(
                "host_prereqs",
                &format!("Missing commands: {}", format_missing(&missing)),
            ));
        }
    }

    if host.available() {
        checks.push(Check::pass(
            "host_backend",
            &format!("Host backend '{}' available", host.name()),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "host_backend",
            &format!("Host backend '{}' is not available", host.name()),
        ));
    }

    if manifest.permission.require_consent {
        checks.push(Check::info(
            "permission",
            "Downloads ask for consent (use --yes to skip the prompt)",
        ));
    } else {
        checks.push(Check::info(
            "permission",
            "Downloads permitted by policy, no prompt",
        ));
    }
}

fn check_downloads_dir(manifest: &SideloadManifest, checks: &mut Vec<Check>) {
    let dir = EngineSettings::from_section(&manifest.settings).downloads_dir;
    match std::fs::metadata(&dir) {
        Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => checks.push(Check::pass(
            "downloads_dir",
            &format!("Downloads directory {}", dir.display()),
        )),
        Ok(meta) if meta.is_dir() => checks.push(Check::warn(
            "downloads_dir",
            &format!("Downloads directory {} is read-only", dir.display()),
        )),
        Ok(_) => checks.push(Check::warn(
            "downloads_dir",
            &format!("{} is not a directory", dir.display()),
        )),
        Err(_) => checks.push(Check::info(
            "downloads_dir",
            &format!(
                "Downloads directory {} will be created on first install",
                dir.display()
            ),
        )),
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("Sideload Doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
