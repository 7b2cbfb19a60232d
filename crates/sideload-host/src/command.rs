use crate::backend::HostBackend;
use crate::prereq::command_exists;
use crate::HostError;
use sideload_schema::{HostSection, PackageId};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

/// Environment variable carrying the provider authority to the installer.
pub const PROVIDER_AUTHORITY_ENV: &str = "SIDELOAD_PROVIDER_AUTHORITY";

/// argv templates for the three host calls. Any argument may contain
/// `{path}`, `{content_type}`, `{authority}` or `{package}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplates {
    pub handoff: Vec<String>,
    pub query: Vec<String>,
    pub launch: Vec<String>,
}

impl CommandTemplates {
    pub fn from_section(section: &HostSection) -> Self {
        Self {
            handoff: section.handoff.clone(),
            query: section.query.clone(),
            launch: section.launch.clone(),
        }
    }
}

fn render(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
        })
        .collect()
}

fn command_for(argv: &[String]) -> Command {
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);
    cmd
}

/// Reap a detached child so it does not linger as a zombie.
fn reap_in_background(what: &'static str, mut child: Child) {
    std::thread::spawn(move || match child.wait() {
        Ok(status) => debug!("{what} process exited: {status}"),
        Err(e) => warn!("waiting on {what} process failed: {e}"),
    });
}

/// Host backend driven by external commands (e.g. `xdg-open`, `dpkg-query`).
pub struct CommandBackend {
    templates: CommandTemplates,
}

impl CommandBackend {
    pub fn new(templates: CommandTemplates) -> Result<Self, HostError> {
        for (name, argv) in [
            ("handoff", &templates.handoff),
            ("query", &templates.query),
            ("launch", &templates.launch),
        ] {
            if argv.first().map_or(true, |p| p.trim().is_empty()) {
                return Err(HostError::EmptyCommand(name));
            }
        }
        Ok(Self { templates })
    }

    pub fn templates(&self) -> &CommandTemplates {
        &self.templates
    }
}

impl HostBackend for CommandBackend {
    fn name(&self) -> &'static str {
        "command"
    }

    fn available(&self) -> bool {
        command_exists(&self.templates.handoff[0]) && command_exists(&self.templates.query[0])
    }

    fn hand_off(
        &self,
        path: &Path,
        content_type: &str,
        authority: &str,
    ) -> Result<(), HostError> {
        let path_str = path.to_string_lossy().into_owned();
        let argv = render(
            &self.templates.handoff,
            &[
                ("path", path_str.as_str()),
                ("content_type", content_type),
                ("authority", authority),
            ],
        );
        info!("handing {} to installer: {}", path.display(), argv.join(" "));
        let child = command_for(&argv)
            .env(PROVIDER_AUTHORITY_ENV, authority)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HostError::Handoff(format!("{}: {e}", argv[0])))?;
        reap_in_background("installer", child);
        Ok(())
    }

    fn is_installed(&self, package: &PackageId) -> Result<bool, HostError> {
        let argv = render(&self.templates.query, &[("package", package.as_str())]);
        let output = command_for(&argv)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| HostError::Query(format!("{}: {e}", argv[0])))?;
        debug!("install query for {package}: {}", output.status);
        Ok(output.status.success())
    }

    fn launch(&self, package: &PackageId) -> Result<(), HostError> {
        let argv = render(&self.templates.launch, &[("package", package.as_str())]);
        info!("launching {package}: {}", argv.join(" "));
        let child = command_for(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HostError::Launch(format!("{}: {e}", argv[0])))?;
        reap_in_background("launch", child);
        Ok(())
    }
}
