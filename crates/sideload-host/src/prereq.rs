use std::fmt;
use std::process::Command;

/// A host command the configured backend needs but cannot find.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  - {}: needed for {}", self.name, self.purpose)
    }
}

pub(crate) fn command_exists(name: &str) -> bool {
    if name.contains('/') {
        return std::path::Path::new(name).is_file();
    }
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check the programs named by the handoff, query and launch templates.
/// An empty result means every program was found.
pub fn check_host_prereqs(templates: &crate::CommandTemplates) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    for (argv, purpose) in [
        (&templates.handoff, "installer handoff"),
        (&templates.query, "install detection"),
        (&templates.launch, "launching installed packages"),
    ] {
        let Some(program) = argv.first() else {
            continue;
        };
        // Templated program names are only known per package.
        if program.contains('{') {
            continue;
        }
        if !command_exists(program) && !missing.iter().any(|m: &MissingPrereq| m.name == *program)
        {
            missing.push(MissingPrereq {
                name: program.clone(),
                purpose,
            });
        }
    }
    missing
}

pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing host commands:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nAdjust the [host] section of the manifest or install these tools.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandTemplates;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn present_commands_are_not_reported() {
        let templates = CommandTemplates {
            handoff: argv(&["sh", "-c", "true"]),
            query: argv(&["true"]),
            launch: argv(&["{package}"]),
        };
        assert!(check_host_prereqs(&templates).is_empty());
    }

    #[test]
    fn missing_commands_are_reported_once() {
        let templates = CommandTemplates {
            handoff: argv(&["sideload-no-such-installer", "{path}"]),
            query: argv(&["sideload-no-such-query"]),
            launch: argv(&["sideload-no-such-installer"]),
        };
        let missing = check_host_prereqs(&templates);
        let names: Vec<&str> = missing.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["sideload-no-such-installer", "sideload-no-such-query"]);
        assert_eq!(missing[0].purpose, "installer handoff");
    }

    #[test]
    fn format_missing_lists_each_command() {
        let output = format_missing(&[MissingPrereq {
            name: "xdg-open".to_owned(),
            purpose: "installer handoff",
        }]);
        assert!(output.starts_with("missing host commands:"));
        assert!(output.contains("xdg-open: needed for installer handoff"));
    }
}
