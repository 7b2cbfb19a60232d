use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_POLL_DEADLINE_SECS: u64 = 20;
pub const DEFAULT_PACKAGE_EXTENSION: &str = "apk";
pub const DEFAULT_CONTENT_TYPE: &str = "application/vnd.android.package-archive";
pub const DEFAULT_PROVIDER_AUTHORITY: &str = "org.sideload.fileprovider";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

const KNOWN_HOST_BACKENDS: &[&str] = &["command", "mock"];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported manifest_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("settings.{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("settings.poll_interval_secs ({interval}) exceeds settings.poll_deadline_secs ({deadline})")]
    IntervalExceedsDeadline { interval: u64, deadline: u64 },
    #[error("settings.package_extension must be non-empty ASCII alphanumerics, got '{0}'")]
    InvalidExtension(String),
    #[error("unknown host backend '{0}', expected one of: command, mock")]
    UnknownBackend(String),
    #[error("host.{0} command must not be empty")]
    EmptyCommand(&'static str),
    #[error("catalog item #{0} has an empty id")]
    EmptyItemId(usize),
    #[error("duplicate catalog item id '{0}'")]
    DuplicateItemId(String),
    #[error("catalog item '{0}' has an empty title")]
    EmptyTitle(String),
    #[error("catalog item '{id}' source_url must be http(s)://..., got '{url}'")]
    InvalidSourceUrl { id: String, url: String },
    #[error("catalog item '{0}' has an empty target_package")]
    EmptyTargetPackage(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SideloadManifest {
    pub manifest_version: u32,
    #[serde(default)]
    pub settings: SettingsSection,
    #[serde(default)]
    pub fetch: FetchSection,
    #[serde(default)]
    pub permission: PermissionSection,
    #[serde(default)]
    pub host: HostSection,
    #[serde(default)]
    pub items: Vec<ItemEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    #[serde(default)]
    pub auto_launch: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_poll_deadline")]
    pub poll_deadline_secs: u64,
    #[serde(default)]
    pub downloads_dir: Option<String>,
    #[serde(default = "default_extension")]
    pub package_extension: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "default_authority")]
    pub provider_authority: String,
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            auto_launch: false,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            poll_deadline_secs: DEFAULT_POLL_DEADLINE_SECS,
            downloads_dir: None,
            package_extension: default_extension(),
            content_type: default_content_type(),
            provider_authority: default_authority(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FetchSection {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PermissionSection {
    /// Whether writing to shared storage needs an explicit user grant.
    #[serde(default = "default_true")]
    pub require_consent: bool,
}

impl Default for PermissionSection {
    fn default() -> Self {
        Self {
            require_consent: true,
        }
    }
}

/// Host integration. Command templates may use `{path}`, `{content_type}`,
/// `{authority}` and `{package}` placeholders.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_handoff")]
    pub handoff: Vec<String>,
    #[serde(default = "default_query")]
    pub query: Vec<String>,
    #[serde(default = "default_launch")]
    pub launch: Vec<String>,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            handoff: default_handoff(),
            query: default_query(),
            launch: default_launch(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ItemEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub source_url: String,
    pub target_package: String,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_poll_deadline() -> u64 {
    DEFAULT_POLL_DEADLINE_SECS
}

fn default_extension() -> String {
    DEFAULT_PACKAGE_EXTENSION.to_owned()
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_owned()
}

fn default_authority() -> String {
    DEFAULT_PROVIDER_AUTHORITY.to_owned()
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

fn default_backend() -> String {
    "command".to_owned()
}

fn default_handoff() -> Vec<String> {
    vec!["xdg-open".to_owned(), "{path}".to_owned()]
}

fn default_query() -> Vec<String> {
    vec!["dpkg-query".to_owned(), "-W".to_owned(), "{package}".to_owned()]
}

fn default_launch() -> Vec<String> {
    vec!["gtk-launch".to_owned(), "{package}".to_owned()]
}

impl SideloadManifest {
    /// Check everything except the catalog items, which `catalog()` validates.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.manifest_version != 1 {
            return Err(ManifestError::UnsupportedVersion(self.manifest_version));
        }

        let settings = &self.settings;
        if settings.poll_interval_secs == 0 {
            return Err(ManifestError::ZeroDuration("poll_interval_secs"));
        }
        if settings.poll_deadline_secs == 0 {
            return Err(ManifestError::ZeroDuration("poll_deadline_secs"));
        }
        if settings.poll_interval_secs > settings.poll_deadline_secs {
            return Err(ManifestError::IntervalExceedsDeadline {
                interval: settings.poll_interval_secs,
                deadline: settings.poll_deadline_secs,
            });
        }
        let ext = &settings.package_extension;
        if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ManifestError::InvalidExtension(ext.clone()));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ManifestError::ZeroDuration("fetch.timeout_secs"));
        }

        let backend = self.host.backend.trim().to_lowercase();
        if !KNOWN_HOST_BACKENDS.contains(&backend.as_str()) {
            return Err(ManifestError::UnknownBackend(self.host.backend.clone()));
        }
        for (name, argv) in [
            ("handoff", &self.host.handoff),
            ("query", &self.host.query),
            ("launch", &self.host.launch),
        ] {
            if argv.first().map_or(true, |p| p.trim().is_empty()) {
                return Err(ManifestError::EmptyCommand(name));
            }
        }
        Ok(())
    }
}

pub fn parse_manifest_str(input: &str) -> Result<SideloadManifest, ManifestError> {
    let manifest: SideloadManifest = toml::from_str(input)?;
    manifest.validate()?;
    Ok(manifest)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<SideloadManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let input = r#"
manifest_version = 1

[settings]
auto_launch = true
poll_interval_secs = 3
poll_deadline_secs = 30
downloads_dir = "/tmp/dl"
package_extension = "deb"
content_type = "application/vnd.debian.binary-package"
provider_authority = "org.example.files"

[fetch]
timeout_secs = 60
user_agent = "sideload-test"

[permission]
require_consent = false

[host]
backend = "mock"
handoff = ["pkexec", "apt", "install", "-y", "{path}"]
query = ["dpkg-query", "-W", "{package}"]
launch = ["{package}"]

[[items]]
id = "space-jump"
title = "Space Jump!"
description = "Arcade platformer"
icon = "space_jump.png"
source_url = "https://example.com/space-jump.apk"
target_package = "com.example.spacejump"
"#;
        let manifest = parse_manifest_str(input).expect("should parse");
        assert!(manifest.settings.auto_launch);
        assert_eq!(manifest.settings.poll_interval_secs, 3);
        assert_eq!(manifest.settings.downloads_dir.as_deref(), Some("/tmp/dl"));
        assert_eq!(manifest.settings.package_extension, "deb");
        assert_eq!(manifest.fetch.user_agent.as_deref(), Some("sideload-test"));
        assert!(!manifest.permission.require_consent);
        assert_eq!(manifest.host.backend, "mock");
        assert_eq!(manifest.host.handoff.len(), 5);
        assert_eq!(manifest.items.len(), 1);
        assert_eq!(manifest.items[0].icon.as_deref(), Some("space_jump.png"));
    }

    #[test]
    fn minimal_manifest_uses_reference_defaults() {
        let manifest = parse_manifest_str("manifest_version = 1\n").expect("should parse");
        assert!(!manifest.settings.auto_launch);
        assert_eq!(manifest.settings.poll_interval_secs, 2);
        assert_eq!(manifest.settings.poll_deadline_secs, 20);
        assert_eq!(manifest.settings.package_extension, "apk");
        assert_eq!(manifest.settings.content_type, DEFAULT_CONTENT_TYPE);
        assert!(manifest.permission.require_consent);
        assert_eq!(manifest.host.backend, "command");
        assert!(manifest.items.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let input = r"
manifest_version = 1

[settings]
retries = 3
";
        assert!(matches!(
            parse_manifest_str(input),
            Err(ManifestError::ParseToml(_))
        ));
    }

    #[test]
    fn rejects_wrong_version() {
        assert!(matches!(
            parse_manifest_str("manifest_version = 2\n"),
            Err(ManifestError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn rejects_interval_longer_than_deadline() {
        let input = r"
manifest_version = 1
[settings]
poll_interval_secs = 30
poll_deadline_secs = 20
";
        assert!(matches!(
            parse_manifest_str(input),
            Err(ManifestError::IntervalExceedsDeadline {
                interval: 30,
                deadline: 20
            })
        ));
    }

    #[test]
    fn rejects_zero_interval() {
        let input = "manifest_version = 1\n[settings]\npoll_interval_secs = 0\n";
        assert!(matches!(
            parse_manifest_str(input),
            Err(ManifestError::ZeroDuration("poll_interval_secs"))
        ));
    }

    #[test]
    fn rejects_bad_extension() {
        let input = "manifest_version = 1\n[settings]\npackage_extension = \".apk\"\n";
        assert!(matches!(
            parse_manifest_str(input),
            Err(ManifestError::InvalidExtension(_))
        ));
    }

    #[test]
    fn rejects_unknown_backend() {
        let input = "manifest_version = 1\n[host]\nbackend = \"adb\"\n";
        assert!(matches!(
            parse_manifest_str(input),
            Err(ManifestError::UnknownBackend(_))
        ));
    }

    #[test]
    fn rejects_empty_command() {
        let input = "manifest_version = 1\n[host]\nquery = []\n";
        assert!(matches!(
            parse_manifest_str(input),
            Err(ManifestError::EmptyCommand("query"))
        ));
    }

    #[test]
    fn parse_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_manifest_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }

    #[test]
    fn demo_manifest_parses() {
        let manifest = parse_manifest_str(include_str!("../../../demos/sideload.toml")).unwrap();
        assert_eq!(manifest.catalog().unwrap().len(), 2);
        assert_eq!(manifest.host.backend, "command");
        assert_eq!(manifest.settings.poll_deadline_secs, DEFAULT_POLL_DEADLINE_SECS);
    }
}
