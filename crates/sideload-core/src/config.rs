use sideload_schema::manifest::{
    DEFAULT_CONTENT_TYPE, DEFAULT_PACKAGE_EXTENSION, DEFAULT_POLL_DEADLINE_SECS,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PROVIDER_AUTHORITY,
};
use sideload_schema::{CatalogItem, SettingsSection};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Workflow settings, resolved from the manifest's `[settings]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub poll_interval: Duration,
    pub poll_deadline: Duration,
    pub auto_launch: bool,
    pub downloads_dir: PathBuf,
    pub package_extension: String,
    pub content_type: String,
    pub provider_authority: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_deadline: Duration::from_secs(DEFAULT_POLL_DEADLINE_SECS),
            auto_launch: false,
            downloads_dir: default_downloads_dir(),
            package_extension: DEFAULT_PACKAGE_EXTENSION.to_owned(),
            content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            provider_authority: DEFAULT_PROVIDER_AUTHORITY.to_owned(),
        }
    }
}

impl EngineSettings {
    pub fn from_section(section: &SettingsSection) -> Self {
        Self {
            poll_interval: Duration::from_secs(section.poll_interval_secs),
            poll_deadline: Duration::from_secs(section.poll_deadline_secs),
            auto_launch: section.auto_launch,
            downloads_dir: section
                .downloads_dir
                .as_deref()
                .map_or_else(default_downloads_dir, expand_tilde),
            package_extension: section.package_extension.clone(),
            content_type: section.content_type.clone(),
            provider_authority: section.provider_authority.clone(),
        }
    }

    #[must_use]
    pub fn with_downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.downloads_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_auto_launch(mut self, auto_launch: bool) -> Self {
        self.auto_launch = auto_launch;
        self
    }

    /// Where `item` is downloaded to.
    pub fn destination_for(&self, item: &CatalogItem) -> PathBuf {
        item.destination(&self.downloads_dir, &self.package_extension)
    }
}

/// `$XDG_DOWNLOAD_DIR`, else `$HOME/Downloads`, else a directory under the
/// system temp dir.
pub fn default_downloads_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_DOWNLOAD_DIR") {
        if !dir.is_empty() {
            return expand_tilde(&dir);
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join("Downloads")
    } else {
        std::env::temp_dir().join("sideload-downloads")
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_timings() {
        let settings = EngineSettings::from_section(&SettingsSection::default());
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.poll_deadline, Duration::from_secs(20));
        assert!(!settings.auto_launch);
        assert_eq!(settings.package_extension, "apk");
    }

    #[test]
    fn explicit_downloads_dir_wins() {
        let section = SettingsSection {
            downloads_dir: Some("/srv/packages".to_owned()),
            ..SettingsSection::default()
        };
        let settings = EngineSettings::from_section(&section);
        assert_eq!(settings.downloads_dir, PathBuf::from("/srv/packages"));
    }

    #[test]
    fn destination_combines_dir_title_and_extension() {
        let settings = EngineSettings::default()
            .with_downloads_dir("/dl")
            .with_auto_launch(true);
        let item = CatalogItem {
            id: "space-jump".into(),
            title: "Space Jump!".to_owned(),
            description: String::new(),
            icon: None,
            source_url: "https://example.com/sj.apk".to_owned(),
            target_package: "com.example.spacejump".into(),
        };
        assert_eq!(
            settings.destination_for(&item),
            PathBuf::from("/dl/SpaceJump.apk")
        );
        assert!(settings.auto_launch);
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("relative"), PathBuf::from("relative"));
    }
}
