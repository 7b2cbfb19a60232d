use sideload_schema::FetchSection;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(sideload_schema::manifest::DEFAULT_FETCH_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn from_section(section: &FetchSection) -> Self {
        Self {
            timeout: Duration::from_secs(section.timeout_secs),
            user_agent: section
                .user_agent
                .clone()
                .unwrap_or_else(default_user_agent),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn default_user_agent() -> String {
    format!("sideload/{}", env!("CARGO_PKG_VERSION"))
}
