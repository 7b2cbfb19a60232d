//! Package transfer for Sideload.
//!
//! A `Fetcher` performs one blocking GET of a binary payload into a destination
//! path and reports the HTTP status it got. Only status 200 writes the file; the
//! caller decides what any other status means. `HttpFetcher` is the ureq-backed
//! implementation, `MockFetcher` a scripted stand-in for tests and demos.

pub mod config;
pub mod http;
pub mod mock;

pub use config::FetchConfig;
pub use http::HttpFetcher;
pub use mock::MockFetcher;

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The only status treated as a successful transfer.
pub const HTTP_OK: u16 = 200;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outcome of a completed request, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    pub status_code: u16,
    pub local_path: PathBuf,
    /// Bytes written to `local_path`; zero unless the status was 200.
    pub bytes: u64,
    /// blake3 of the written payload, present only for status 200.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blake3: Option<String>,
}

impl DownloadResult {
    pub fn is_ok(&self) -> bool {
        self.status_code == HTTP_OK
    }
}

pub trait Fetcher: Send + Sync {
    /// GET `url` into `dest`. Returns `Err` only when no HTTP status was obtained
    /// or the payload could not be written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<DownloadResult, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_is_ok() {
        let mut result = DownloadResult {
            status_code: 200,
            local_path: PathBuf::from("/tmp/a.apk"),
            bytes: 3,
            blake3: None,
        };
        assert!(result.is_ok());
        for code in [201, 204, 206, 301, 404, 500] {
            result.status_code = code;
            assert!(!result.is_ok(), "{code}");
        }
    }
}
