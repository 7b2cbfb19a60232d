use crate::{DownloadResult, FetchError, Fetcher, HTTP_OK};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

enum Script {
    Status(u16),
    Fail(String),
    Panic,
}

/// Scripted fetcher. Answers every request the same way and records each call.
pub struct MockFetcher {
    script: Script,
    payload: Vec<u8>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl MockFetcher {
    /// Every request answers 200 and writes `payload` to the destination.
    pub fn ok(payload: impl Into<Vec<u8>>) -> Self {
        Self::scripted(Script::Status(HTTP_OK), payload.into())
    }

    /// Every request answers with `code`; only 200 writes anything.
    pub fn status(code: u16) -> Self {
        Self::scripted(Script::Status(code), b"mock-package".to_vec())
    }

    /// Every request fails before a status is received.
    pub fn failing(cause: &str) -> Self {
        Self::scripted(Script::Fail(cause.to_owned()), Vec::new())
    }

    /// Every request panics, standing in for a fault inside the transfer layer.
    pub fn panicking() -> Self {
        Self::scripted(Script::Panic, Vec::new())
    }

    fn scripted(script: Script, payload: Vec<u8>) -> Self {
        Self {
            script,
            payload,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<DownloadResult, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((url.to_owned(), dest.to_path_buf()));
        }
        match &self.script {
            Script::Fail(cause) => Err(FetchError::Transport(cause.clone())),
            Script::Panic => panic!("mock fetcher fault for {url}"),
            Script::Status(code) if *code == HTTP_OK => {
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(dest, &self.payload)?;
                Ok(DownloadResult {
                    status_code: *code,
                    local_path: dest.to_path_buf(),
                    bytes: self.payload.len() as u64,
                    blake3: Some(blake3::hash(&self.payload).to_hex().to_string()),
                })
            }
            Script::Status(code) => Ok(DownloadResult {
                status_code: *code,
                local_path: dest.to_path_buf(),
                bytes: 0,
                blake3: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_writes_payload_and_records_call() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("SpaceJump.apk");
        let fetcher = MockFetcher::ok(b"apk-bytes".to_vec());

        let result = fetcher.fetch("https://example.com/a.apk", &dest).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.bytes, 9);
        assert_eq!(std::fs::read(&dest).unwrap(), b"apk-bytes");
        assert_eq!(
            fetcher.calls(),
            vec![("https://example.com/a.apk".to_owned(), dest)]
        );
    }

    #[test]
    fn non_200_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("SpaceJump.apk");
        let result = MockFetcher::status(404)
            .fetch("https://example.com/a.apk", &dest)
            .unwrap();
        assert_eq!(result.status_code, 404);
        assert!(!dest.exists());
    }

    #[test]
    fn failing_returns_transport_error() {
        let fetcher = MockFetcher::failing("connection reset");
        let err = fetcher
            .fetch("https://example.com/a.apk", Path::new("/nonexistent/a.apk"))
            .unwrap_err();
        assert_eq!(err.to_string(), "transport error: connection reset");
        assert_eq!(fetcher.call_count(), 1);
    }
}
