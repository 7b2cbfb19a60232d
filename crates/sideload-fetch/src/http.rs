use crate::{DownloadResult, FetchConfig, FetchError, Fetcher, HTTP_OK};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const CHUNK_SIZE: usize = 64 * 1024;

/// ureq-backed fetcher.
///
/// Status codes are never turned into errors: a 404 comes back as a
/// `DownloadResult` with `status_code: 404` and nothing written. A 200 body is
/// streamed into a temp file beside `dest` and renamed over it, so a failed
/// transfer never leaves a truncated package under the final name.
pub struct HttpFetcher {
    config: FetchConfig,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self { config, agent }
    }

    fn write_body(
        reader: &mut impl Read,
        dest: &Path,
    ) -> Result<(u64, blake3::Hasher), FetchError> {
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total: u64 = 0;
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            tmp.write_all(&buf[..n])?;
            total += n as u64;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(dest).map_err(|e| FetchError::Io(e.error))?;
        Ok((total, hasher))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<DownloadResult, FetchError> {
        debug!("GET {url} -> {}", dest.display());
        let resp = self
            .agent
            .get(url)
            .header("User-Agent", &self.config.user_agent)
            .call()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status_code = resp.status().as_u16();
        if status_code != HTTP_OK {
            debug!("GET {url} returned HTTP {status_code}, nothing written");
            return Ok(DownloadResult {
                status_code,
                local_path: dest.to_path_buf(),
                bytes: 0,
                blake3: None,
            });
        }

        let mut reader = resp.into_body().into_reader();
        let (bytes, hasher) = Self::write_body(&mut reader, dest)?;
        let digest = hasher.finalize().to_hex().to_string();
        info!("downloaded {bytes} bytes to {}", dest.display());

        Ok(DownloadResult {
            status_code,
            local_path: dest.to_path_buf(),
            bytes,
            blake3: Some(digest),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_body_persists_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/SpaceJump.apk");
        let payload = b"PK\x03\x04 fake package".to_vec();

        let (bytes, hasher) = HttpFetcher::write_body(&mut payload.as_slice(), &dest).unwrap();
        assert_eq!(bytes, payload.len() as u64);
        assert_eq!(fs::read(&dest).unwrap(), payload);
        assert_eq!(hasher.finalize(), blake3::hash(&payload));
    }

    #[test]
    fn write_body_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Tower.apk");
        fs::write(&dest, b"old contents that are longer").unwrap();

        HttpFetcher::write_body(&mut b"new".as_slice(), &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn connection_refused_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(FetchConfig::default());
        let err = fetcher
            .fetch("http://127.0.0.1:1/pkg.apk", &dir.path().join("pkg.apk"))
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert!(!dir.path().join("pkg.apk").exists());
    }
}
