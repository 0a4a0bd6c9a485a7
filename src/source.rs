//! Where source card images come from: the remote card image host for the
//! cards pass, and a local directory for the alias pass.

use crate::{error::ItemError, records::image_file_name};
use anyhow::{Context, Result};
use fs_err as fs;
use reqwest::{blocking::Client, StatusCode};
use std::{io::ErrorKind, path::PathBuf, time::Duration};

pub const DEFAULT_BASE_URL: &str = "https://images.ygoprodeck.com/images/cards";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub trait ImageSource {
    /// Raw bytes of the source image for `code`.
    fn fetch(&self, code: u64) -> Result<Vec<u8>, ItemError>;

    /// Human readable location of `code`, used in log lines.
    fn locate(&self, code: u64) -> String;
}

/// Blocking HTTP source. One client is reused for every request.
#[derive(Debug)]
pub struct RemoteSource {
    client: Client,
    base_url: String,
}

impl RemoteSource {
    pub fn new(base_url: &str) -> Result<RemoteSource> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(RemoteSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, code: u64) -> String {
        format!("{}/{}", self.base_url, image_file_name(code))
    }
}

impl ImageSource for RemoteSource {
    fn fetch(&self, code: u64) -> Result<Vec<u8>, ItemError> {
        let url = self.url_for(code);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| ItemError::Fetch {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ItemError::NotFound { location: url });
        }
        if !status.is_success() {
            return Err(ItemError::Status { url, status });
        }

        let body = response
            .bytes()
            .map_err(|source| ItemError::Fetch { url, source })?;
        Ok(body.to_vec())
    }

    fn locate(&self, code: u64) -> String {
        self.url_for(code)
    }
}

/// Reads `{code}.jpg` from a directory of pre-downloaded images.
#[derive(Debug, Clone)]
pub struct LocalSource {
    dir: PathBuf,
}

impl LocalSource {
    pub fn new(dir: impl Into<PathBuf>) -> LocalSource {
        LocalSource { dir: dir.into() }
    }

    pub fn path_for(&self, code: u64) -> PathBuf {
        self.dir.join(image_file_name(code))
    }
}

impl ImageSource for LocalSource {
    fn fetch(&self, code: u64) -> Result<Vec<u8>, ItemError> {
        let path = self.path_for(code);
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(ItemError::NotFound {
                location: path.display().to_string(),
            }),
            Err(err) => Err(ItemError::Read(err)),
        }
    }

    fn locate(&self, code: u64) -> String {
        self.path_for(code).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn remote_url_follows_code_pattern() {
        let remote = RemoteSource::new(DEFAULT_BASE_URL).unwrap();
        assert_eq!(
            remote.url_for(21044178),
            "https://images.ygoprodeck.com/images/cards/21044178.jpg"
        );
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let remote = RemoteSource::new("http://localhost:8080/cards/").unwrap();
        assert_eq!(remote.url_for(1), "http://localhost:8080/cards/1.jpg");
    }

    #[test]
    fn missing_local_file_is_a_skip() {
        let dir = TempDir::new().unwrap();
        let err = LocalSource::new(dir.path()).fetch(12345).unwrap_err();

        assert!(err.is_skip());
        assert!(err.to_string().contains("12345.jpg"));
    }

    #[test]
    fn reads_local_file_bytes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("42.jpg"), b"not really a jpeg").unwrap();

        let data = LocalSource::new(dir.path()).fetch(42).unwrap();
        assert_eq!(data, b"not really a jpeg");
    }
}
