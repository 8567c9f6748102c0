//! HTTP client for the runtime CDN

use std::path::Path;

use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::archive::{extract_archive_file, spool_file};
use crate::config::USER_AGENT;
use crate::error::FetchError;

/// Longest payload excerpt carried by a decode error
const SNIPPET_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// GET `url`, mapping any non-2xx status to an error
    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| network(url, source))?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            warn!("{} returned status {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    /// GET `url` and return the body
    pub async fn bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let body = self
            .send(url)
            .await?
            .bytes()
            .await
            .map_err(|source| network(url, source))?;
        Ok(body.to_vec())
    }

    /// GET `url` and decode the JSON body
    pub async fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.bytes(url).await?;
        serde_json::from_slice(&body).map_err(|e| {
            let snippet: String = String::from_utf8_lossy(&body)
                .chars()
                .take(SNIPPET_LEN)
                .collect();
            FetchError::InvalidResponse {
                url: url.to_string(),
                reason: e.to_string(),
                snippet,
            }
        })
    }

    /// Stream an archive into a temporary file, then extract it into `dir`
    pub async fn fetch_archive(
        &self,
        url: &str,
        dir: &Path,
        strip: usize,
    ) -> Result<(), FetchError> {
        let mut response = self.send(url).await?;
        let (temp, mut file) = spool_file()?;
        let write_error = |e| FetchError::io(format!("writing {}", temp.path().display()), e);

        let mut size = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| network(url, source))?
        {
            size += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(write_error)?;
        }
        file.flush().await.map_err(write_error)?;
        debug!("Downloaded {} bytes from {}", size, url);

        extract_archive_file(temp.path(), dir, strip)
    }
}

fn network(url: &str, source: reqwest::Error) -> FetchError {
    FetchError::Network {
        url: url.to_string(),
        source,
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}
