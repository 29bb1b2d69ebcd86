//! Asset download: explicit redirect following and atomic streaming to disk

use std::path::Path;

use futures::StreamExt;
use log::debug;
use reqwest::StatusCode;
use reqwest::header::LOCATION;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use super::github::ReleaseClient;
use crate::error::{DownloadFailure, LauncherError, Result};
use crate::install::detection::PARTIAL_SUFFIX;

fn failed(url: &str, reason: DownloadFailure) -> LauncherError {
    LauncherError::Download {
        url: url.to_string(),
        reason,
    }
}

impl ReleaseClient {
    /// Download `url` to `destination`, following up to `max_redirects` 301/302 hops.
    ///
    /// The body is streamed into `<destination>.XXXXXX.partial` next to
    /// `destination` and renamed over it once complete; on any failure `destination` is left
    /// untouched and the partial file is removed. Returns the byte count.
    pub async fn download_asset(&self, url: &str, destination: &Path) -> Result<u64> {
        let mut current = reqwest::Url::parse(url)
            .map_err(|e| failed(url, DownloadFailure::Transport(e.to_string())))?;

        for hop in 0..=self.max_redirects {
            debug!("GET {current}");
            let response = self
                .http
                .get(current.clone())
                .timeout(self.download_timeout)
                .send()
                .await
                .map_err(|e| failed(url, DownloadFailure::Transport(e.to_string())))?;

            match response.status() {
                StatusCode::OK => return self.stream_to_file(url, response, destination).await,
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => {
                    let location = response
                        .headers()
                        .get(LOCATION)
                        .and_then(|value| value.to_str().ok())
                        .ok_or_else(|| failed(url, DownloadFailure::MissingLocation))?;
                    // Location may be relative to the URL that answered
                    current = current
                        .join(location)
                        .map_err(|_| failed(url, DownloadFailure::MissingLocation))?;
                    debug!("Redirect {} of {} to {current}", hop + 1, self.max_redirects);
                }
                status => {
                    return Err(failed(
                        url,
                        DownloadFailure::Status {
                            code: status.as_u16(),
                            message: status.canonical_reason().unwrap_or_default().to_string(),
                        },
                    ));
                }
            }
        }

        Err(failed(
            url,
            DownloadFailure::TooManyRedirects {
                limit: self.max_redirects,
            },
        ))
    }

    async fn stream_to_file(
        &self,
        url: &str,
        response: reqwest::Response,
        destination: &Path,
    ) -> Result<u64> {
        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| failed(url, e.into()))?;

        // Removed on drop unless persisted. Named after the destination so an
        // interrupted run is recognised as a leftover of the same install.
        let name = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let partial = tempfile::Builder::new()
            .prefix(&format!("{name}."))
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| failed(url, e.into()))?;
        let handle = partial
            .as_file()
            .try_clone()
            .map_err(|e| failed(url, e.into()))?;
        let mut file = tokio::fs::File::from_std(handle);

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let chunk = match timeout(self.inactivity_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => {
                    return Err(failed(url, DownloadFailure::Transport(e.to_string())));
                }
                Ok(None) => break,
                Err(_) => {
                    return Err(failed(
                        url,
                        DownloadFailure::Stalled {
                            secs: self.inactivity_timeout.as_secs(),
                        },
                    ));
                }
            };

            file.write_all(&chunk)
                .await
                .map_err(|e| failed(url, e.into()))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| failed(url, e.into()))?;
        file.sync_all().await.map_err(|e| failed(url, e.into()))?;
        drop(file);

        partial
            .persist(destination)
            .map_err(|e| failed(url, e.error.into()))?;

        debug!("Wrote {written} bytes to {}", destination.display());
        Ok(written)
    }
}
