use std::future::Future;
use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::atomic;
use crate::core::error::{McdexError, McdexResult};
use crate::core::http::build_http_client;

/// Blocking-at-the-call-site HTTP fetcher.
///
/// Follows redirects (see [`crate::core::http::MAX_REDIRECTS`]), turns any
/// non-2xx answer into [`McdexError::Http`] and never retries. Every fetch
/// races the shared cancellation token so an interrupt closes the socket.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(cancel: CancellationToken) -> McdexResult<Self> {
        Ok(Self::with_client(build_http_client()?, cancel))
    }

    pub fn with_client(client: Client, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Token shared with everything else an interrupt must stop.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// The body lands in a temp file beside `dest` and is renamed into place
    /// only once complete; on any failure, or if the future is dropped, the
    /// temp file is removed and `dest` is untouched.
    pub async fn fetch_to_file(&self, url: &str, dest: &Path) -> McdexResult<u64> {
        let temp = atomic::temp_path_for(dest)?;

        let written = self
            .cancellable(async {
                let response = self.get(url).await?;
                let mut file = tokio::fs::File::create(&temp)
                    .await
                    .map_err(|e| McdexError::io(temp.to_path_buf(), e))?;

                let mut written = 0_u64;
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    file.write_all(&chunk)
                        .await
                        .map_err(|e| McdexError::io(temp.to_path_buf(), e))?;
                    written += chunk.len() as u64;
                }

                file.flush()
                    .await
                    .map_err(|e| McdexError::io(temp.to_path_buf(), e))?;
                file.sync_all()
                    .await
                    .map_err(|e| McdexError::io(temp.to_path_buf(), e))?;
                // handle must be closed before the rename on Windows
                drop(file);
                Ok(written)
            })
            .await?;

        atomic::persist(temp, dest)?;
        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }

    async fn get(&self, url: &str) -> McdexResult<reqwest::Response> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(McdexError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = McdexResult<T>>) -> McdexResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(McdexError::Cancelled),
            result = fut => result,
        }
    }
}
