//! The fetch pipeline: HTTP retrieval and decode of avatar images.
//!
//! From the cache's perspective this is opaque I/O with two outcomes: a
//! decoded image, or an [`AvatarError`]. Invocations for different keys are
//! independent and share nothing but the HTTP client.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::caching::{AvatarContents, AvatarError};
use crate::config::Config;
use crate::types::Avatar;
use crate::utils::http::{DownloadTimeouts, create_client};

mod http;

impl AvatarError {
    fn download_error(mut error: &dyn Error) -> Self {
        while let Some(src) = error.source() {
            error = src;
        }

        Self::Download(error.to_string())
    }
}

impl From<reqwest::Error> for AvatarError {
    fn from(error: reqwest::Error) -> Self {
        Self::download_error(&error)
    }
}

/// A service which can download and decode avatar images.
///
/// The service is deliberately simple: one shared client, a bounded retry,
/// and a global per-fetch deadline.
#[derive(Debug)]
pub struct FetchService {
    timeouts: DownloadTimeouts,
    http: http::HttpDownloader,
}

impl FetchService {
    pub fn new(config: &Config) -> Arc<Self> {
        let timeouts = DownloadTimeouts::from_config(config);
        let client = create_client(&timeouts);

        Arc::new(Self {
            timeouts,
            http: http::HttpDownloader::new(client),
        })
    }

    /// Downloads and decodes the avatar at `url`.
    ///
    /// The whole attempt, including the retry, is bounded by the configured
    /// download timeout.
    pub async fn fetch_avatar(&self, url: &Url) -> AvatarContents {
        let timeout = self.timeouts.max_download;
        let job = retry(|| self.download_and_decode(url));
        let job = tokio::time::timeout(timeout, job);

        let result = match job.await {
            Err(_) => Err(AvatarError::Timeout(timeout)),
            Ok(res) => res,
        };

        match &result {
            Ok(_) => tracing::debug!("Avatar `{}` fetched successfully", url),
            Err(err) => tracing::debug!("Avatar `{}` fetching failed: {}", url, err),
        }

        result
    }

    async fn download_and_decode(&self, url: &Url) -> AvatarContents {
        let body = self.http.download(url).await?;
        decode_avatar(&body)
    }
}

/// Decodes the downloaded payload into an [`Avatar`].
///
/// Decode errors are treated as malformed payloads. It is more likely that
/// the error comes from a corrupt or non-image response than a local fault.
fn decode_avatar(body: &Bytes) -> AvatarContents {
    let image =
        image::load_from_memory(body).map_err(|e| AvatarError::Malformed(e.to_string()))?;
    Ok(Avatar::new(image))
}

/// Try to run a future up to 2 times with a 20 millisecond delay on failure.
async fn retry<G, F>(task_gen: G) -> AvatarContents
where
    G: Fn() -> F,
    F: Future<Output = AvatarContents>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        let result = task_gen().await;

        // its highly unlikely we get a different result when retrying these
        let should_not_retry = matches!(
            result,
            Ok(_) | Err(AvatarError::NotFound | AvatarError::PermissionDenied(_))
        );

        if should_not_retry || tries >= 2 {
            break result;
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
