use std::time::Duration;

/// Various timeouts for the avatar downloader.
#[derive(Copy, Clone, Debug)]
pub struct DownloadTimeouts {
    /// The timeout for establishing a connection.
    pub connect: Duration,
    /// Global timeout for one avatar fetch, including the bounded retry.
    pub max_download: Duration,
}

impl DownloadTimeouts {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            connect: config.connect_timeout,
            max_download: config.max_download_timeout,
        }
    }
}

impl Default for DownloadTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(500),
            max_download: Duration::from_secs(15),
        }
    }
}

/// Creates a [`reqwest::Client`] with the provided options.
///
/// Only the connect timeout is enforced at the client level; the global
/// per-fetch deadline is enforced by the
/// [`FetchService`](crate::download::FetchService) around the whole retry
/// chain.
pub fn create_client(timeouts: &DownloadTimeouts) -> reqwest::Client {
    reqwest::ClientBuilder::new()
        .gzip(true)
        .hickory_dns(true)
        .connect_timeout(timeouts.connect)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .unwrap()
}
