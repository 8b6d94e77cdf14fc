//! Support to download avatars from HTTP endpoints.

use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use url::Url;

use crate::caching::{AvatarContents, AvatarError};

/// The user agent the avatar downloader identifies itself with.
const USER_AGENT: &str = concat!("prtracker/", env!("CARGO_PKG_VERSION"));

/// Downloader implementation for HTTP avatar endpoints.
#[derive(Debug)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Downloads the avatar payload at `url`.
    pub async fn download(&self, url: &Url) -> AvatarContents<Bytes> {
        tracing::debug!("Fetching avatar from `{}`", url);

        let builder = self
            .client
            .get(url.clone())
            .header(header::USER_AGENT, USER_AGENT);

        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.bytes().await?)
        } else if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            Err(AvatarError::NotFound)
        } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            let details = response.text().await.unwrap_or_default();
            Err(AvatarError::PermissionDenied(details))
        } else {
            Err(AvatarError::Download(format!(
                "server responded with {status}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_download_avatar() {
        prtracker_test::setup();

        let server = prtracker_test::Server::new();
        let downloader = HttpDownloader::new(Client::new());

        let body = downloader
            .download(&server.url("/avatars/alice"))
            .await
            .unwrap();

        assert_eq!(body.as_ref(), prtracker_test::avatar_png("alice"));
    }

    #[tokio::test]
    async fn test_download_avatar_missing() {
        prtracker_test::setup();

        let server = prtracker_test::Server::new();
        let downloader = HttpDownloader::new(Client::new());

        let result = downloader
            .download(&server.url("/respond_statuscode/404/avatar"))
            .await;

        assert_eq!(result, Err(AvatarError::NotFound));
    }

    #[tokio::test]
    async fn test_download_avatar_forbidden() {
        prtracker_test::setup();

        let server = prtracker_test::Server::new();
        let downloader = HttpDownloader::new(Client::new());

        let result = downloader
            .download(&server.url("/respond_statuscode/403/avatar"))
            .await;

        assert!(matches!(result, Err(AvatarError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_download_avatar_server_error() {
        prtracker_test::setup();

        let server = prtracker_test::Server::new();
        let downloader = HttpDownloader::new(Client::new());

        let result = downloader
            .download(&server.url("/respond_statuscode/503/avatar"))
            .await;

        assert!(matches!(result, Err(AvatarError::Download(_))));
    }
}
