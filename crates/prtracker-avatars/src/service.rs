use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::caching::{AvatarCacher, AvatarContents, AvatarKey, AvatarRequest};
use crate::config::Config;
use crate::download::FetchService;
use crate::types::{Avatar, Identity};

/// A request to fetch one identity's avatar via the [`FetchService`].
#[derive(Debug, Clone)]
pub struct AvatarDownload {
    identity: Identity,
    fetcher: Arc<FetchService>,
}

impl AvatarRequest for AvatarDownload {
    fn cache_key(&self) -> AvatarKey {
        AvatarKey::from_identity(&self.identity)
    }

    fn fetch(&self) -> BoxFuture<'static, AvatarContents> {
        let fetcher = self.fetcher.clone();
        let url = self.identity.avatar_url.clone();

        async move { fetcher.fetch_avatar(&url).await }.boxed()
    }
}

/// The avatar resolution surface consumed by the dashboard's view layer.
///
/// Cloning is cheap; all clones share the same cache and HTTP client.
#[derive(Debug, Clone)]
pub struct AvatarService {
    cacher: AvatarCacher,
    fetcher: Arc<FetchService>,
}

impl AvatarService {
    pub fn new(config: &Config) -> Self {
        Self {
            cacher: AvatarCacher::new(),
            fetcher: FetchService::new(config),
        }
    }

    /// Resolves the avatar for `identity`, downloading it at most once.
    ///
    /// Concurrent calls for the same identity are coalesced into a single
    /// download. A failed download is reported to all waiting callers and
    /// retried on the next call.
    pub async fn get_avatar(&self, identity: &Identity) -> AvatarContents {
        let request = AvatarDownload {
            identity: identity.clone(),
            fetcher: self.fetcher.clone(),
        };

        self.cacher.fetch_memoized(request).await
    }

    /// Non-blocking lookup of an already resolved avatar.
    ///
    /// Redraw paths call this first and only await [`get_avatar`] when they
    /// can tolerate latency, e.g. for placeholder-then-update rendering.
    ///
    /// [`get_avatar`]: AvatarService::get_avatar
    pub fn try_get_cached(&self, identity: &Identity) -> Option<Avatar> {
        self.cacher.try_get_cached(&AvatarKey::from_identity(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::future;

    use crate::caching::AvatarError;

    fn identity(name: &str, url: url::Url) -> Identity {
        Identity {
            id: name.to_owned(),
            display_name: name.to_owned(),
            avatar_url: url,
        }
    }

    #[tokio::test]
    async fn test_burst_is_coalesced_into_one_download() {
        prtracker_test::setup();

        let hitcounter = prtracker_test::HitCounter::new();
        let service = AvatarService::new(&Config::default());
        let alice = identity("alice", hitcounter.url("/avatars/alice"));

        assert!(service.try_get_cached(&alice).is_none());

        let results = future::join_all((0..10).map(|_| service.get_avatar(&alice))).await;
        for result in results {
            assert_eq!(result.unwrap().dimensions(), (16, 16));
        }

        assert_eq!(hitcounter.accesses(), 1);
        assert!(service.try_get_cached(&alice).is_some());
    }

    #[tokio::test]
    async fn test_failed_download_is_not_cached() {
        prtracker_test::setup();

        let hitcounter = prtracker_test::HitCounter::new();
        let service = AvatarService::new(&Config::default());
        let ghost = identity("ghost", hitcounter.url("/respond_statuscode/404/ghost"));

        assert_eq!(service.get_avatar(&ghost).await, Err(AvatarError::NotFound));
        assert!(service.try_get_cached(&ghost).is_none());

        // The miss is not cached, the next call hits the server again.
        assert_eq!(service.get_avatar(&ghost).await, Err(AvatarError::NotFound));
        assert_eq!(hitcounter.accesses(), 2);
    }
}
