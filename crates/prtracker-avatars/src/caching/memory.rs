use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};

use super::{AvatarContents, AvatarError, AvatarKey, AvatarStore};
use crate::types::Avatar;
use crate::utils::futures::CallOnDrop;

type FetchChannel = Shared<oneshot::Receiver<AvatarContents>>;
type FetchMap = Arc<Mutex<BTreeMap<AvatarKey, FetchChannel>>>;

/// A request for one avatar that the [`AvatarCacher`] can memoize.
///
/// The request object carries everything needed to perform the fetch; the
/// cacher only cares about the key and the eventual image.
pub trait AvatarRequest: 'static + Send + Sync + Clone {
    /// Returns the key by which this avatar is cached.
    fn cache_key(&self) -> AvatarKey;

    /// Performs the network retrieval and decode for this avatar.
    ///
    /// Invoked at most once per key while the resulting fetch is in flight.
    /// The future runs as a detached task, so it must not borrow from the
    /// request.
    fn fetch(&self) -> BoxFuture<'static, AvatarContents>;
}

/// Memoizes avatar fetches, deduplicating concurrent requests per key.
///
/// Completed images are published to the [`AvatarStore`], which the
/// rendering path polls synchronously via [`try_get_cached`]. A fetch
/// failure releases all waiters with the error and is forgotten, so the
/// next request for that key starts over.
///
/// [`try_get_cached`]: AvatarCacher::try_get_cached
#[derive(Clone)]
pub struct AvatarCacher {
    /// Finished avatars, read by the rendering path.
    store: AvatarStore,

    /// Used for deduplicating concurrent fetches.
    current_fetches: FetchMap,
}

impl std::fmt::Debug for AvatarCacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_flight = self
            .current_fetches
            .try_lock()
            .map(|m| m.len())
            .unwrap_or_default();
        f.debug_struct("AvatarCacher")
            .field("completed avatars", &self.store.entry_count())
            .field("in-flight fetches", &in_flight)
            .finish()
    }
}

impl AvatarCacher {
    pub fn new() -> Self {
        Self {
            store: AvatarStore::new(),
            current_fetches: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// The completed-value store backing this cacher.
    pub fn store(&self) -> &AvatarStore {
        &self.store
    }

    /// Non-blocking lookup of a finished avatar.
    ///
    /// This is the redraw fast path: it never allocates in-flight state and
    /// never suspends.
    pub fn try_get_cached(&self, key: &AvatarKey) -> Option<Avatar> {
        self.store.try_get(key)
    }

    /// Resolves the avatar for `request`, fetching it at most once.
    ///
    /// If the avatar is already in the store, it is returned immediately.
    /// Otherwise the caller either joins the fetch currently in flight for
    /// the key, or becomes the owner and spawns a new one. All joiners of
    /// one fetch observe the same resolution exactly once.
    ///
    /// # Errors
    ///
    /// The fetch can fail, in which case every waiter receives the
    /// [`AvatarError`]. Errors are not cached; a later call retries.
    pub async fn fetch_memoized<T: AvatarRequest>(&self, request: T) -> AvatarContents {
        let key = request.cache_key();

        if let Some(avatar) = self.store.try_get(&key) {
            return Ok(avatar);
        }

        let channel = {
            let mut current_fetches = self.current_fetches.lock().unwrap();
            if let Some(channel) = current_fetches.get(&key) {
                // A concurrent fetch for this key was deduplicated.
                tracing::trace!(key = %key, "Joining in-flight avatar fetch");
                channel.clone()
            } else if let Some(avatar) = self.store.try_get(&key) {
                // The fetch resolved between the fast path above and taking
                // the lock; the store is already populated.
                return Ok(avatar);
            } else {
                tracing::trace!(key = %key, "Spawning avatar fetch");
                let channel = self.create_channel(key.clone(), request);
                let evicted = current_fetches.insert(key, channel.clone());
                debug_assert!(evicted.is_none());
                channel
            }
        };

        // If the sender was dropped without sending, the fetch task died
        // before resolving; waiters are released with an error instead of
        // hanging forever.
        channel
            .unwrap_or_else(|_canceled| Err(AvatarError::InternalError))
            .await
    }

    /// Creates a shareable channel that performs the fetch.
    ///
    /// The fetch runs as a detached task: dropping every caller's handle
    /// must not abort the download, and late joiners still find the result
    /// in the store.
    fn create_channel<T: AvatarRequest>(&self, key: AvatarKey, request: T) -> FetchChannel {
        let (sender, receiver) = oneshot::channel();

        let store = self.store.clone();
        let current_fetches = self.current_fetches.clone();
        let evict_token = CallOnDrop::new({
            let key = key.clone();
            move || {
                current_fetches.lock().unwrap().remove(&key);
            }
        });

        let channel = async move {
            let result = request.fetch().await;
            if let Ok(avatar) = &result {
                store.insert(key, avatar.clone());
            }
            // Drop the token first to evict from the map. This ensures that
            // callers either get a channel that will receive data, or they
            // find the finished avatar in the store / start a fresh fetch.
            drop(evict_token);
            sender.send(result).ok();
        };

        tokio::spawn(channel);

        receiver.shared()
    }
}

impl Default for AvatarCacher {
    fn default() -> Self {
        Self::new()
    }
}
