use moka::sync::Cache;

use super::AvatarKey;
use crate::types::Avatar;

/// The completed-value store.
///
/// Holds only *finished* avatars. The rendering path reads this on every
/// redraw; the [`AvatarCacher`](super::AvatarCacher) writes each key exactly
/// once, when its fetch resolves successfully. Failed fetches never leave a
/// trace here.
///
/// The store is unbounded: avatar populations are bounded by the distinct
/// reviewers seen in a session, and entries live for the process lifetime.
#[derive(Clone)]
pub struct AvatarStore {
    completed: Cache<AvatarKey, Avatar>,
}

impl std::fmt::Debug for AvatarStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarStore")
            .field("entries", &self.completed.entry_count())
            .finish()
    }
}

impl AvatarStore {
    pub fn new() -> Self {
        let completed = Cache::builder().name("avatars").build();
        Self { completed }
    }

    /// Non-blocking lookup, safe to call from the rendering path and from
    /// any number of concurrent readers.
    pub fn try_get(&self, key: &AvatarKey) -> Option<Avatar> {
        self.completed.get(key)
    }

    /// Publishes a finished avatar.
    ///
    /// Fetches are content-addressed by key, so overwriting an existing
    /// entry with an equal value is benign.
    pub(crate) fn insert(&self, key: AvatarKey, avatar: Avatar) {
        self.completed.insert(key, avatar);
    }

    /// Number of finished avatars currently held.
    pub fn entry_count(&self) -> u64 {
        self.completed.entry_count()
    }
}

impl Default for AvatarStore {
    fn default() -> Self {
        Self::new()
    }
}
