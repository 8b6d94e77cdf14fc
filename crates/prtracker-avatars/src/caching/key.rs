use std::cmp::Ordering;
use std::fmt::{self, Write};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::types::Identity;

/// Addresses one avatar in both the in-flight table and the completed store.
///
/// The key is a SHA-256 hash over human-readable, **stable** metadata
/// derived from the identity descriptor. Equality and ordering are defined
/// over the hash; the metadata is retained for logging and diagnostics.
#[derive(Debug, Clone, Eq)]
pub struct AvatarKey {
    metadata: Arc<str>,
    hash: [u8; 32],
}

impl fmt::Display for AvatarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.hash[..8] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl PartialEq for AvatarKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl std::hash::Hash for AvatarKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl Ord for AvatarKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl PartialOrd for AvatarKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AvatarKey {
    /// Creates the [`AvatarKey`] for the given [`Identity`].
    pub fn from_identity(identity: &Identity) -> Self {
        let mut builder = AvatarKey::builder();
        builder.write_identity_meta(identity).unwrap();
        builder.build()
    }

    /// Create an [`AvatarKeyBuilder`] to assemble a key from its
    /// contributing metadata.
    pub fn builder() -> AvatarKeyBuilder {
        AvatarKeyBuilder {
            metadata: String::new(),
        }
    }

    /// The human-readable metadata that forms the basis of this key.
    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    #[cfg(test)]
    pub fn for_testing(key: impl Into<String>) -> Self {
        let mut builder = AvatarKey::builder();
        builder.write_str(&key.into()).unwrap();
        builder.build()
    }
}

/// A builder for [`AvatarKey`]s.
///
/// The builder implements [`std::fmt::Write`] and accepts human readable,
/// but most importantly **stable**, input. This input is then hashed to form
/// the [`AvatarKey`].
pub struct AvatarKeyBuilder {
    metadata: String,
}

impl AvatarKeyBuilder {
    /// Writes the metadata of an [`Identity`] into the key.
    pub fn write_identity_meta(&mut self, identity: &Identity) -> Result<(), fmt::Error> {
        self.metadata.write_fmt(format_args!(
            "identity: {}\nlocation: {}\n",
            identity.id, identity.avatar_url
        ))
    }

    /// Finalize the [`AvatarKey`].
    pub fn build(self) -> AvatarKey {
        let hash = Sha256::digest(&self.metadata);
        let hash = <[u8; 32]>::try_from(hash.as_slice()).expect("sha256 outputs 32 bytes");

        AvatarKey {
            metadata: self.metadata.into(),
            hash,
        }
    }
}

impl fmt::Write for AvatarKeyBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.metadata.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str, url: &str) -> Identity {
        Identity {
            id: id.to_owned(),
            display_name: id.to_owned(),
            avatar_url: url.parse().unwrap(),
        }
    }

    #[test]
    fn test_key_is_stable() {
        let alice = identity("alice", "https://avatars.example.com/alice.png");

        let key = AvatarKey::from_identity(&alice);
        let again = AvatarKey::from_identity(&alice);

        assert_eq!(key, again);
        assert_eq!(key.to_string(), again.to_string());
        assert_eq!(
            key.metadata(),
            "identity: alice\nlocation: https://avatars.example.com/alice.png\n"
        );
    }

    #[test]
    fn test_distinct_identities_get_distinct_keys() {
        let alice = identity("alice", "https://avatars.example.com/alice.png");
        let bob = identity("bob", "https://avatars.example.com/bob.png");

        assert_ne!(
            AvatarKey::from_identity(&alice),
            AvatarKey::from_identity(&bob)
        );

        // Same account, avatar served from a different location.
        let moved = identity("alice", "https://avatars.example.com/v2/alice.png");
        assert_ne!(
            AvatarKey::from_identity(&alice),
            AvatarKey::from_identity(&moved)
        );
    }
}
