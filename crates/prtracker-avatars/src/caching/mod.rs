//! # Avatar caching infrastructure
//!
//! A redraw of the dashboard may ask for the same handful of avatars from
//! dozens of rows at once. This module makes that cheap: every avatar is
//! downloaded at most once, concurrent requests for the same key join the
//! fetch that is already in flight, and finished images are served to the
//! rendering path without any scheduling overhead.
//!
//! ## Layers
//!
//! - The [`AvatarStore`] holds only *finished* images. It is read
//!   synchronously by the rendering path on every redraw and written exactly
//!   once per key when a fetch resolves successfully.
//! - The [`AvatarCacher`] owns the in-flight state. The first requester for
//!   a key becomes the owner and spawns the fetch; everyone else arriving
//!   before resolution clones a shared channel and observes the same result.
//!   The in-flight entry is removed the instant the fetch resolves, success
//!   or failure.
//!
//! Failures are *not* cached: every waiter of a failed fetch receives the
//! [`AvatarError`], nothing is written to the store, and the next request
//! for that key starts a fresh download. Transient network errors therefore
//! self-heal on the next access.
//!
//! ## [`AvatarKey`]
//!
//! The [`AvatarKey`] addresses one avatar in both the in-flight table and
//! the store. It is a SHA-256 over stable, human-readable metadata derived
//! from the identity descriptor; the metadata is kept on the key for
//! logging. Care must be taken to keep that metadata stable, as it would
//! otherwise lead to bad cache reuse.

mod error;
mod key;
mod memory;
mod store;

pub use error::{AvatarContents, AvatarError};
pub use key::{AvatarKey, AvatarKeyBuilder};
pub use memory::{AvatarCacher, AvatarRequest};
pub use store::AvatarStore;
