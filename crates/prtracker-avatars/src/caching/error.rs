use std::time::Duration;

use thiserror::Error;

use crate::types::Avatar;

/// An error that happens when fetching an avatar from a remote endpoint.
///
/// Every waiter of an in-flight fetch receives the same error; errors are
/// never written into the [`AvatarStore`](super::AvatarStore), so the next
/// request for the key retries from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvatarError {
    /// The avatar was not found at the remote endpoint.
    #[error("not found")]
    NotFound,
    /// The endpoint rejected the request due to missing permissions.
    ///
    /// The attached string contains the endpoint's response.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The avatar could not be fetched within the configured deadline.
    #[error("download timed out after {0:?}")]
    Timeout(Duration),
    /// The avatar could not be fetched due to another problem, like
    /// connection loss, DNS resolution, or a 5xx server response.
    ///
    /// The attached string contains the remote endpoint's response.
    #[error("download failed: {0}")]
    Download(String),
    /// The avatar was fetched successfully, but the payload is not a
    /// decodable image.
    #[error("malformed: {0}")]
    Malformed(String),
    /// An unexpected error in the cache itself, e.g. a fetch task that died
    /// before resolving its waiters.
    #[error("internal error")]
    InternalError,
}

/// The result of resolving one avatar.
pub type AvatarContents<T = Avatar> = Result<T, AvatarError>;
