use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use serde::Deserialize;
use url::Url;

/// One identity as handed over by the surrounding dashboard.
///
/// The dashboard's view layer projects these out of its source-control API
/// responses; this crate only cares about the stable `id` and the
/// `avatar_url` it resolves images from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    /// Stable unique identifier of the identity.
    pub id: String,
    /// Name as displayed in the dashboard.
    pub display_name: String,
    /// Endpoint serving this identity's avatar image.
    pub avatar_url: Url,
}

/// A decoded avatar image.
///
/// The pixel data is shared behind an [`Arc`], so clones are cheap and the
/// completed-value store can hand the same image to any number of readers.
#[derive(Clone)]
pub struct Avatar {
    image: Arc<DynamicImage>,
}

impl Avatar {
    pub(crate) fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// The decoded image.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

impl fmt::Debug for Avatar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("Avatar")
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}

impl PartialEq for Avatar {
    fn eq(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions() && self.image.as_bytes() == other.image.as_bytes()
    }
}

impl Eq for Avatar {}
