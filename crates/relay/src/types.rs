//! Domain types shared between the source client, the poll cycle, and the
//! notifier.

/// Kind of a media attachment as reported by the source API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    AnimatedGif,
    Other,
}

impl MediaKind {
    /// Map a source API media `type` string onto a kind. Unrecognized
    /// values become [`MediaKind::Other`] rather than an error.
    #[must_use]
    pub fn from_api(kind: &str) -> Self {
        match kind {
            "photo" => Self::Photo,
            "video" => Self::Video,
            "animated_gif" => Self::AnimatedGif,
            _ => Self::Other,
        }
    }
}

/// A single media attachment: an ownership-free reference to the hosted
/// file plus its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    pub kind: MediaKind,
}

/// One fetched post. Consumed by the notify step and then discarded; only
/// the id survives in the seen store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Source-assigned unique identifier.
    pub id: String,
    /// Handle of the account the post belongs to.
    pub author: String,
    /// Body text.
    pub text: String,
    /// Attachments in source order. May be empty.
    pub media: Vec<Media>,
}

impl Post {
    /// URLs of the photo attachments, in source order. Only photos are
    /// eligible for forwarding; other media kinds are ignored.
    pub fn photo_urls(&self) -> impl Iterator<Item = &str> {
        self.media
            .iter()
            .filter(|m| m.kind == MediaKind::Photo)
            .map(|m| m.url.as_str())
    }
}
