//! External platform capabilities.
//!
//! The core never talks to a content platform directly. Reconstruction and
//! channel-sourced playlist building consume the two narrow traits defined
//! here; embedders supply implementations backed by whatever sources they
//! enable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::record::VideoSummary;

/// Full details of a resolved video reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDetails {
    /// Canonical content URL.
    pub url: String,
    /// Video title.
    pub title: String,
    /// Channel/uploader name.
    pub author: Option<String>,
    /// Video duration in seconds.
    pub duration_secs: Option<u64>,
    /// Thumbnail URL for the video.
    pub thumbnail_url: Option<String>,
}

impl From<VideoDetails> for VideoSummary {
    fn from(details: VideoDetails) -> Self {
        Self {
            url: details.url,
            title: details.title,
            author: details.author,
            duration_secs: details.duration_secs,
            thumbnail_url: details.thumbnail_url,
        }
    }
}

/// Content a resolver can hand back for a reference.
#[derive(Debug, Clone)]
pub enum PlatformContent {
    /// A playable video with full details.
    Video(VideoDetails),
    /// Any non-video content (posts, channels, live rooms). Reconstruction
    /// and channel collection drop these.
    Other {
        /// Source-specific kind tag, for logging.
        kind: String,
    },
}

impl PlatformContent {
    /// The video details, if this content is a video.
    #[must_use]
    pub fn into_video(self) -> Option<VideoDetails> {
        match self {
            Self::Video(details) => Some(details),
            Self::Other { .. } => None,
        }
    }
}

/// A channel whose content can seed a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformChannel {
    /// Channel URL.
    pub url: String,
    /// Channel display name; a playlist built from the channel takes
    /// this as its name.
    pub name: String,
}

impl PlatformChannel {
    /// Create a channel descriptor.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}

/// External capability mapping a member reference to content details.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformResolver: Send + Sync {
    /// Resolve one reference to full content details.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unavailable`] when the content is gone,
    /// [`ResolveError::NoCapability`] when no source covers the
    /// reference, and [`ResolveError::Other`] for anything else.
    async fn resolve(&self, reference: &str) -> Result<PlatformContent, ResolveError>;
}

/// Cursor over a channel's content pages.
///
/// Consumers use it strictly in read-check-advance order: take
/// `current_items`, check `has_more`, then `advance` while pages remain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelPager: Send + Sync {
    /// Items of the page the cursor is currently on.
    fn current_items(&self) -> Vec<PlatformContent>;

    /// Whether another page can be fetched.
    fn has_more(&self) -> bool;

    /// Fetch the next page and move the cursor onto it.
    ///
    /// # Errors
    ///
    /// Propagates the source's failure for the page fetch.
    async fn advance(&mut self) -> Result<(), ResolveError>;
}
