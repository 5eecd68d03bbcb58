//! The video layer the remote-control protocol drives.

use crate::error::{VideoError, VideoResult};

use std::{fmt, panic::Location};

use async_trait::async_trait;
use error_location::ErrorLocation;
use url::Url;
use uuid::Uuid;

/// URL schemes a video or frame destination may use.
pub const SUPPORTED_SCHEMES: [&str; 3] = ["file", "http", "https"];

/// Playback state derived from the current rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Rate exactly 1.0.
    Playing,
    /// Positive rate other than 1.0.
    ShuttlingForward,
    /// Negative rate.
    ShuttlingReverse,
    /// Not moving.
    Paused,
}

impl PlaybackStatus {
    /// Classify a playback rate.
    pub fn from_rate(rate: f64) -> Self {
        if rate == 1.0 {
            Self::Playing
        } else if rate > 0.0 {
            Self::ShuttlingForward
        } else if rate < 0.0 {
            Self::ShuttlingReverse
        } else {
            Self::Paused
        }
    }

    /// The literal wire token.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::ShuttlingForward => "shuttling forward",
            Self::ShuttlingReverse => "shuttling reverse",
            Self::Paused => "paused",
        }
    }

    /// Look up a status by its wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "playing" => Some(Self::Playing),
            "shuttling forward" => Some(Self::ShuttlingForward),
            "shuttling reverse" => Some(Self::ShuttlingReverse),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Identity of one open video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// Where the video was opened from.
    pub url: Url,
    /// The client-chosen identifier.
    pub uuid: Uuid,
}

/// Outcome of a successful frame capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCapture {
    /// Playback position when the capture was requested.
    pub requested_millis: u64,
    /// Position of the frame actually captured.
    pub actual_millis: u64,
}

/// Operations a video player exposes to remote clients.
///
/// Synchronous methods run on the session's serialized context and must
/// not block. `open_video` and `capture_frame` may take time and are
/// awaited off that context.
#[async_trait]
pub trait VideoCoordination: Send + Sync + 'static {
    /// Load a video and register it under `uuid`.
    async fn open_video(&self, url: Url, uuid: Uuid) -> VideoResult<()>;

    /// Close a video and forget its UUID.
    fn close_video(&self, uuid: Uuid) -> VideoResult<()>;

    /// Bring a video to the front.
    fn focus_video(&self, uuid: Uuid) -> VideoResult<()>;

    /// Play at `rate`; negative plays in reverse.
    fn play(&self, uuid: Uuid, rate: f64) -> VideoResult<()>;

    /// Stop playback.
    fn pause(&self, uuid: Uuid) -> VideoResult<()>;

    /// Current playback status.
    fn status(&self, uuid: Uuid) -> VideoResult<PlaybackStatus>;

    /// Current position in milliseconds from the start.
    fn elapsed_time_millis(&self, uuid: Uuid) -> VideoResult<u64>;

    /// Jump to a position in milliseconds.
    fn seek(&self, uuid: Uuid, millis: u64) -> VideoResult<()>;

    /// Step by whole frames; negative steps backwards.
    fn advance_frames(&self, uuid: Uuid, count: i64) -> VideoResult<()>;

    /// Capture the current frame to `destination`.
    ///
    /// `reference` is the client's identifier for the image and is only
    /// echoed back.
    async fn capture_frame(
        &self,
        uuid: Uuid,
        destination: Url,
        reference: Uuid,
    ) -> VideoResult<FrameCapture>;

    /// URL and UUID of one video.
    fn info_for_video(&self, uuid: Uuid) -> VideoResult<VideoInfo>;

    /// URL and UUID of the frontmost video.
    fn info_for_frontmost(&self) -> VideoResult<VideoInfo>;

    /// URL and UUID of every open video.
    fn info_for_all(&self) -> VideoResult<Vec<VideoInfo>>;
}

/// Reject URLs whose scheme is not in [`SUPPORTED_SCHEMES`].
///
/// # Errors
///
/// Returns [`VideoError::UnsupportedUrl`].
#[track_caller]
pub fn validate_url_scheme(url: &Url) -> VideoResult<()> {
    if SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Ok(());
    }
    Err(VideoError::UnsupportedUrl {
        url: url.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}
