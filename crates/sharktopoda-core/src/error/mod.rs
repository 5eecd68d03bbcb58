use crate::{command::CommandVerb, response::ErrorDetail};

use error_location::ErrorLocation;
use thiserror::Error;
use uuid::Uuid;

/// Code for a URL whose scheme the player does not support.
pub const UNSUPPORTED_URL_CODE: i64 = 11;
/// Code for a UUID that names no open video.
pub const NO_VIDEO_FOR_UUID_CODE: i64 = 12;
/// Code for an open video that has no URL.
pub const NO_URL_FOR_UUID_CODE: i64 = 13;
/// Code for a request that needs a focused video when there is none.
pub const NO_FOCUSED_VIDEO_CODE: i64 = 14;
/// Code for a resource that cannot be reached.
pub const UNREACHABLE_CODE: i64 = 15;
/// Code for a frame capture that could not complete.
pub const CAPTURE_FAILED_CODE: i64 = 16;
/// Code for internal state that contradicts itself.
pub const INCONSISTENCY_CODE: i64 = 99;

/// Protocol and transport errors with source location tracking.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Inbound message is not a JSON object with a known `command` token.
    #[error("Malformed message: {reason} {location}")]
    MalformedMessage {
        /// Why the message could not be modeled as a command.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A field the verb requires is absent or unusable.
    #[error("command \"{verb}\" has no value \"{name}\" {location}")]
    MissingParameter {
        /// Verb of the offending command.
        verb: CommandVerb,
        /// Name of the missing field.
        name: &'static str,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A UUID field is present but not an RFC 4122 string.
    #[error("{value} is not a valid UUID {location}")]
    InvalidUuid {
        /// Verb of the offending command.
        verb: CommandVerb,
        /// The rejected value as the client sent it.
        value: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The inbound socket could not be bound.
    #[error("Failed to bind UDP port {port}: {source} {location}")]
    BindFailed {
        /// Port that was requested.
        port: u16,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A datagram could not be sent.
    #[error("Failed to send to {destination}: {source} {location}")]
    SendFailed {
        /// Host and port the datagram was meant for.
        destination: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A reply was requested while no inbound port is bound.
    #[error("UDP service is not listening {location}")]
    NotListening {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The session event loop is no longer running.
    #[error("Session closed {location}")]
    SessionClosed {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl ProtocolError {
    /// Whether this error is a per-command structural failure the interpreter reports.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ProtocolError::MissingParameter { .. } | ProtocolError::InvalidUuid { .. }
        )
    }
}

/// Failures reported by the video layer.
///
/// Each variant has a stable numeric [`code`](VideoError::code) that clients
/// see in the `error` object of a verbose reply.
#[derive(Error, Debug)]
pub enum VideoError {
    /// Only `file`, `http` and `https` URLs can be opened.
    #[error("The url {url} is not supported {location}")]
    UnsupportedUrl {
        /// The rejected URL.
        url: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No open video has this UUID.
    #[error("No video is available with UUID {uuid} {location}")]
    NoVideoForUuid {
        /// The unknown UUID.
        uuid: Uuid,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The video exists but has no URL.
    #[error("No url associated with video with UUID {uuid} {location}")]
    NoUrlForUuid {
        /// The video's UUID.
        uuid: Uuid,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No video is frontmost.
    #[error("There is no focused video window {location}")]
    NoFocusedVideo {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The resource behind a URL cannot be reached.
    #[error("The resource at {url} is not reachable: {reason} {location}")]
    Unreachable {
        /// The URL that was checked.
        url: String,
        /// What the check reported.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A frame could not be captured.
    #[error("Frame capture failed: {reason} {location}")]
    CaptureFailed {
        /// What went wrong.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Player state contradicts itself.
    #[error("Inconsistent player state: {reason} {location}")]
    Inconsistency {
        /// What did not add up.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl VideoError {
    /// Stable numeric code.
    pub fn code(&self) -> i64 {
        match self {
            VideoError::UnsupportedUrl { .. } => UNSUPPORTED_URL_CODE,
            VideoError::NoVideoForUuid { .. } => NO_VIDEO_FOR_UUID_CODE,
            VideoError::NoUrlForUuid { .. } => NO_URL_FOR_UUID_CODE,
            VideoError::NoFocusedVideo { .. } => NO_FOCUSED_VIDEO_CODE,
            VideoError::Unreachable { .. } => UNREACHABLE_CODE,
            VideoError::CaptureFailed { .. } => CAPTURE_FAILED_CODE,
            VideoError::Inconsistency { .. } => INCONSISTENCY_CODE,
        }
    }

    /// Client-facing description, without the source location.
    pub fn description(&self) -> String {
        match self {
            VideoError::UnsupportedUrl { url, .. } => format!("The url {url} is not supported"),
            VideoError::NoVideoForUuid { uuid, .. } => {
                format!("No video is available with UUID {}", uuid.hyphenated())
            }
            VideoError::NoUrlForUuid { uuid, .. } => {
                format!("No url associated with video with UUID {}", uuid.hyphenated())
            }
            VideoError::NoFocusedVideo { .. } => "There is no focused video window".to_owned(),
            VideoError::Unreachable { url, reason, .. } => {
                format!("The resource at {url} is not reachable: {reason}")
            }
            VideoError::CaptureFailed { reason, .. } => format!("Frame capture failed: {reason}"),
            VideoError::Inconsistency { reason, .. } => {
                format!("Inconsistent player state: {reason}")
            }
        }
    }

    /// Error detail for a failure response.
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail::domain(self.code(), self.description())
    }
}

/// Result type alias using [`VideoError`].
pub type VideoResult<T> = std::result::Result<T, VideoError>;

/// Result type alias using [`ProtocolError`].
pub type Result<T> = std::result::Result<T, ProtocolError>;
