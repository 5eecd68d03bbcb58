//! Session coordination: the serialized event loop, response routing and
//! the video handlers.

mod coordinator;
mod serial;
#[allow(clippy::module_inception)]
mod session;
mod video;

pub use {
    coordinator::VideoCoordinator,
    serial::{Job, SerialContext},
    session::{RemoteEndpoint, Session, SessionHandle},
    video::{
        FrameCapture, PlaybackStatus, SUPPORTED_SCHEMES, VideoCoordination, VideoInfo,
        validate_url_scheme,
    },
};
