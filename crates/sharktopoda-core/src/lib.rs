//! Sharktopoda Core Library
//!
//! UDP/JSON remote control for a video player. Clients send one JSON
//! object per datagram naming a `command`; the session validates it,
//! dispatches it to a registered handler and routes the reply back to the
//! client, to the endpoint set by the last `connect`, or nowhere.
//!
//! # Example
//!
//! ```no_run
//! use sharktopoda_core::{CoreResult, Session, VideoCoordination, VideoCoordinator};
//!
//! use std::sync::Arc;
//!
//! async fn serve<V: VideoCoordination>(player: Arc<V>) -> CoreResult<()> {
//!     let mut session = Session::new().await?;
//!     let coordinator = VideoCoordinator::new(player, session.serial_context());
//!     session.configure(&coordinator);
//!
//!     let handle = session.handle();
//!     let running = tokio::spawn(session.run());
//!
//!     handle.start_listening(8800).await?;
//!     tokio::signal::ctrl_c().await.ok();
//!     handle.shutdown().await?;
//!     running.await.ok();
//!     Ok(())
//! }
//! ```

mod command;
mod error;
mod interpreter;
mod response;
mod session;
mod transport;

pub use {
    command::{Arguments, Command, CommandVerb, DEFAULT_RATE, Field, Responder},
    error::{
        CAPTURE_FAILED_CODE, INCONSISTENCY_CODE, NO_FOCUSED_VIDEO_CODE, NO_URL_FOR_UUID_CODE,
        NO_VIDEO_FOR_UUID_CODE, ProtocolError, Result as CoreResult, UNREACHABLE_CODE,
        UNSUPPORTED_URL_CODE, VideoError, VideoResult,
    },
    interpreter::{Handler, Interpreter, InterpreterConfigurator},
    response::{
        ErrorDetail, ErrorKind, INVALID_UUID_CODE, MISSING_PARAMETER_CODE, PayloadValue, Response,
        ResponseStatus, SimpleResponse,
    },
    session::{
        FrameCapture, Job, PlaybackStatus, RemoteEndpoint, SUPPORTED_SCHEMES, SerialContext,
        Session, SessionHandle, VideoCoordination, VideoCoordinator, VideoInfo,
        validate_url_scheme,
    },
    transport::{
        ClientAddress, Inbound, ListenState, SenderEvent, SentMessage, ServiceEvent, UdpSender,
        UdpService,
    },
};

#[cfg(test)]
mod tests;
