//! Handlers that drive a [`VideoCoordination`] implementation.

use crate::{
    command::{Arguments, Command, CommandVerb},
    error::{VideoError, VideoResult},
    interpreter::{Interpreter, InterpreterConfigurator},
    response::{PayloadValue, Response},
    session::{SerialContext, VideoCoordination, VideoInfo},
};

use std::{
    collections::{BTreeMap, HashMap},
    panic::Location,
    sync::{Arc, Mutex},
};

use error_location::ErrorLocation;
use tracing::{debug, error, instrument, warn};
use url::Url;
use uuid::Uuid;

/// Registers a handler for every verb except `connect`, which the session
/// owns.
///
/// Frame captures run on a worker task. Until they finish, the command is
/// held in a table keyed by its `image_reference_uuid`; completion is
/// posted back to the serialized context, which takes the entry and
/// replies.
pub struct VideoCoordinator<V> {
    video: Arc<V>,
    pending_captures: Arc<Mutex<HashMap<Uuid, Command>>>,
    serial: SerialContext,
}

impl<V> Clone for VideoCoordinator<V> {
    fn clone(&self) -> Self {
        Self {
            video: Arc::clone(&self.video),
            pending_captures: Arc::clone(&self.pending_captures),
            serial: self.serial.clone(),
        }
    }
}

impl<V: VideoCoordination> VideoCoordinator<V> {
    /// Wrap a video layer; completions are posted through `serial`.
    pub fn new(video: Arc<V>, serial: SerialContext) -> Self {
        Self {
            video,
            pending_captures: Arc::new(Mutex::new(HashMap::new())),
            serial,
        }
    }

    /// Number of frame captures still in flight.
    pub fn pending_capture_count(&self) -> usize {
        self.pending_captures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn dispatch(&self, arguments: Arguments, command: Command) {
        let video = &self.video;
        match arguments {
            Arguments::Open { url, uuid } => self.open(url, uuid, command),
            Arguments::Close { uuid } => reply(
                &command,
                video.close_video(uuid).map(|()| Response::success(&command)),
            ),
            Arguments::Show { uuid } => reply(
                &command,
                video.focus_video(uuid).map(|()| Response::success(&command)),
            ),
            Arguments::Play { uuid, rate } => reply(
                &command,
                video.play(uuid, rate).map(|()| Response::success(&command)),
            ),
            Arguments::Pause { uuid } => reply(
                &command,
                video.pause(uuid).map(|()| Response::success(&command)),
            ),
            Arguments::RequestStatus { uuid } => reply(
                &command,
                video
                    .status(uuid)
                    .map(|status| Response::success(&command).with("status", status.token())),
            ),
            Arguments::RequestElapsedTime { uuid } => reply(
                &command,
                video.elapsed_time_millis(uuid).map(|millis| {
                    Response::success(&command).with("elapsed_time_millis", millis)
                }),
            ),
            Arguments::SeekElapsedTime {
                uuid,
                elapsed_time_millis,
            } => reply(
                &command,
                video
                    .seek(uuid, elapsed_time_millis)
                    .map(|()| Response::success(&command)),
            ),
            Arguments::FrameAdvance { uuid } => reply(
                &command,
                video.advance_frames(uuid, 1).map(|()| Response::success(&command)),
            ),
            Arguments::RequestVideoInformation { uuid } => {
                let info = match uuid {
                    Some(uuid) => video.info_for_video(uuid),
                    None => video.info_for_frontmost(),
                };
                reply(
                    &command,
                    info.map(|info| Response::success_with_payload(&command, info_payload(info))),
                )
            }
            Arguments::RequestAllInformation => reply(
                &command,
                video.info_for_all().map(|videos| {
                    let videos: Vec<PayloadValue> = videos
                        .into_iter()
                        .map(|info| PayloadValue::Map(info_payload(info)))
                        .collect();
                    Response::success(&command).with("videos", videos)
                }),
            ),
            Arguments::FrameCapture {
                uuid,
                image_location,
                image_reference_uuid,
            } => self.frame_capture(uuid, image_location, image_reference_uuid, command),
            Arguments::Connect { .. } => {
                warn!("connect reached the video handlers, ignored");
            }
        }
    }

    fn open(&self, url: Url, uuid: Uuid, command: Command) {
        let video = Arc::clone(&self.video);
        tokio::spawn(async move {
            let result = video.open_video(url, uuid).await;
            reply(&command, result.map(|()| Response::success(&command)));
        });
    }

    #[instrument(skip(self, destination, command))]
    fn frame_capture(&self, uuid: Uuid, destination: Url, reference: Uuid, command: Command) {
        {
            let mut pending = self
                .pending_captures
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if pending.contains_key(&reference) {
                drop(pending);
                let e = VideoError::Inconsistency {
                    reason: format!(
                        "a frame capture for reference {} is already pending",
                        reference.hyphenated()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                };
                reply(&command, Err(e));
                return;
            }
            pending.insert(reference, command);
        }

        let video = Arc::clone(&self.video);
        let pending = Arc::clone(&self.pending_captures);
        let serial = self.serial.clone();
        tokio::spawn(async move {
            let outcome = video.capture_frame(uuid, destination.clone(), reference).await;

            let posted = serial.post(move || {
                let Some(command) = pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&reference)
                else {
                    debug!(%reference, "No pending capture for reference");
                    return;
                };

                let result = outcome.map(|capture| {
                    Response::success(&command)
                        .with("uuid", uuid)
                        .with("image_location", destination)
                        .with("image_reference_uuid", reference)
                        .with("requested_time_millis", capture.requested_millis)
                        .with("elapsed_time_millis", capture.actual_millis)
                });
                match result {
                    Ok(response) => command.respond(response),
                    Err(e) => {
                        warn!(error = %e, "Frame capture failed");
                        let response = Response::failure(&command, e.detail(), true)
                            .with("image_reference_uuid", reference);
                        command.respond(response);
                    }
                }
            });

            if let Err(e) = posted {
                error!(error = %e, %reference, "Frame capture finished after the session closed");
            }
        });
    }
}

impl<V: VideoCoordination> InterpreterConfigurator for VideoCoordinator<V> {
    fn configure_interpreter(&self, interpreter: &mut Interpreter) {
        for verb in CommandVerb::ALL {
            if verb == CommandVerb::Connect {
                continue;
            }
            let coordinator = self.clone();
            interpreter.register(verb, move |arguments, command| {
                coordinator.dispatch(arguments, command)
            });
        }
    }
}

/// Deliver a handler outcome. Domain failures are sendable exactly when
/// the verb replies at all.
fn reply(command: &Command, result: VideoResult<Response>) {
    match result {
        Ok(response) => command.respond(response),
        Err(e) => {
            warn!(verb = %command.verb(), error = %e, "Video operation failed");
            let send_on_failure = command.verb().sends_any_response();
            command.respond(Response::failure(command, e.detail(), send_on_failure));
        }
    }
}

fn info_payload(info: VideoInfo) -> BTreeMap<String, PayloadValue> {
    BTreeMap::from([
        ("url".to_owned(), PayloadValue::from(info.url)),
        ("uuid".to_owned(), PayloadValue::from(info.uuid)),
    ])
}
