use crate::{
    ClientAddress, Command, FrameCapture, PlaybackStatus, Responder, Response, VideoCoordination,
    VideoError, VideoInfo, VideoResult, validate_url_scheme,
};

use std::{
    collections::HashMap,
    net::SocketAddr,
    panic::Location,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use serde_json::Value;
use tokio::net::UdpSocket;
use url::Url;
use uuid::Uuid;

pub(crate) const VIDEO_UUID: &str = "3F2504E0-4F89-11D3-9A0C-0305E82C3301";
pub(crate) const REFERENCE_UUID: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";
pub(crate) const RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn client() -> ClientAddress {
    ClientAddress::from(SocketAddr::from(([192, 168, 1, 20], 5000)))
}

/// A responder that records everything it is given.
pub(crate) fn recording_responder() -> (Responder, Arc<Mutex<Vec<Response>>>) {
    let responses = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&responses);
    let responder = Responder::new(move |response| {
        sink.lock().unwrap_or_else(|e| e.into_inner()).push(response);
    });
    (responder, responses)
}

#[allow(clippy::expect_used)]
pub(crate) fn command(json: Value) -> Command {
    Command::parse(json, client(), None).expect("test message names a known verb")
}

#[allow(clippy::expect_used)]
pub(crate) fn recorded_command(json: Value) -> (Command, Arc<Mutex<Vec<Response>>>) {
    let (responder, responses) = recording_responder();
    let command =
        Command::parse(json, client(), Some(responder)).expect("test message names a known verb");
    (command, responses)
}

pub(crate) fn taken(responses: &Arc<Mutex<Vec<Response>>>) -> Vec<Response> {
    std::mem::take(&mut *responses.lock().unwrap_or_else(|e| e.into_inner()))
}

/// Receive one datagram as JSON, or `None` on timeout.
#[allow(clippy::unwrap_used)]
pub(crate) async fn receive_json(socket: &UdpSocket) -> Option<Value> {
    let mut buf = vec![0u8; 65_535];
    let (len, _) = tokio::time::timeout(RECEIVE_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .ok()?
        .unwrap();
    serde_json::from_slice(&buf[..len]).ok()
}

/// In-memory video layer with a scripted frame-capture outcome.
#[derive(Default)]
pub(crate) struct FakeVideo {
    videos: Mutex<HashMap<Uuid, FakeVideoState>>,
    frontmost: Mutex<Option<Uuid>>,
    pub(crate) fail_captures: bool,
    pub(crate) capture_delay: Duration,
}

#[derive(Debug, Clone)]
struct FakeVideoState {
    url: Url,
    rate: f64,
    millis: u64,
}

impl FakeVideo {
    pub(crate) fn with_video(uuid: Uuid, url: &str) -> Self {
        let player = Self::default();
        if let Ok(url) = Url::parse(url) {
            player.insert(uuid, url);
        }
        player
    }

    fn insert(&self, uuid: Uuid, url: Url) {
        self.videos.lock().unwrap_or_else(|e| e.into_inner()).insert(
            uuid,
            FakeVideoState {
                url,
                rate: 0.0,
                millis: 0,
            },
        );
        *self.frontmost.lock().unwrap_or_else(|e| e.into_inner()) = Some(uuid);
    }

    fn with_state<T>(
        &self,
        uuid: Uuid,
        f: impl FnOnce(&mut FakeVideoState) -> T,
    ) -> VideoResult<T> {
        let mut videos = self.videos.lock().unwrap_or_else(|e| e.into_inner());
        match videos.get_mut(&uuid) {
            Some(state) => Ok(f(state)),
            None => Err(VideoError::NoVideoForUuid {
                uuid,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

#[async_trait]
impl VideoCoordination for FakeVideo {
    async fn open_video(&self, url: Url, uuid: Uuid) -> VideoResult<()> {
        validate_url_scheme(&url)?;
        self.insert(uuid, url);
        Ok(())
    }

    fn close_video(&self, uuid: Uuid) -> VideoResult<()> {
        self.with_state(uuid, |_| ())?;
        self.videos
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&uuid);
        Ok(())
    }

    fn focus_video(&self, uuid: Uuid) -> VideoResult<()> {
        self.with_state(uuid, |_| ())?;
        *self.frontmost.lock().unwrap_or_else(|e| e.into_inner()) = Some(uuid);
        Ok(())
    }

    fn play(&self, uuid: Uuid, rate: f64) -> VideoResult<()> {
        self.with_state(uuid, |state| state.rate = rate)
    }

    fn pause(&self, uuid: Uuid) -> VideoResult<()> {
        self.with_state(uuid, |state| state.rate = 0.0)
    }

    fn status(&self, uuid: Uuid) -> VideoResult<PlaybackStatus> {
        self.with_state(uuid, |state| PlaybackStatus::from_rate(state.rate))
    }

    fn elapsed_time_millis(&self, uuid: Uuid) -> VideoResult<u64> {
        self.with_state(uuid, |state| state.millis)
    }

    fn seek(&self, uuid: Uuid, millis: u64) -> VideoResult<()> {
        self.with_state(uuid, |state| state.millis = millis)
    }

    fn advance_frames(&self, uuid: Uuid, count: i64) -> VideoResult<()> {
        self.with_state(uuid, |state| {
            state.millis = state.millis.saturating_add_signed(count * 40);
        })
    }

    async fn capture_frame(
        &self,
        uuid: Uuid,
        destination: Url,
        _reference: Uuid,
    ) -> VideoResult<FrameCapture> {
        validate_url_scheme(&destination)?;
        let millis = self.with_state(uuid, |state| state.millis)?;
        tokio::time::sleep(self.capture_delay).await;
        if self.fail_captures {
            return Err(VideoError::CaptureFailed {
                reason: "scripted failure".to_owned(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(FrameCapture {
            requested_millis: millis,
            actual_millis: millis,
        })
    }

    fn info_for_video(&self, uuid: Uuid) -> VideoResult<VideoInfo> {
        self.with_state(uuid, |state| VideoInfo {
            url: state.url.clone(),
            uuid,
        })
    }

    fn info_for_frontmost(&self) -> VideoResult<VideoInfo> {
        let frontmost = *self.frontmost.lock().unwrap_or_else(|e| e.into_inner());
        match frontmost {
            Some(uuid) => self.info_for_video(uuid),
            None => Err(VideoError::NoFocusedVideo {
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    fn info_for_all(&self) -> VideoResult<Vec<VideoInfo>> {
        let videos = self.videos.lock().unwrap_or_else(|e| e.into_inner());
        Ok(videos
            .iter()
            .map(|(uuid, state)| VideoInfo {
                url: state.url.clone(),
                uuid: *uuid,
            })
            .collect())
    }
}
