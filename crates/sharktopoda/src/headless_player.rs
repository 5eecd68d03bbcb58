//! In-memory player used when no video window is attached.
//!
//! Tracks open videos, the frontmost one, and a playback clock per video
//! driven by its rate. Frame captures report times aligned to frame
//! boundaries; no image data is decoded or written.

use sharktopoda_core::{
    FrameCapture, PlaybackStatus, VideoCoordination, VideoError, VideoInfo, VideoResult,
    validate_url_scheme,
};

use std::{
    collections::BTreeMap,
    panic::Location,
    sync::Mutex,
    time::Instant,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

/// Length of one frame; 25 frames per second.
pub(crate) const FRAME_DURATION_MILLIS: u64 = 40;

/// Position that advances with wall time at `rate`.
#[derive(Debug, Clone)]
struct PlaybackClock {
    anchor_millis: f64,
    anchored_at: Instant,
    rate: f64,
}

impl PlaybackClock {
    fn new() -> Self {
        Self {
            anchor_millis: 0.0,
            anchored_at: Instant::now(),
            rate: 0.0,
        }
    }

    fn position_millis(&self) -> f64 {
        let moved = self.anchored_at.elapsed().as_secs_f64() * 1000.0 * self.rate;
        (self.anchor_millis + moved).max(0.0)
    }

    fn set_rate(&mut self, rate: f64) {
        self.reanchor(self.position_millis());
        self.rate = rate;
    }

    fn reanchor(&mut self, millis: f64) {
        self.anchor_millis = millis.max(0.0);
        self.anchored_at = Instant::now();
    }

    /// Start of the frame showing at the current position.
    fn frame_start_millis(&self) -> u64 {
        let position = self.position_millis() as u64;
        position - position % FRAME_DURATION_MILLIS
    }
}

#[derive(Debug)]
struct LoadedVideo {
    url: Url,
    clock: PlaybackClock,
}

#[derive(Debug, Default)]
struct PlayerState {
    videos: BTreeMap<Uuid, LoadedVideo>,
    frontmost: Option<Uuid>,
}

/// [`VideoCoordination`] without a display.
#[derive(Debug, Default)]
pub struct HeadlessPlayer {
    state: Mutex<PlayerState>,
}

impl HeadlessPlayer {
    /// A player with nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    fn with_video<T>(&self, uuid: Uuid, f: impl FnOnce(&mut LoadedVideo) -> T) -> VideoResult<T> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.videos.get_mut(&uuid) {
            Some(video) => Ok(f(video)),
            None => Err(VideoError::NoVideoForUuid {
                uuid,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// File URLs must name something that exists; remote URLs are taken as given.
async fn check_reachable(url: &Url) -> VideoResult<()> {
    if url.scheme() != "file" {
        return Ok(());
    }
    let unreachable = |reason: String| VideoError::Unreachable {
        url: url.to_string(),
        reason,
        location: ErrorLocation::from(Location::caller()),
    };
    let path = url
        .to_file_path()
        .map_err(|()| unreachable("not a local path".to_string()))?;
    tokio::fs::metadata(&path)
        .await
        .map_err(|e| unreachable(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl VideoCoordination for HeadlessPlayer {
    #[instrument(skip(self), fields(url = %url))]
    async fn open_video(&self, url: Url, uuid: Uuid) -> VideoResult<()> {
        validate_url_scheme(&url)?;
        check_reachable(&url).await?;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.videos.insert(
            uuid,
            LoadedVideo {
                url,
                clock: PlaybackClock::new(),
            },
        );
        state.frontmost = Some(uuid);
        info!(%uuid, "Video opened");
        Ok(())
    }

    fn close_video(&self, uuid: Uuid) -> VideoResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.videos.remove(&uuid).is_none() {
            return Err(VideoError::NoVideoForUuid {
                uuid,
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if state.frontmost == Some(uuid) {
            state.frontmost = None;
        }
        info!(%uuid, "Video closed");
        Ok(())
    }

    fn focus_video(&self, uuid: Uuid) -> VideoResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.videos.contains_key(&uuid) {
            return Err(VideoError::NoVideoForUuid {
                uuid,
                location: ErrorLocation::from(Location::caller()),
            });
        }
        state.frontmost = Some(uuid);
        Ok(())
    }

    fn play(&self, uuid: Uuid, rate: f64) -> VideoResult<()> {
        self.with_video(uuid, |video| video.clock.set_rate(rate))
    }

    fn pause(&self, uuid: Uuid) -> VideoResult<()> {
        self.with_video(uuid, |video| video.clock.set_rate(0.0))
    }

    fn status(&self, uuid: Uuid) -> VideoResult<PlaybackStatus> {
        self.with_video(uuid, |video| PlaybackStatus::from_rate(video.clock.rate))
    }

    fn elapsed_time_millis(&self, uuid: Uuid) -> VideoResult<u64> {
        self.with_video(uuid, |video| video.clock.position_millis().round() as u64)
    }

    fn seek(&self, uuid: Uuid, millis: u64) -> VideoResult<()> {
        self.with_video(uuid, |video| video.clock.reanchor(millis as f64))
    }

    /// Stepping pauses playback, as a frame step does on a real player.
    fn advance_frames(&self, uuid: Uuid, count: i64) -> VideoResult<()> {
        self.with_video(uuid, |video| {
            video.clock.set_rate(0.0);
            let step = count.saturating_mul(FRAME_DURATION_MILLIS as i64);
            let target = video.clock.frame_start_millis().saturating_add_signed(step);
            video.clock.reanchor(target as f64);
        })
    }

    #[instrument(skip(self, _reference), fields(destination = %destination))]
    async fn capture_frame(
        &self,
        uuid: Uuid,
        destination: Url,
        _reference: Uuid,
    ) -> VideoResult<FrameCapture> {
        if destination.scheme() != "file" {
            return Err(VideoError::CaptureFailed {
                reason: format!("cannot write an image to {destination}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let capture = self.with_video(uuid, |video| FrameCapture {
            requested_millis: video.clock.position_millis().round() as u64,
            actual_millis: video.clock.frame_start_millis(),
        })?;
        debug!(
            requested = capture.requested_millis,
            actual = capture.actual_millis,
            "Frame located"
        );
        Ok(capture)
    }

    fn info_for_video(&self, uuid: Uuid) -> VideoResult<VideoInfo> {
        self.with_video(uuid, |video| VideoInfo {
            url: video.url.clone(),
            uuid,
        })
    }

    fn info_for_frontmost(&self) -> VideoResult<VideoInfo> {
        let frontmost = self.state.lock().unwrap_or_else(|e| e.into_inner()).frontmost;
        match frontmost {
            Some(uuid) => self.info_for_video(uuid),
            None => Err(VideoError::NoFocusedVideo {
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    fn info_for_all(&self) -> VideoResult<Vec<VideoInfo>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .videos
            .iter()
            .map(|(uuid, video)| VideoInfo {
                url: video.url.clone(),
                uuid: *uuid,
            })
            .collect())
    }
}
