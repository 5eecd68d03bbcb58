use std::fmt;

/// The closed set of operations a client may request.
///
/// Tokens are matched verbatim. Several contain spaces and are opaque
/// strings, not phrases to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandVerb {
    /// Establish the remote endpoint used for asynchronous replies.
    Connect,
    /// Open a video at a URL under a client-chosen UUID.
    Open,
    /// Close the video.
    Close,
    /// Bring the video to the front.
    Show,
    /// Describe one video, or the frontmost one.
    RequestVideoInformation,
    /// Describe every open video.
    RequestAllInformation,
    /// Start playback, optionally at a rate.
    Play,
    /// Pause playback.
    Pause,
    /// Report the playback position in milliseconds.
    RequestElapsedTime,
    /// Report the playback status.
    RequestStatus,
    /// Seek to a position in milliseconds.
    SeekElapsedTime,
    /// Save the current frame to an image location.
    FrameCapture,
    /// Step one frame forward.
    FrameAdvance,
}

impl CommandVerb {
    /// Every verb, in protocol documentation order.
    pub const ALL: [CommandVerb; 13] = [
        CommandVerb::Connect,
        CommandVerb::Open,
        CommandVerb::Close,
        CommandVerb::Show,
        CommandVerb::RequestVideoInformation,
        CommandVerb::RequestAllInformation,
        CommandVerb::Play,
        CommandVerb::Pause,
        CommandVerb::RequestElapsedTime,
        CommandVerb::RequestStatus,
        CommandVerb::SeekElapsedTime,
        CommandVerb::FrameCapture,
        CommandVerb::FrameAdvance,
    ];

    /// The literal wire token.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Open => "open",
            Self::Close => "close",
            Self::Show => "show",
            Self::RequestVideoInformation => "request video information",
            Self::RequestAllInformation => "request all information",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::RequestElapsedTime => "request elapsed time",
            Self::RequestStatus => "request status",
            Self::SeekElapsedTime => "seek elapsed time",
            Self::FrameCapture => "framecapture",
            Self::FrameAdvance => "frame advance",
        }
    }

    /// Look up a verb by its exact wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.token() == token)
    }

    /// Fields that must be present, in the order they are checked.
    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            Self::Connect => &["port"],
            Self::Open => &["url", "uuid"],
            Self::Close
            | Self::Show
            | Self::Play
            | Self::Pause
            | Self::RequestElapsedTime
            | Self::RequestStatus
            | Self::FrameAdvance => &["uuid"],
            Self::RequestVideoInformation | Self::RequestAllInformation => &[],
            Self::SeekElapsedTime => &["uuid", "elapsed_time_millis"],
            Self::FrameCapture => &["uuid", "image_location", "image_reference_uuid"],
        }
    }

    /// Whether a response goes back to the client that sent the command.
    pub fn sends_response_to_client(&self) -> bool {
        matches!(
            self,
            Self::Open
                | Self::RequestVideoInformation
                | Self::RequestAllInformation
                | Self::RequestElapsedTime
                | Self::RequestStatus
                | Self::Play
                | Self::Pause
        )
    }

    /// Whether a response goes to the endpoint established by `connect`.
    ///
    /// Only frame capture, whose completion may outlive the request.
    pub fn sends_response_to_remote(&self) -> bool {
        matches!(self, Self::FrameCapture)
    }

    /// Whether this verb produces any response on success.
    pub fn sends_any_response(&self) -> bool {
        self.sends_response_to_client() || self.sends_response_to_remote()
    }
}

impl fmt::Display for CommandVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
