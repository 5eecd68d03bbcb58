use crate::{
    ProtocolError,
    command::{Command, CommandVerb, Field, field::describe_value},
};

use std::panic::Location;

use error_location::ErrorLocation;
use url::Url;
use uuid::Uuid;

/// Strongly-typed arguments for one verb, extracted once validation passes.
///
/// Every UUID here has already been checked; handlers never re-validate.
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// `connect`
    Connect {
        /// Remote port for asynchronous replies.
        port: u16,
        /// Remote host, defaulting to the sender's address.
        host: String,
    },
    /// `open`
    Open {
        /// Location of the video.
        url: Url,
        /// Client-chosen identifier for the video.
        uuid: Uuid,
    },
    /// `close`
    Close {
        /// Target video.
        uuid: Uuid,
    },
    /// `show`
    Show {
        /// Target video.
        uuid: Uuid,
    },
    /// `request video information`
    RequestVideoInformation {
        /// Target video, or the frontmost one when `None` (absent or not a UUID).
        uuid: Option<Uuid>,
    },
    /// `request all information`
    RequestAllInformation,
    /// `play`
    Play {
        /// Target video.
        uuid: Uuid,
        /// Signed playback rate, 1.0 being normal speed.
        rate: f64,
    },
    /// `pause`
    Pause {
        /// Target video.
        uuid: Uuid,
    },
    /// `request elapsed time`
    RequestElapsedTime {
        /// Target video.
        uuid: Uuid,
    },
    /// `request status`
    RequestStatus {
        /// Target video.
        uuid: Uuid,
    },
    /// `seek elapsed time`
    SeekElapsedTime {
        /// Target video.
        uuid: Uuid,
        /// Position to seek to.
        elapsed_time_millis: u64,
    },
    /// `framecapture`
    FrameCapture {
        /// Target video.
        uuid: Uuid,
        /// Where the image should be written.
        image_location: Url,
        /// Client identifier for the captured image.
        image_reference_uuid: Uuid,
    },
    /// `frame advance`
    FrameAdvance {
        /// Target video.
        uuid: Uuid,
    },
}

impl Arguments {
    /// Validate the command's fields for its verb and extract typed arguments.
    ///
    /// Fields are checked in the verb's documented order; the first problem
    /// wins. Only UUID fields are semantically validated: any other field
    /// that cannot be coerced counts as missing.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingParameter`] or [`ProtocolError::InvalidUuid`].
    #[track_caller]
    pub fn extract(command: &Command) -> Result<Self, ProtocolError> {
        let verb = command.verb();

        let arguments = match verb {
            CommandVerb::Connect => Self::Connect {
                port: required(verb, "port", command.port())?,
                host: command.host(),
            },
            CommandVerb::Open => Self::Open {
                url: required(verb, "url", command.url())?,
                uuid: required_uuid(verb, "uuid", command.uuid())?,
            },
            CommandVerb::Close => Self::Close {
                uuid: required_uuid(verb, "uuid", command.uuid())?,
            },
            CommandVerb::Show => Self::Show {
                uuid: required_uuid(verb, "uuid", command.uuid())?,
            },
            CommandVerb::RequestVideoInformation => Self::RequestVideoInformation {
                uuid: optional_uuid(command.uuid()),
            },
            CommandVerb::RequestAllInformation => Self::RequestAllInformation,
            CommandVerb::Play => Self::Play {
                uuid: required_uuid(verb, "uuid", command.uuid())?,
                rate: command.rate(),
            },
            CommandVerb::Pause => Self::Pause {
                uuid: required_uuid(verb, "uuid", command.uuid())?,
            },
            CommandVerb::RequestElapsedTime => Self::RequestElapsedTime {
                uuid: required_uuid(verb, "uuid", command.uuid())?,
            },
            CommandVerb::RequestStatus => Self::RequestStatus {
                uuid: required_uuid(verb, "uuid", command.uuid())?,
            },
            CommandVerb::SeekElapsedTime => Self::SeekElapsedTime {
                uuid: required_uuid(verb, "uuid", command.uuid())?,
                elapsed_time_millis: required(
                    verb,
                    "elapsed_time_millis",
                    command.elapsed_time_millis(),
                )?,
            },
            CommandVerb::FrameCapture => Self::FrameCapture {
                uuid: required_uuid(verb, "uuid", command.uuid())?,
                image_location: required(verb, "image_location", command.image_location())?,
                image_reference_uuid: required_uuid(
                    verb,
                    "image_reference_uuid",
                    command.image_reference_uuid(),
                )?,
            },
            CommandVerb::FrameAdvance => Self::FrameAdvance {
                uuid: required_uuid(verb, "uuid", command.uuid())?,
            },
        };

        Ok(arguments)
    }
}

#[track_caller]
fn required<T>(verb: CommandVerb, name: &'static str, field: Field<T>) -> Result<T, ProtocolError> {
    field.present().ok_or_else(|| ProtocolError::MissingParameter {
        verb,
        name,
        location: ErrorLocation::from(Location::caller()),
    })
}

#[track_caller]
fn required_uuid(
    verb: CommandVerb,
    name: &'static str,
    field: Field<Uuid>,
) -> Result<Uuid, ProtocolError> {
    match field {
        Field::Present(uuid) => Ok(uuid),
        Field::Absent => Err(ProtocolError::MissingParameter {
            verb,
            name,
            location: ErrorLocation::from(Location::caller()),
        }),
        Field::Invalid(value) => Err(ProtocolError::InvalidUuid {
            verb,
            value: describe_value(&value),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

/// An unusable optional uuid is ignored; the frontmost video is meant.
fn optional_uuid(field: Field<Uuid>) -> Option<Uuid> {
    field.present()
}
