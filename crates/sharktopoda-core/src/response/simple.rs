use crate::{command::CommandVerb, response::ResponseStatus, session::PlaybackStatus};

use serde_json::{Map, Value};

/// A response as a client reads it off the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleResponse {
    /// Verb named by the `response` key.
    pub verb: CommandVerb,
    /// Value of the `status` key.
    pub status: ResponseStatus,
    /// Every other key.
    pub payload: Map<String, Value>,
}

impl SimpleResponse {
    /// Parse a decoded response object.
    ///
    /// Returns `None` unless `json` is an object with a known `response`
    /// verb and a known `status`. A playback-state token counts as `ok` and
    /// stays in the payload under `status`.
    pub fn parse(json: Value) -> Option<Self> {
        let Value::Object(mut payload) = json else {
            return None;
        };
        let verb = payload
            .get("response")
            .and_then(Value::as_str)
            .and_then(CommandVerb::from_token)?;
        let token = payload.get("status").and_then(Value::as_str)?;
        let status = match ResponseStatus::from_token(token) {
            Some(status) => {
                payload.remove("status");
                status
            }
            // `request status` reports the playback state in place of "ok".
            None if PlaybackStatus::from_token(token).is_some() => ResponseStatus::Ok,
            None => return None,
        };

        payload.remove("response");

        Some(Self {
            verb,
            status,
            payload,
        })
    }

    /// Decode and parse a datagram.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok().and_then(Self::parse)
    }

    /// Whether the status is `ok`.
    pub fn succeeded(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}
