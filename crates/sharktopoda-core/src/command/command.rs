//! Inbound command parsing and typed field access.

use crate::{
    command::{
        CommandVerb, Field,
        field::{coerce_float, coerce_unsigned},
    },
    response::Response,
    transport::ClientAddress,
};

use std::{fmt, sync::Arc};

use serde_json::{Map, Value};
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Playback rate used when a command does not specify a usable one.
pub const DEFAULT_RATE: f64 = 1.0;

/// Length of the hyphenated RFC 4122 string form.
const HYPHENATED_UUID_LEN: usize = 36;

/// Callback through which a command's response is delivered.
///
/// Cloneable so a handler can keep it after dispatch returns, e.g. until
/// an asynchronous frame capture completes.
#[derive(Clone)]
pub struct Responder(Arc<dyn Fn(Response) + Send + Sync>);

impl Responder {
    /// Wrap a response callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Response) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Deliver a response.
    pub fn respond(&self, response: Response) {
        (self.0)(response)
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Responder")
    }
}

/// A parsed inbound request awaiting dispatch.
///
/// Only constructed for messages whose `command` token is a known verb;
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Command {
    verb: CommandVerb,
    fields: Map<String, Value>,
    source: ClientAddress,
    responder: Option<Responder>,
}

impl Command {
    /// Parse a decoded JSON message.
    ///
    /// Returns `None` unless `json` is an object whose `command` entry is
    /// one of the verb tokens. `fields` keeps everything except `command`.
    pub fn parse(json: Value, source: ClientAddress, responder: Option<Responder>) -> Option<Self> {
        let Value::Object(mut fields) = json else {
            return None;
        };
        let verb = fields
            .get("command")
            .and_then(Value::as_str)
            .and_then(CommandVerb::from_token)?;
        fields.remove("command");

        Some(Self {
            verb,
            fields,
            source,
            responder,
        })
    }

    /// The requested operation.
    pub fn verb(&self) -> CommandVerb {
        self.verb
    }

    /// The original message minus the `command` key.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Raw access to one field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The client endpoint the command arrived from.
    pub fn source(&self) -> ClientAddress {
        self.source
    }

    /// Deliver a response through the command's callback, if it has one.
    pub fn respond(&self, response: Response) {
        match &self.responder {
            Some(responder) => responder.respond(response),
            None => debug!(verb = %self.verb, "No responder attached, response dropped"),
        }
    }

    /// `port` as a number or numeric string in `0..=65535`.
    pub fn port(&self) -> Field<u16> {
        self.typed("port", |value| {
            coerce_unsigned(value).and_then(|port| u16::try_from(port).ok())
        })
    }

    /// `host`, defaulting to the address the command came from.
    pub fn host(&self) -> String {
        self.fields
            .get("host")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| self.source.host())
    }

    /// `url` parsed as an absolute URI.
    pub fn url(&self) -> Field<Url> {
        self.typed("url", parse_url)
    }

    /// `uuid`, validated as an RFC 4122 string.
    pub fn uuid(&self) -> Field<Uuid> {
        self.typed("uuid", parse_uuid)
    }

    /// `rate`, or [`DEFAULT_RATE`] when absent or unparseable.
    pub fn rate(&self) -> f64 {
        self.fields
            .get("rate")
            .and_then(coerce_float)
            .unwrap_or(DEFAULT_RATE)
    }

    /// `elapsed_time_millis` as a non-negative integer.
    pub fn elapsed_time_millis(&self) -> Field<u64> {
        self.typed("elapsed_time_millis", coerce_unsigned)
    }

    /// `image_location` parsed as an absolute URI.
    pub fn image_location(&self) -> Field<Url> {
        self.typed("image_location", parse_url)
    }

    /// `image_reference_uuid`, validated as an RFC 4122 string.
    pub fn image_reference_uuid(&self) -> Field<Uuid> {
        self.typed("image_reference_uuid", parse_uuid)
    }

    /// Whether the client asked for its fields and any error to be echoed.
    pub fn verbose_response(&self) -> bool {
        self.fields
            .get("verbose_response")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn typed<T>(&self, key: &str, coerce: impl FnOnce(&Value) -> Option<T>) -> Field<T> {
        match self.fields.get(key) {
            None => Field::Absent,
            Some(value) => match coerce(value) {
                Some(typed) => Field::Present(typed),
                None => Field::Invalid(value.clone()),
            },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, Value::Object(self.fields.clone()))
    }
}

fn parse_url(value: &Value) -> Option<Url> {
    value.as_str().and_then(|s| Url::parse(s).ok())
}

/// Only the hyphenated 36-character form is accepted; `uuid` would also
/// take simple, braced and URN forms.
fn parse_uuid(value: &Value) -> Option<Uuid> {
    value
        .as_str()
        .filter(|s| s.len() == HYPHENATED_UUID_LEN)
        .and_then(|s| Uuid::parse_str(s).ok())
}
