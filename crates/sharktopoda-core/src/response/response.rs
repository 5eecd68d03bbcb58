//! Outbound response envelope.

use crate::{
    ProtocolError,
    command::{Command, CommandVerb},
    response::json_safe::make_json_safe,
};

use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;
use url::Url;
use uuid::Uuid;

/// Error code for a required field that is absent or unusable.
pub const MISSING_PARAMETER_CODE: i64 = 2;
/// Error code for a UUID field that is not an RFC 4122 string.
pub const INVALID_UUID_CODE: i64 = 3;

/// Whether the command succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// `"ok"`
    Ok,
    /// `"failed"`
    Failed,
}

impl ResponseStatus {
    /// The literal wire token.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
        }
    }

    /// Look up a status by its wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ok" => Some(Self::Ok),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Who produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Interpreter: a required field is missing.
    MissingParameter,
    /// Interpreter: a UUID field is malformed.
    InvalidUuid,
    /// The video layer rejected or failed the operation.
    Domain,
}

/// Structured error detail, echoed to verbose clients as `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    /// Origin of the failure.
    pub kind: ErrorKind,
    /// Stable numeric code.
    pub code: i64,
    /// Human-readable description.
    pub description: String,
}

impl ErrorDetail {
    /// Detail for a missing required field.
    pub fn missing_parameter(verb: CommandVerb, name: &str) -> Self {
        Self {
            kind: ErrorKind::MissingParameter,
            code: MISSING_PARAMETER_CODE,
            description: format!("command \"{verb}\" has no value \"{name}\""),
        }
    }

    /// Detail for a malformed UUID.
    pub fn invalid_uuid(value: &str) -> Self {
        Self {
            kind: ErrorKind::InvalidUuid,
            code: INVALID_UUID_CODE,
            description: format!("{value} is not a valid UUID"),
        }
    }

    /// Detail for a failure reported by the video layer.
    pub fn domain(code: i64, description: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Domain,
            code,
            description: description.into(),
        }
    }

    /// Detail for an interpreter error; `None` for transport-level errors,
    /// which never become wire responses.
    pub fn structural(error: &ProtocolError) -> Option<Self> {
        match error {
            ProtocolError::MissingParameter { verb, name, .. } => {
                Some(Self::missing_parameter(*verb, name))
            }
            ProtocolError::InvalidUuid { value, .. } => Some(Self::invalid_uuid(value)),
            _ => None,
        }
    }

    /// Whether the interpreter, rather than a handler, produced this failure.
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, ErrorKind::MissingParameter | ErrorKind::InvalidUuid)
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)
    }
}

/// A payload value that may need rendering before it is JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    /// Already JSON.
    Json(Value),
    /// Rendered as a lowercase hyphenated string.
    Uuid(Uuid),
    /// Rendered as its string form.
    Url(Url),
    /// Rendered as a number, or `null` when not finite.
    Float(f64),
    /// Rendered element by element.
    List(Vec<PayloadValue>),
    /// Rendered entry by entry.
    Map(BTreeMap<String, PayloadValue>),
}

impl From<Value> for PayloadValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Uuid> for PayloadValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<Url> for PayloadValue {
    fn from(value: Url) -> Self {
        Self::Url(value)
    }
}

impl From<f64> for PayloadValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<u64> for PayloadValue {
    fn from(value: u64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        Self::Json(Value::Bool(value))
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_owned()))
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl From<Vec<PayloadValue>> for PayloadValue {
    fn from(value: Vec<PayloadValue>) -> Self {
        Self::List(value)
    }
}

impl From<BTreeMap<String, PayloadValue>> for PayloadValue {
    fn from(value: BTreeMap<String, PayloadValue>) -> Self {
        Self::Map(value)
    }
}

/// Reply to one command.
///
/// Built once by a handler (or by the interpreter for structural errors),
/// encoded, and discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    verb: CommandVerb,
    status: ResponseStatus,
    payload: BTreeMap<String, PayloadValue>,
    error: Option<ErrorDetail>,
    /// The command's fields, kept only when the client asked for a verbose reply.
    echo: Option<Map<String, Value>>,
    send_on_failure: bool,
}

impl Response {
    /// A success with an empty payload.
    pub fn success(command: &Command) -> Self {
        Self::new(command, ResponseStatus::Ok, None, false)
    }

    /// A success carrying payload entries.
    pub fn success_with_payload(
        command: &Command,
        payload: BTreeMap<String, PayloadValue>,
    ) -> Self {
        let mut response = Self::success(command);
        response.payload = payload;
        response
    }

    /// A failure with detail.
    ///
    /// `send_on_failure` marks whether the failure may be transmitted at all.
    pub fn failure(command: &Command, error: ErrorDetail, send_on_failure: bool) -> Self {
        Self::new(command, ResponseStatus::Failed, Some(error), send_on_failure)
    }

    /// A failure with nothing error-specific attached. Never transmitted
    /// unless the client asked for a verbose reply.
    pub fn unknown_failure(command: &Command) -> Self {
        Self::new(command, ResponseStatus::Failed, None, false)
    }

    fn new(
        command: &Command,
        status: ResponseStatus,
        error: Option<ErrorDetail>,
        send_on_failure: bool,
    ) -> Self {
        Self {
            verb: command.verb(),
            status,
            payload: BTreeMap::new(),
            error,
            echo: command.verbose_response().then(|| command.fields().clone()),
            send_on_failure,
        }
    }

    /// Add one payload entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Verb of the originating command.
    pub fn verb(&self) -> CommandVerb {
        self.verb
    }

    /// Outcome.
    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    /// Whether the status is `ok`.
    pub fn succeeded(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    /// Payload entries.
    pub fn payload(&self) -> &BTreeMap<String, PayloadValue> {
        &self.payload
    }

    /// Failure detail, if any.
    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }

    /// Whether the originating command asked for `verbose_response`.
    pub fn is_verbose(&self) -> bool {
        self.echo.is_some()
    }

    /// Whether this is a failure the interpreter produced.
    pub fn is_structural_failure(&self) -> bool {
        self.error.as_ref().is_some_and(ErrorDetail::is_structural)
    }

    /// Successes always go out; failures only when marked sendable or
    /// when the client asked for a verbose reply.
    pub fn is_transmittable(&self) -> bool {
        self.succeeded() || self.send_on_failure || self.is_verbose()
    }

    /// The JSON object sent on the wire, after the JSON-safety filter.
    ///
    /// Payload entries never overwrite `response`. A successful reply may
    /// carry a string `status` in its payload (the playback state of
    /// `request status`), which then stands in for `"ok"`; a failure always
    /// reads `"failed"`.
    pub fn to_wire_map(&self) -> Map<String, Value> {
        let mut out = make_json_safe(&self.payload);
        out.insert("response".to_owned(), Value::from(self.verb.token()));
        let reports_state = self.succeeded() && out.get("status").is_some_and(Value::is_string);
        if !reports_state {
            out.insert("status".to_owned(), Value::from(self.status.token()));
        }

        if let Some(echo) = &self.echo {
            out.insert("data".to_owned(), Value::Object(echo.clone()));
            let error = self
                .error
                .as_ref()
                .and_then(|detail| serde_json::to_value(detail).ok())
                .unwrap_or(Value::Null);
            out.insert("error".to_owned(), error);
        }

        out
    }

    /// Encoded datagram, or `None` when the object cannot be serialized.
    pub fn to_wire(&self) -> Option<Vec<u8>> {
        match serde_json::to_vec(&Value::Object(self.to_wire_map())) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!(verb = %self.verb, error = %e, "Response is not JSON-encodable");
                None
            }
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.status)?;
        if let Some(error) = &self.error {
            write!(f, " {error}")?;
        }
        Ok(())
    }
}
