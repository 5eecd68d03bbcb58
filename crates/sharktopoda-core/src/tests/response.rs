use crate::{
    CommandVerb, ErrorDetail, PayloadValue, PlaybackStatus, ProtocolError, Response,
    ResponseStatus, SimpleResponse, VideoError,
    tests::support::{VIDEO_UUID, command},
};

use std::{collections::BTreeMap, panic::Location};

use error_location::ErrorLocation;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

/// WHAT: A bare success carries only response and status
/// WHY: Minimal replies are the common case on the wire
#[test]
fn given_success_when_encoding_then_response_and_status_only() {
    // Given: A successful open
    let open = command(json!({"command": "open", "url": "file:///tmp/a.mp4", "uuid": VIDEO_UUID}));
    let response = Response::success(&open);

    // When: Encoding it
    let wire = response.to_wire_map();

    // Then: Exactly the two bookkeeping keys
    assert_eq!(Value::Object(wire), json!({"response": "open", "status": "ok"}));
}

/// WHAT: UUID payload values render lowercase
/// WHY: Clients compare UUID strings byte for byte
#[test]
#[allow(clippy::unwrap_used)]
fn given_uuid_payload_when_encoding_then_lowercase_hyphenated() {
    // Given: A response carrying an uppercase-parsed UUID and a URL
    let info = command(json!({"command": "request video information", "uuid": VIDEO_UUID}));
    let uuid = Uuid::parse_str(VIDEO_UUID).unwrap();
    let url = Url::parse("http://example.com/a.mp4").unwrap();
    let response = Response::success(&info).with("uuid", uuid).with("url", url);

    // When: Encoding it
    let wire = response.to_wire_map();

    // Then: The UUID is lowercase and the URL is a string
    assert_eq!(wire.get("uuid"), Some(&json!(VIDEO_UUID.to_lowercase())));
    assert_eq!(wire.get("url"), Some(&json!("http://example.com/a.mp4")));
}

/// WHAT: Non-finite numbers become null instead of failing the response
/// WHY: One bad value must not suppress the whole reply
#[test]
fn given_non_finite_payload_when_encoding_then_nulled_recursively() {
    // Given: NaN at top level and inside a list and a map
    let status = command(json!({"command": "request status", "uuid": VIDEO_UUID}));
    let nested = BTreeMap::from([("rate".to_owned(), PayloadValue::Float(f64::INFINITY))]);
    let response = Response::success(&status)
        .with("rate", f64::NAN)
        .with("rates", vec![PayloadValue::Float(1.0), PayloadValue::Float(f64::NAN)])
        .with("player", nested);

    // When: Encoding it
    let bytes = response.to_wire();

    // Then: Encoding succeeds with nulls in place
    let Some(bytes) = bytes else {
        unreachable!("a filtered response always encodes");
    };
    let wire: Value = serde_json::from_slice(&bytes).unwrap_or_default();
    assert_eq!(wire["rate"], Value::Null);
    assert_eq!(wire["rates"], json!([1.0, null]));
    assert_eq!(wire["player"], json!({"rate": null}));
}

/// WHAT: Payload keys cannot overwrite response, nor status on a failure
/// WHY: The envelope must always describe the real outcome
#[test]
fn given_payload_named_status_when_encoding_failure_then_envelope_wins() {
    // Given: A failed pause whose payload collides with both envelope keys
    let pause = command(json!({"command": "pause", "uuid": VIDEO_UUID}));
    let response = Response::failure(&pause, ErrorDetail::domain(12, "No video"), true)
        .with("status", "paused")
        .with("response", "nothing");

    // When: Encoding it
    let wire = response.to_wire_map();

    // Then: The envelope values survive
    assert_eq!(wire.get("status"), Some(&json!("failed")));
    assert_eq!(wire.get("response"), Some(&json!("pause")));
}

/// WHAT: A successful status reply reports the playback state as its status
/// WHY: Clients read `status` to learn whether the video is playing
#[test]
fn given_status_payload_on_success_when_encoding_then_state_replaces_ok() {
    // Given: A successful status request reporting "paused"
    let status = command(json!({"command": "request status", "uuid": VIDEO_UUID}));
    let response = Response::success(&status).with("status", PlaybackStatus::Paused.token());

    // When: Encoding it
    let wire = response.to_wire_map();

    // Then: status carries the state
    assert_eq!(
        Value::Object(wire),
        json!({"response": "request status", "status": "paused"})
    );
}

/// WHAT: Verbose failures echo the fields and the error detail
/// WHY: Debugging clients see exactly what the player understood
#[test]
fn given_verbose_failure_when_encoding_then_data_and_error_present() {
    // Given: A verbose seek that failed structurally
    let seek = command(json!({
        "command": "seek elapsed time",
        "uuid": VIDEO_UUID,
        "verbose_response": true
    }));
    let detail = ErrorDetail::missing_parameter(CommandVerb::SeekElapsedTime, "elapsed_time_millis");
    let response = Response::failure(&seek, detail, true);

    // When: Encoding it
    let wire = response.to_wire_map();

    // Then: data echoes the original fields minus `command`
    assert_eq!(
        wire.get("data"),
        Some(&json!({"uuid": VIDEO_UUID, "verbose_response": true}))
    );
    assert_eq!(wire["error"]["kind"], json!("missing_parameter"));
    assert_eq!(wire["error"]["code"], json!(2));
    assert_eq!(wire.get("status"), Some(&json!("failed")));
}

/// WHAT: Verbose successes carry a null error
/// WHY: The key is always present for verbose clients
#[test]
fn given_verbose_success_when_encoding_then_error_is_null() {
    let pause = command(json!({"command": "pause", "uuid": VIDEO_UUID, "verbose_response": true}));

    let wire = Response::success(&pause).to_wire_map();

    assert_eq!(wire.get("error"), Some(&Value::Null));
    assert!(wire.contains_key("data"));
}

/// WHAT: Non-verbose responses never include data
/// WHY: Echoing is opt-in
#[test]
fn given_non_verbose_failure_when_encoding_then_no_data_or_error() {
    let pause = command(json!({"command": "pause", "uuid": VIDEO_UUID}));
    let detail = ErrorDetail::domain(12, "No video");

    let wire = Response::failure(&pause, detail, true).to_wire_map();

    assert!(!wire.contains_key("data"));
    assert!(!wire.contains_key("error"));
}

/// WHAT: Transmittability follows status, the sendable flag and verbosity
/// WHY: Unsendable failures are logged locally only
#[test]
fn given_failure_variants_when_checking_transmittable_then_rules_apply() {
    // Given: Plain and verbose commands
    let plain = command(json!({"command": "close", "uuid": VIDEO_UUID}));
    let verbose = command(json!({"command": "close", "uuid": VIDEO_UUID, "verbose_response": true}));
    let detail = || ErrorDetail::domain(12, "No video");

    // When/Then: Each rule holds
    assert!(Response::success(&plain).is_transmittable());
    assert!(!Response::failure(&plain, detail(), false).is_transmittable());
    assert!(Response::failure(&plain, detail(), true).is_transmittable());
    assert!(Response::failure(&verbose, detail(), false).is_transmittable());
    assert!(!Response::unknown_failure(&plain).is_transmittable());
    assert!(Response::unknown_failure(&verbose).is_transmittable());
}

/// WHAT: Encoding then parsing client-side recovers verb, status and payload
/// WHY: Test clients rely on SimpleResponse to read replies
#[test]
fn given_encoded_response_when_parsed_by_client_then_same_content() {
    // Given: A status reply with a payload
    let status = command(json!({"command": "request status", "uuid": VIDEO_UUID}));
    let response = Response::success(&status).with("status", "playing").with("extra", 5_u64);
    let bytes = response.to_wire().unwrap_or_default();

    // When: Parsing it as a client
    let parsed = SimpleResponse::from_slice(&bytes);

    // Then: The playback state reads as ok and stays in the payload
    let Some(parsed) = parsed else {
        unreachable!("encoded response must parse");
    };
    assert_eq!(parsed.verb, CommandVerb::RequestStatus);
    assert_eq!(parsed.status, ResponseStatus::Ok);
    assert!(parsed.succeeded());
    assert_eq!(
        Value::Object(parsed.payload),
        json!({"status": "playing", "extra": 5})
    );
}

/// WHAT: Plain replies drop both bookkeeping keys when parsed
/// WHY: The payload is what the handler added, nothing more
#[test]
fn given_plain_reply_when_parsed_by_client_then_payload_excludes_envelope() {
    let elapsed = command(json!({"command": "request elapsed time", "uuid": VIDEO_UUID}));
    let bytes = Response::success(&elapsed)
        .with("elapsed_time_millis", 1500_u64)
        .to_wire()
        .unwrap_or_default();

    let parsed = SimpleResponse::from_slice(&bytes);

    assert_eq!(
        parsed.map(|p| Value::Object(p.payload)),
        Some(json!({"elapsed_time_millis": 1500}))
    );
}

/// WHAT: Client parsing rejects unknown verbs and statuses
/// WHY: Garbage replies must not look like real ones
#[test]
fn given_unknown_tokens_when_parsing_client_side_then_none() {
    assert!(SimpleResponse::parse(json!({"response": "rewind", "status": "ok"})).is_none());
    assert!(SimpleResponse::parse(json!({"response": "play", "status": "maybe"})).is_none());
    assert!(SimpleResponse::parse(json!({"status": "ok"})).is_none());
    assert!(SimpleResponse::from_slice(b"not json").is_none());
}

/// WHAT: Video errors map to their stable codes
/// WHY: Clients branch on the numeric code
#[test]
fn given_video_errors_when_detailed_then_codes_are_stable() {
    let location = || ErrorLocation::from(Location::caller());
    let cases = [
        (
            VideoError::UnsupportedUrl {
                url: "ftp://x".to_owned(),
                location: location(),
            },
            11,
        ),
        (
            VideoError::NoVideoForUuid {
                uuid: Uuid::nil(),
                location: location(),
            },
            12,
        ),
        (
            VideoError::NoUrlForUuid {
                uuid: Uuid::nil(),
                location: location(),
            },
            13,
        ),
        (VideoError::NoFocusedVideo { location: location() }, 14),
        (
            VideoError::Unreachable {
                url: "file:///missing".to_owned(),
                reason: "not found".to_owned(),
                location: location(),
            },
            15,
        ),
        (
            VideoError::CaptureFailed {
                reason: "decoder".to_owned(),
                location: location(),
            },
            16,
        ),
        (
            VideoError::Inconsistency {
                reason: "state".to_owned(),
                location: location(),
            },
            99,
        ),
    ];

    for (error, code) in cases {
        let detail = error.detail();
        assert_eq!(detail.code, code);
        assert!(!detail.is_structural());
        assert!(!detail.description.is_empty());
    }
}

/// WHAT: Playback status follows the rate
/// WHY: Only exactly 1.0 counts as playing
#[test]
fn given_rates_when_classifying_then_status_tokens_match() {
    assert_eq!(PlaybackStatus::from_rate(1.0).token(), "playing");
    assert_eq!(PlaybackStatus::from_rate(2.0).token(), "shuttling forward");
    assert_eq!(PlaybackStatus::from_rate(-1.0).token(), "shuttling reverse");
    assert_eq!(PlaybackStatus::from_rate(0.0).token(), "paused");
    assert_eq!(
        PlaybackStatus::from_token("shuttling reverse"),
        Some(PlaybackStatus::ShuttlingReverse)
    );
    assert_eq!(PlaybackStatus::from_token("stopped"), None);
}

/// WHAT: Only missing and invalid fields are structural protocol errors
/// WHY: Exactly those become wire failures; transport errors never do
#[test]
fn given_protocol_errors_when_classifying_then_structural_matches_wire_detail() {
    // Given: One error of each kind the interpreter or transport raises
    let location = || ErrorLocation::from(Location::caller());
    let cases = [
        (
            ProtocolError::MissingParameter {
                verb: CommandVerb::Close,
                name: "uuid",
                location: location(),
            },
            true,
        ),
        (
            ProtocolError::InvalidUuid {
                verb: CommandVerb::Show,
                value: "nope".to_owned(),
                location: location(),
            },
            true,
        ),
        (
            ProtocolError::MalformedMessage {
                reason: "not an object".to_owned(),
                location: location(),
            },
            false,
        ),
        (
            ProtocolError::NotListening {
                location: location(),
            },
            false,
        ),
        (
            ProtocolError::SessionClosed {
                location: location(),
            },
            false,
        ),
    ];

    for (error, structural) in cases {
        // When: Classifying and converting to wire detail
        let detail = ErrorDetail::structural(&error);

        // Then: Both agree, and the detail is itself structural
        assert_eq!(error.is_structural(), structural, "{error}");
        assert_eq!(detail.is_some(), structural, "{error}");
        assert!(detail.is_none_or(|d| d.is_structural()));
    }
}
