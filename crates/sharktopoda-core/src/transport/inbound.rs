use serde_json::Value;

/// Largest payload a single UDP datagram can carry.
pub(crate) const MAX_DATAGRAM_LEN: usize = 65_535;

/// A decoded datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The datagram parsed as JSON.
    Json(Value),
    /// Not JSON, but valid UTF-8 text.
    Text(String),
}

impl Inbound {
    /// JSON first, then UTF-8 text; `None` for anything else.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if let Ok(json) = serde_json::from_slice::<Value>(bytes) {
            return Some(Self::Json(json));
        }
        std::str::from_utf8(bytes)
            .ok()
            .map(|text| Self::Text(text.to_owned()))
    }
}
