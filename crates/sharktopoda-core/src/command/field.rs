use serde_json::Value;

/// Outcome of reading one typed field from a command.
///
/// `Invalid` keeps the raw value so a malformed UUID can be reported
/// back verbatim, and so it is never confused with an absent one.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// The key is not in the message.
    Absent,
    /// The key is present but its value cannot be coerced.
    Invalid(Value),
    /// The coerced value.
    Present(T),
}

impl<T> Field<T> {
    /// The coerced value, if any.
    pub fn present(self) -> Option<T> {
        match self {
            Field::Present(value) => Some(value),
            Field::Absent | Field::Invalid(_) => None,
        }
    }

    /// Whether the key was missing entirely.
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }
}

/// Render a raw JSON value the way a client would recognise it.
pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Accept an unsigned integer, an integral non-negative float, or a numeric string.
pub(crate) fn coerce_unsigned(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Accept a number or a numeric string, rejecting NaN and infinities.
pub(crate) fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}
