//! Common API types and utilities

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::PlatformError;

pub(crate) mod string_or_number {
    use serde::{de, Deserialize, Deserializer};
    use std::collections::HashMap;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNum {
        Int(i64),
        Float(f64),
        Str(String),
    }

    impl StringOrNum {
        fn into_i64<E: de::Error>(self) -> Result<i64, E> {
            match self {
                StringOrNum::Int(n) => Ok(n),
                StringOrNum::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
                StringOrNum::Float(f) => Err(E::custom(format!("invalid number: {}", f))),
                StringOrNum::Str(s) => s.trim().parse().map_err(|_| E::custom(format!("invalid number: {:?}", s))),
            }
        }
    }

    /// Map whose values may be JSON numbers or numeric strings.
    pub fn deserialize_i64_map<'de, D>(deserializer: D) -> Result<HashMap<String, i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<HashMap<String, StringOrNum>>::deserialize(deserializer)?.unwrap_or_default();
        raw.into_iter()
            .map(|(k, v)| v.into_i64().map(|n| (k, n)))
            .collect()
    }
}

/// Standard message response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Map an upstream status onto our response, falling back to 502 for codes
/// axum cannot represent.
pub fn passthrough_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Request body whose parse failure is left to the handler, so the caller can
/// be authorized before the payload is looked at.
pub type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Unwrap a deferred body; a rejection becomes a validation error.
pub fn json_body<T>(body: JsonBody<T>) -> crate::shared::error::Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| PlatformError::validation(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(default, deserialize_with = "string_or_number::deserialize_i64_map")]
        values: HashMap<String, i64>,
    }

    #[test]
    fn test_mixed_values() {
        let w: Wrapper = serde_json::from_str(r#"{"values": {"a": 5, "b": "-1", "c": 7.9}}"#).unwrap();
        assert_eq!(w.values["a"], 5);
        assert_eq!(w.values["b"], -1);
        assert_eq!(w.values["c"], 7);
    }

    #[test]
    fn test_missing_and_null() {
        let w: Wrapper = serde_json::from_str("{}").unwrap();
        assert!(w.values.is_empty());
        let w: Wrapper = serde_json::from_str(r#"{"values": null}"#).unwrap();
        assert!(w.values.is_empty());
    }

    #[test]
    fn test_passthrough_status() {
        assert_eq!(passthrough_status(404), StatusCode::NOT_FOUND);
        assert_eq!(passthrough_status(42), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_non_numeric_string_rejected() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"values": {"a": "soon"}}"#).is_err());
    }
}
