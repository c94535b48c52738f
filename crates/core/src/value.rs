//! Type-erased JSON values.
//!
//! Hook invocations carry `log` and `context` payloads whose shape is defined
//! by the server, not by the SDK. [`AnyValue`] keeps such a payload decoded but
//! untyped, and lets the call site recover a concrete type with
//! [`AnyValue::extract`] using the same serde rules that would have applied had
//! the field been typed from the start.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Error, Result};

/// A decoded JSON value with no compile-time type attached.
///
/// Equality is structural: two values are equal when they decoded to the same
/// JSON shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnyValue(serde_json::Value);

impl AnyValue {
  /// Wrap an already decoded JSON value without interpreting it.
  pub fn decode(raw: serde_json::Value) -> Self {
    Self(raw)
  }

  pub fn from_json_str(s: &str) -> Result<Self> {
    serde_json::from_str(s).map(Self).map_err(|e| Error::decode("<value>", e))
  }

  /// Build a value from any serializable type.
  pub fn encode<T: Serialize>(value: &T) -> Result<Self> {
    serde_json::to_value(value)
      .map(Self)
      .map_err(|e| Error::decode("<value>", e))
  }

  /// Reinterpret the stored value as `V`.
  ///
  /// Fails with [`Error::TypeMismatch`] naming `V` when the stored structure
  /// does not fit `V`'s schema.
  pub fn extract<V: DeserializeOwned>(&self) -> Result<V> {
    V::deserialize(&self.0).map_err(|e| Error::TypeMismatch {
      requested: std::any::type_name::<V>(),
      reason: e.to_string(),
    })
  }

  pub fn as_json(&self) -> &serde_json::Value {
    &self.0
  }

  pub fn into_json(self) -> serde_json::Value {
    self.0
  }

  pub fn is_null(&self) -> bool {
    self.0.is_null()
  }
}

impl From<serde_json::Value> for AnyValue {
  fn from(raw: serde_json::Value) -> Self {
    Self::decode(raw)
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;
  use crate::ErrorKind;

  #[derive(Debug, PartialEq, Deserialize, Serialize)]
  struct LogLine {
    level: String,
    message: String,
  }

  #[test]
  fn test_extract_scalars() {
    assert_eq!(AnyValue::decode(json!("hello")).extract::<String>().unwrap(), "hello");
    assert_eq!(AnyValue::decode(json!(42)).extract::<i64>().unwrap(), 42);
    assert!(AnyValue::decode(json!(true)).extract::<bool>().unwrap());
    assert_eq!(AnyValue::decode(json!(null)).extract::<Option<String>>().unwrap(), None);
  }

  #[test]
  fn test_extract_struct() {
    let value = AnyValue::decode(json!({"level": "info", "message": "saved"}));
    let line: LogLine = value.extract().unwrap();
    assert_eq!(
      line,
      LogLine {
        level: "info".into(),
        message: "saved".into()
      }
    );

    // the same value also reads as a loose map
    let map: HashMap<String, String> = value.extract().unwrap();
    assert_eq!(map.get("level").map(String::as_str), Some("info"));
  }

  #[test]
  fn test_extract_mismatch_names_requested_type() {
    let value = AnyValue::decode(json!(["not", "a", "log", "line"]));
    let err = value.extract::<LogLine>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    match err {
      Error::TypeMismatch { requested, .. } => assert!(requested.ends_with("LogLine")),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn test_extract_number_as_string_fails() {
    let value = AnyValue::decode(json!(7));
    assert!(value.extract::<String>().is_err());
    // stored value is untouched by a failed extraction
    assert_eq!(value.extract::<u8>().unwrap(), 7);
  }

  #[test]
  fn test_reencode_extracts_identically() {
    let original = AnyValue::decode(json!({"level": "warn", "message": "slow", "extra": [1, 2.5, null]}));
    let wire = serde_json::to_string(&original).unwrap();
    let decoded: AnyValue = serde_json::from_str(&wire).unwrap();

    assert_eq!(decoded, original);
    assert_eq!(decoded.extract::<LogLine>().unwrap(), original.extract::<LogLine>().unwrap());
    assert_eq!(
      decoded.extract::<serde_json::Value>().unwrap(),
      original.extract::<serde_json::Value>().unwrap()
    );
  }

  #[test]
  fn test_encode_from_typed() {
    let line = LogLine {
      level: "debug".into(),
      message: "x".into(),
    };
    let value = AnyValue::encode(&line).unwrap();
    assert_eq!(value.as_json(), &json!({"level": "debug", "message": "x"}));
  }

  #[test]
  fn test_from_json_str_rejects_garbage() {
    let err = AnyValue::from_json_str("{not json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
  }
}
