//! Wire schema for hook invocations.
//!
//! Every field the server sends is listed once here, pairing the Rust-side
//! name with its JSON key. Decoding and encoding read keys from these
//! descriptors only.

use cloudhook_core::{Error, Result};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Name used in decode errors when the document itself is malformed.
pub const ROOT: &str = "<root>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireField {
  /// Field name on the Rust type
  pub name: &'static str,
  /// Key in the JSON document
  pub key: &'static str,
  /// Decoding fails when a required key is missing
  pub required: bool,
}

impl WireField {
  const fn optional(name: &'static str, key: &'static str) -> Self {
    Self { name, key, required: false }
  }

  const fn required(name: &'static str, key: &'static str) -> Self {
    Self { name, key, required: true }
  }
}

pub const PRIMARY_KEY: WireField = WireField::optional("primary_key", "master");
pub const USER: WireField = WireField::optional("user", "user");
pub const INSTALLATION_ID: WireField = WireField::optional("installation_id", "installationId");
pub const IP_ADDRESS: WireField = WireField::optional("ip_address", "ip");
pub const HEADERS: WireField = WireField::optional("headers", "headers");
pub const LOG: WireField = WireField::optional("log", "log");
pub const CONTEXT: WireField = WireField::optional("context", "context");

pub const FUNCTION_NAME: WireField = WireField::optional("function_name", "functionName");
pub const PARAMETERS: WireField = WireField::required("parameters", "params");

pub const TRIGGER_NAME: WireField = WireField::optional("trigger_name", "triggerName");
pub const OBJECT: WireField = WireField::required("object", "object");
pub const ORIGINAL_OBJECT: WireField = WireField::optional("original_object", "originalObject");

/// Fields shared by every hook invocation.
pub const COMMON_FIELDS: &[WireField] = &[PRIMARY_KEY, USER, INSTALLATION_ID, IP_ADDRESS, HEADERS, LOG, CONTEXT];

pub const FUNCTION_FIELDS: &[WireField] = &[
  PRIMARY_KEY,
  USER,
  INSTALLATION_ID,
  IP_ADDRESS,
  HEADERS,
  LOG,
  CONTEXT,
  FUNCTION_NAME,
  PARAMETERS,
];

pub const TRIGGER_FIELDS: &[WireField] = &[
  PRIMARY_KEY,
  USER,
  INSTALLATION_ID,
  IP_ADDRESS,
  HEADERS,
  LOG,
  CONTEXT,
  TRIGGER_NAME,
  OBJECT,
  ORIGINAL_OBJECT,
];

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

/// A decoded JSON object being taken apart field by field.
///
/// Keys that no descriptor asks for are left behind and ignored.
pub(crate) struct WireReader(Map<String, Value>);

impl WireReader {
  pub fn new(value: Value) -> Result<Self> {
    match value {
      Value::Object(map) => Ok(Self(map)),
      other => Err(Error::decode(ROOT, format!("expected an object, found {}", json_kind(&other)))),
    }
  }

  /// Read an optional field. Missing keys and explicit nulls both decode to `None`.
  pub fn optional<T: DeserializeOwned>(&mut self, field: WireField) -> Result<Option<T>> {
    match self.0.remove(field.key) {
      None | Some(Value::Null) => Ok(None),
      Some(value) => serde_json::from_value(value)
        .map(Some)
        .map_err(|e| Error::decode(field.key, e)),
    }
  }

  pub fn required<T: DeserializeOwned>(&mut self, field: WireField) -> Result<T> {
    debug_assert!(field.required, "{} is not a required field", field.name);
    let value = self
      .0
      .remove(field.key)
      .ok_or_else(|| Error::decode(field.key, "missing required field"))?;
    serde_json::from_value(value).map_err(|e| Error::decode(field.key, e))
  }
}

/// Builds a JSON object, skipping optional fields that hold no value.
#[derive(Default)]
pub(crate) struct WireWriter(Map<String, Value>);

impl WireWriter {
  pub fn optional<T: Serialize>(&mut self, field: WireField, value: Option<&T>) -> serde_json::Result<()> {
    if let Some(value) = value {
      self.0.insert(field.key.to_string(), serde_json::to_value(value)?);
    }
    Ok(())
  }

  pub fn required<T: Serialize>(&mut self, field: WireField, value: &T) -> serde_json::Result<()> {
    self.0.insert(field.key.to_string(), serde_json::to_value(value)?);
    Ok(())
  }

  pub fn finish(self) -> Value {
    Value::Object(self.0)
  }
}
