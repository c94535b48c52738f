//! Hook invocation envelopes.
//!
//! The server calls a hook with a JSON document describing who called, from
//! where, and with what. [`FunctionRequest`] is the envelope for cloud
//! function calls and [`TriggerRequest`] for object triggers. Both are
//! generic over the user type and over their payload, and both implement
//! [`HookRequest`] for the fields they share.
//!
//! Keys follow the tables in [`crate::wire`]. Unknown keys are ignored and
//! absent optional fields are omitted when encoding.

use std::collections::HashMap;

use cloudhook_core::{AnyValue, Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};
use serde_json::Value;

use crate::options::RequestOptions;
use crate::user::CloudUser;
use crate::wire::{self, WireReader, WireWriter};

/// Fields and behavior common to every hook invocation.
pub trait HookRequest: Clone + Send + Sync {
  type User: CloudUser;

  /// `Some(true)` when the caller authenticated with the primary key
  fn primary_key(&self) -> Option<bool>;

  fn user(&self) -> Option<&Self::User>;

  fn installation_id(&self) -> Option<&str>;

  fn ip_address(&self) -> Option<&str>;

  fn headers(&self) -> Option<&HashMap<String, String>>;

  fn log(&self) -> Option<&AnyValue>;

  fn context(&self) -> Option<&AnyValue>;

  /// Same request with the user replaced. Nothing else changes.
  fn replace_user(self, user: Option<Self::User>) -> Self;

  /// Read the server's log payload as `V`.
  fn get_log<V: DeserializeOwned>(&self) -> Result<V> {
    self
      .log()
      .ok_or(Error::FieldAbsent { field: wire::LOG.name })?
      .extract()
  }

  /// Read the context payload as `V`.
  fn get_context<V: DeserializeOwned>(&self) -> Result<V> {
    self
      .context()
      .ok_or(Error::FieldAbsent {
        field: wire::CONTEXT.name,
      })?
      .extract()
  }

  /// Options for calls back to the server made on behalf of this request.
  fn options(&self) -> RequestOptions {
    RequestOptions::for_request(self)
  }
}

/// Parameters for functions that take none. Encodes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyParams {}

/// Fields shared by both envelopes.
#[derive(Debug, Clone, PartialEq)]
struct Common<U> {
  primary_key: Option<bool>,
  user: Option<U>,
  installation_id: Option<String>,
  ip_address: Option<String>,
  headers: Option<HashMap<String, String>>,
  log: Option<AnyValue>,
  context: Option<AnyValue>,
}

impl<U> Default for Common<U> {
  fn default() -> Self {
    Self {
      primary_key: None,
      user: None,
      installation_id: None,
      ip_address: None,
      headers: None,
      log: None,
      context: None,
    }
  }
}

impl<U: DeserializeOwned> Common<U> {
  fn read(reader: &mut WireReader) -> Result<Self> {
    Ok(Self {
      primary_key: reader.optional(wire::PRIMARY_KEY)?,
      user: reader.optional(wire::USER)?,
      installation_id: reader.optional(wire::INSTALLATION_ID)?,
      ip_address: reader.optional(wire::IP_ADDRESS)?,
      headers: reader.optional(wire::HEADERS)?,
      log: reader.optional(wire::LOG)?,
      context: reader.optional(wire::CONTEXT)?,
    })
  }
}

impl<U: Serialize> Common<U> {
  fn write(&self, writer: &mut WireWriter) -> serde_json::Result<()> {
    writer.optional(wire::PRIMARY_KEY, self.primary_key.as_ref())?;
    writer.optional(wire::USER, self.user.as_ref())?;
    writer.optional(wire::INSTALLATION_ID, self.installation_id.as_ref())?;
    writer.optional(wire::IP_ADDRESS, self.ip_address.as_ref())?;
    writer.optional(wire::HEADERS, self.headers.as_ref())?;
    writer.optional(wire::LOG, self.log.as_ref())?;
    writer.optional(wire::CONTEXT, self.context.as_ref())?;
    Ok(())
  }
}

macro_rules! common_builders {
  () => {
    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
      self.common.primary_key = Some(primary_key);
      self
    }

    pub fn with_user(mut self, user: U) -> Self {
      self.common.user = Some(user);
      self
    }

    pub fn with_installation_id(mut self, installation_id: impl Into<String>) -> Self {
      self.common.installation_id = Some(installation_id.into());
      self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
      self.common.ip_address = Some(ip_address.into());
      self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
      self.common.headers = Some(headers);
      self
    }

    pub fn with_log(mut self, log: AnyValue) -> Self {
      self.common.log = Some(log);
      self
    }

    pub fn with_context(mut self, context: AnyValue) -> Self {
      self.common.context = Some(context);
      self
    }
  };
}

macro_rules! impl_hook_request {
  ($ty:ident < $u:ident, $p:ident >) => {
    impl<$u, $p> HookRequest for $ty<$u, $p>
    where
      $u: CloudUser,
      $p: Clone + Send + Sync,
    {
      type User = $u;

      fn primary_key(&self) -> Option<bool> {
        self.common.primary_key
      }

      fn user(&self) -> Option<&$u> {
        self.common.user.as_ref()
      }

      fn installation_id(&self) -> Option<&str> {
        self.common.installation_id.as_deref()
      }

      fn ip_address(&self) -> Option<&str> {
        self.common.ip_address.as_deref()
      }

      fn headers(&self) -> Option<&HashMap<String, String>> {
        self.common.headers.as_ref()
      }

      fn log(&self) -> Option<&AnyValue> {
        self.common.log.as_ref()
      }

      fn context(&self) -> Option<&AnyValue> {
        self.common.context.as_ref()
      }

      fn replace_user(mut self, user: Option<$u>) -> Self {
        self.common.user = user;
        self
      }
    }

    impl<$u: Serialize, $p: Serialize> Serialize for $ty<$u, $p> {
      fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self
          .to_value()
          .map_err(serde::ser::Error::custom)?
          .serialize(serializer)
      }
    }

    impl<'de, $u: DeserializeOwned, $p: DeserializeOwned> Deserialize<'de> for $ty<$u, $p> {
      fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
      }
    }
  };
}

// ============================================================================
// Function invocations
// ============================================================================

/// A cloud function invocation carrying parameters of type `P`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRequest<U, P> {
  common: Common<U>,
  pub function_name: Option<String>,
  pub parameters: P,
}

impl<U, P> FunctionRequest<U, P> {
  pub fn new(parameters: P) -> Self {
    Self {
      common: Common::default(),
      function_name: None,
      parameters,
    }
  }

  pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
    self.function_name = Some(name.into());
    self
  }

  common_builders!();
}

impl<U: DeserializeOwned, P: DeserializeOwned> FunctionRequest<U, P> {
  pub fn from_value(value: Value) -> Result<Self> {
    let mut reader = WireReader::new(value)?;
    Ok(Self {
      common: Common::read(&mut reader)?,
      function_name: reader.optional(wire::FUNCTION_NAME)?,
      parameters: reader.required(wire::PARAMETERS)?,
    })
  }

  pub fn from_json_str(s: &str) -> Result<Self> {
    let value: Value = serde_json::from_str(s).map_err(|e| Error::decode(wire::ROOT, e))?;
    Self::from_value(value)
  }
}

impl<U: Serialize, P: Serialize> FunctionRequest<U, P> {
  pub fn to_value(&self) -> serde_json::Result<Value> {
    let mut writer = WireWriter::default();
    self.common.write(&mut writer)?;
    writer.optional(wire::FUNCTION_NAME, self.function_name.as_ref())?;
    writer.required(wire::PARAMETERS, &self.parameters)?;
    Ok(writer.finish())
  }
}

impl_hook_request!(FunctionRequest<U, P>);

// ============================================================================
// Trigger invocations
// ============================================================================

/// An object trigger invocation (before/after save, delete, find).
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRequest<U, O> {
  common: Common<U>,
  pub trigger_name: Option<String>,
  pub object: O,
  /// Stored state of the object before the change, for update triggers
  pub original_object: Option<O>,
}

impl<U, O> TriggerRequest<U, O> {
  pub fn new(object: O) -> Self {
    Self {
      common: Common::default(),
      trigger_name: None,
      object,
      original_object: None,
    }
  }

  pub fn with_trigger_name(mut self, name: impl Into<String>) -> Self {
    self.trigger_name = Some(name.into());
    self
  }

  pub fn with_original_object(mut self, original: O) -> Self {
    self.original_object = Some(original);
    self
  }

  common_builders!();
}

impl<U: DeserializeOwned, O: DeserializeOwned> TriggerRequest<U, O> {
  pub fn from_value(value: Value) -> Result<Self> {
    let mut reader = WireReader::new(value)?;
    Ok(Self {
      common: Common::read(&mut reader)?,
      trigger_name: reader.optional(wire::TRIGGER_NAME)?,
      object: reader.required(wire::OBJECT)?,
      original_object: reader.optional(wire::ORIGINAL_OBJECT)?,
    })
  }

  pub fn from_json_str(s: &str) -> Result<Self> {
    let value: Value = serde_json::from_str(s).map_err(|e| Error::decode(wire::ROOT, e))?;
    Self::from_value(value)
  }
}

impl<U: Serialize, O: Serialize> TriggerRequest<U, O> {
  pub fn to_value(&self) -> serde_json::Result<Value> {
    let mut writer = WireWriter::default();
    self.common.write(&mut writer)?;
    writer.optional(wire::TRIGGER_NAME, self.trigger_name.as_ref())?;
    writer.required(wire::OBJECT, &self.object)?;
    writer.optional(wire::ORIGINAL_OBJECT, self.original_object.as_ref())?;
    Ok(writer.finish())
  }
}

impl_hook_request!(TriggerRequest<U, O>);

#[cfg(test)]
mod tests {
  use super::*;
  use crate::User;
  use cloudhook_core::ErrorKind;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Score {
    points: u32,
  }

  #[test]
  fn test_decode_renamed_keys() {
    let request: FunctionRequest<User, Score> = FunctionRequest::from_value(json!({
      "master": true,
      "ip": "1.2.3.4",
      "installationId": "inst",
      "functionName": "award",
      "params": {"points": 5}
    }))
    .unwrap();

    assert_eq!(request.primary_key(), Some(true));
    assert_eq!(request.ip_address(), Some("1.2.3.4"));
    assert_eq!(request.installation_id(), Some("inst"));
    assert_eq!(request.function_name.as_deref(), Some("award"));
    assert_eq!(request.parameters, Score { points: 5 });
    assert!(request.user().is_none());
  }

  #[test]
  fn test_encode_omits_absent_fields() {
    let request = FunctionRequest::<User, _>::new(Score { points: 1 })
      .with_primary_key(false)
      .with_ip_address("::1");

    let encoded = request.to_value().unwrap();
    assert_eq!(encoded, json!({"master": false, "ip": "::1", "params": {"points": 1}}));
  }

  #[test]
  fn test_empty_params_encode_as_object() {
    let request = FunctionRequest::<User, _>::new(EmptyParams::default());
    assert_eq!(request.to_value().unwrap(), json!({"params": {}}));
  }

  #[test]
  fn test_missing_params_is_decode_failure() {
    let err = FunctionRequest::<User, EmptyParams>::from_value(json!({"master": true})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert!(err.to_string().contains("`params`"));
  }

  #[test]
  fn test_wrong_type_names_key() {
    let err = FunctionRequest::<User, EmptyParams>::from_value(json!({"master": "yes", "params": {}})).unwrap_err();
    assert!(err.to_string().contains("`master`"));
  }

  #[test]
  fn test_malformed_json_is_root_failure() {
    let err = FunctionRequest::<User, EmptyParams>::from_json_str("{not json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert!(err.to_string().contains("<root>"));
  }

  #[test]
  fn test_unknown_keys_ignored() {
    let request: FunctionRequest<User, EmptyParams> =
      FunctionRequest::from_value(json!({"params": {}, "somethingNew": [1, 2, 3]})).unwrap();
    assert_eq!(request, FunctionRequest::new(EmptyParams::default()));
  }

  #[test]
  fn test_log_and_context_accessors() {
    let request = FunctionRequest::<User, _>::new(EmptyParams::default())
      .with_log(AnyValue::decode(json!({"level": "info"})))
      .with_context(AnyValue::decode(json!(["a", "b"])));

    let log: HashMap<String, String> = request.get_log().unwrap();
    assert_eq!(log.get("level").map(String::as_str), Some("info"));

    let context: Vec<String> = request.get_context().unwrap();
    assert_eq!(context, vec!["a", "b"]);

    let err = request.get_context::<u32>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
  }

  #[test]
  fn test_absent_log_is_field_absent() {
    let request = FunctionRequest::<User, _>::new(EmptyParams::default());
    let err = request.get_log::<Value>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldAbsent);
    assert!(err.to_string().contains("log"));
  }

  #[test]
  fn test_replace_user_changes_only_user() {
    let request = FunctionRequest::new(Score { points: 2 })
      .with_primary_key(true)
      .with_headers(HashMap::from([("x-app".to_string(), "demo".to_string())]))
      .with_user(User::with_object_id("u1"));

    let replaced = request.clone().replace_user(Some(User::with_object_id("u1")));
    assert_eq!(replaced, request);

    let cleared = request.clone().replace_user(None);
    assert!(cleared.user().is_none());
    assert_eq!(cleared.headers(), request.headers());
    assert_eq!(cleared.parameters, request.parameters);
  }

  #[test]
  fn test_trigger_decode() {
    let request: TriggerRequest<User, Score> = TriggerRequest::from_value(json!({
      "triggerName": "beforeSave",
      "object": {"points": 9},
      "originalObject": {"points": 4},
      "user": {"objectId": "u1"}
    }))
    .unwrap();

    assert_eq!(request.trigger_name.as_deref(), Some("beforeSave"));
    assert_eq!(request.object, Score { points: 9 });
    assert_eq!(request.original_object, Some(Score { points: 4 }));
    assert_eq!(request.user().and_then(|u| u.object_id.as_deref()), Some("u1"));
  }

  #[test]
  fn test_trigger_requires_object() {
    let err = TriggerRequest::<User, Score>::from_value(json!({"triggerName": "afterSave"})).unwrap_err();
    assert!(err.to_string().contains("`object`"));
  }

  #[test]
  fn test_serde_impls_delegate() {
    let request = TriggerRequest::<User, _>::new(Score { points: 3 }).with_trigger_name("afterDelete");
    let text = serde_json::to_string(&request).unwrap();
    let decoded: TriggerRequest<User, Score> = serde_json::from_str(&text).unwrap();
    assert_eq!(decoded, request);
  }
}
