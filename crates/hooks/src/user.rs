//! User records attached to hook invocations.
//!
//! The copy of a user the server embeds in an invocation is partial. When it
//! is combined with the full record fetched from the store, each field follows
//! a [`FieldPolicy`]:
//!
//! | field                                  | policy                |
//! |----------------------------------------|-----------------------|
//! | `objectId`, `sessionToken`             | identity (keep local) |
//! | every other standard and custom field  | server authoritative  |
//!
//! The embedded copy is a snapshot with no pending edits, so the stored
//! record wins wherever it has a value. Local values only fill gaps the
//! stored record leaves.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cloudhook_core::{Error, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

/// How a field is resolved when a local record is merged with a fetched one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
  /// The local value is kept unconditionally
  Identity,
  /// The fetched value replaces the local one whenever the server sent it
  ServerAuthoritative,
  /// The local value is kept when present, otherwise the fetched one fills in
  PreserveLocal,
}

/// Resolve one field under `policy`.
pub fn merge_field<T: Clone>(policy: FieldPolicy, local: &Option<T>, server: &Option<T>) -> Option<T> {
  match policy {
    FieldPolicy::Identity => local.clone(),
    FieldPolicy::ServerAuthoritative => server.clone().or_else(|| local.clone()),
    FieldPolicy::PreserveLocal => local.clone().or_else(|| server.clone()),
  }
}

/// A user record a hook invocation can carry.
pub trait CloudUser: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync {
  fn object_id(&self) -> Option<&str>;

  fn session_token(&self) -> Option<&str>;

  /// Combine this (local) record with a freshly fetched copy of the same user.
  ///
  /// Fails with [`Error::IdentityMismatch`] when both records carry an
  /// object id and the ids differ.
  fn merge(&self, fetched: &Self) -> Result<Self>;
}

/// Standard user record.
///
/// Keys the server sends beyond the standard ones land in `custom`.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub object_id: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
  pub username: Option<String>,
  pub email: Option<String>,
  pub email_verified: Option<bool>,
  pub auth_data: Option<HashMap<String, Value>>,
  pub session_token: Option<String>,
  #[serde(flatten)]
  pub custom: Map<String, Value>,
}

impl User {
  /// Policy for each standard field, by wire key. Unlisted keys are custom
  /// fields and follow [`FieldPolicy::ServerAuthoritative`].
  pub const FIELD_POLICIES: &'static [(&'static str, FieldPolicy)] = &[
    ("objectId", FieldPolicy::Identity),
    ("sessionToken", FieldPolicy::Identity),
    ("createdAt", FieldPolicy::ServerAuthoritative),
    ("updatedAt", FieldPolicy::ServerAuthoritative),
    ("emailVerified", FieldPolicy::ServerAuthoritative),
    ("authData", FieldPolicy::ServerAuthoritative),
    ("username", FieldPolicy::ServerAuthoritative),
    ("email", FieldPolicy::ServerAuthoritative),
  ];

  pub fn policy(key: &str) -> FieldPolicy {
    Self::FIELD_POLICIES
      .iter()
      .find(|(k, _)| *k == key)
      .map(|(_, policy)| *policy)
      .unwrap_or(FieldPolicy::ServerAuthoritative)
  }

  pub fn with_object_id(object_id: impl Into<String>) -> Self {
    Self {
      object_id: Some(object_id.into()),
      ..Default::default()
    }
  }

  fn merge_custom(&self, fetched: &Self) -> Map<String, Value> {
    let present = |map: &Map<String, Value>, key: &str| map.get(key).filter(|v| !v.is_null()).cloned();

    let mut merged = Map::new();
    for key in self.custom.keys().chain(fetched.custom.keys()) {
      if merged.contains_key(key) {
        continue;
      }
      let local = present(&self.custom, key);
      let server = present(&fetched.custom, key);
      if let Some(value) = merge_field(Self::policy(key), &local, &server) {
        merged.insert(key.clone(), value);
      }
    }
    merged
  }
}

impl CloudUser for User {
  fn object_id(&self) -> Option<&str> {
    self.object_id.as_deref()
  }

  fn session_token(&self) -> Option<&str> {
    self.session_token.as_deref()
  }

  fn merge(&self, fetched: &Self) -> Result<Self> {
    if let (Some(local), Some(server)) = (&self.object_id, &fetched.object_id)
      && local != server
    {
      return Err(Error::IdentityMismatch {
        expected: local.clone(),
        found: server.clone(),
      });
    }

    Ok(Self {
      object_id: merge_field(Self::policy("objectId"), &self.object_id, &fetched.object_id),
      created_at: merge_field(Self::policy("createdAt"), &self.created_at, &fetched.created_at),
      updated_at: merge_field(Self::policy("updatedAt"), &self.updated_at, &fetched.updated_at),
      username: merge_field(Self::policy("username"), &self.username, &fetched.username),
      email: merge_field(Self::policy("email"), &self.email, &fetched.email),
      email_verified: merge_field(Self::policy("emailVerified"), &self.email_verified, &fetched.email_verified),
      auth_data: merge_field(Self::policy("authData"), &self.auth_data, &fetched.auth_data),
      session_token: merge_field(Self::policy("sessionToken"), &self.session_token, &fetched.session_token),
      custom: self.merge_custom(fetched),
    })
  }
}
