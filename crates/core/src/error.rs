use std::time::Duration;

use thiserror::Error;

/// Failure reported by the remote object store while fetching a record.
///
/// This is the cause wrapped by [`Error::FetchFailure`]. Store implementations
/// translate their transport-specific failures into one of these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
  #[error("object not found: {id}")]
  NotFound { id: String },

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("transport: {0}")]
  Transport(String),

  #[error("decode: {0}")]
  Decode(String),

  #[error("fetch timed out after {0:?}")]
  Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum Error {
  #[error("invalid capacity {capacity}: segments must hold at least one item")]
  InvalidCapacity { capacity: usize },

  #[error("failed to decode `{field}`: {reason}")]
  DecodeFailure { field: String, reason: String },

  #[error("stored value cannot be read as {requested}: {reason}")]
  TypeMismatch { requested: &'static str, reason: String },

  #[error("field `{field}` is absent")]
  FieldAbsent { field: &'static str },

  #[error("invalid user reference: {0}")]
  InvalidUserReference(String),

  #[error("fetch failed: {0}")]
  FetchFailure(#[from] StoreError),

  #[error("identity mismatch: expected {expected}, found {found}")]
  IdentityMismatch { expected: String, found: String },

  #[error("operation cancelled")]
  Cancelled,

  #[error("no async runtime: {0}")]
  Runtime(String),

  #[error("config: {0}")]
  Config(String),
}

/// Discriminant of [`Error`], for matching without destructuring payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  InvalidCapacity,
  DecodeFailure,
  TypeMismatch,
  FieldAbsent,
  InvalidUserReference,
  FetchFailure,
  IdentityMismatch,
  Cancelled,
  Runtime,
  Config,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::InvalidCapacity { .. } => ErrorKind::InvalidCapacity,
      Error::DecodeFailure { .. } => ErrorKind::DecodeFailure,
      Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
      Error::FieldAbsent { .. } => ErrorKind::FieldAbsent,
      Error::InvalidUserReference(_) => ErrorKind::InvalidUserReference,
      Error::FetchFailure(_) => ErrorKind::FetchFailure,
      Error::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
      Error::Cancelled => ErrorKind::Cancelled,
      Error::Runtime(_) => ErrorKind::Runtime,
      Error::Config(_) => ErrorKind::Config,
    }
  }

  pub fn decode(field: impl Into<String>, reason: impl ToString) -> Self {
    Error::DecodeFailure {
      field: field.into(),
      reason: reason.to_string(),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
