use cloudhook_core::{BatchConfig, DEFAULT_BATCH_LIMIT, Error, Result};
use tracing::debug;

use crate::split::{split, split_owned};

/// Plans how a list of pending operations is divided into batch write calls.
///
/// Holds the per-call operation limit so callers don't thread it through
/// every save path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlanner {
  limit: usize,
}

impl Default for BatchPlanner {
  fn default() -> Self {
    Self {
      limit: DEFAULT_BATCH_LIMIT,
    }
  }
}

impl BatchPlanner {
  pub fn new(limit: usize) -> Result<Self> {
    if limit == 0 {
      return Err(Error::InvalidCapacity { capacity: limit });
    }
    Ok(Self { limit })
  }

  pub fn from_config(config: &BatchConfig) -> Result<Self> {
    Self::new(config.limit)
  }

  /// Use a caller-supplied limit for one save, or keep the configured one.
  pub fn with_limit_override(self, limit: Option<usize>) -> Result<Self> {
    match limit {
      Some(limit) => Self::new(limit),
      None => Ok(self),
    }
  }

  pub fn limit(&self) -> usize {
    self.limit
  }

  pub fn plan<T: Clone>(&self, items: &[T]) -> Result<Vec<Vec<T>>> {
    let segments = split(items, self.limit)?;
    debug!(
      items = items.len(),
      limit = self.limit,
      segments = segments.len(),
      "planned batch segments"
    );
    Ok(segments)
  }

  pub fn plan_owned<T>(&self, items: Vec<T>) -> Result<Vec<Vec<T>>> {
    let len = items.len();
    let segments = split_owned(items, self.limit)?;
    debug!(items = len, limit = self.limit, segments = segments.len(), "planned batch segments");
    Ok(segments)
  }
}
