//! Fetch-by-id access to stored user records.
//!
//! The network client that talks to the server lives elsewhere. Hydration
//! only needs [`UserStore`], so the transport can be swapped for
//! [`MemoryUserStore`] in tests and local tooling.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use cloudhook_core::StoreError;
use tracing::trace;

use crate::options::RequestOptions;
use crate::user::CloudUser;

#[async_trait]
pub trait UserStore<U>: Send + Sync {
  /// Fetch the full stored record for `object_id`.
  async fn fetch_user(&self, object_id: &str, options: &RequestOptions) -> Result<U, StoreError>;
}

/// In-memory store keyed by object id.
///
/// Counts fetches and remembers the options of the most recent one. Failures
/// queued with [`fail_next`](Self::fail_next) are returned in order before
/// any lookup happens.
pub struct MemoryUserStore<U> {
  users: RwLock<HashMap<String, U>>,
  failures: Mutex<VecDeque<StoreError>>,
  last_options: Mutex<Option<RequestOptions>>,
  fetch_count: AtomicUsize,
}

impl<U> Default for MemoryUserStore<U> {
  fn default() -> Self {
    Self {
      users: RwLock::new(HashMap::new()),
      failures: Mutex::new(VecDeque::new()),
      last_options: Mutex::new(None),
      fetch_count: AtomicUsize::new(0),
    }
  }
}

impl<U: CloudUser> MemoryUserStore<U> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_users(users: impl IntoIterator<Item = U>) -> Self {
    let store = Self::new();
    for user in users {
      store.insert(user);
    }
    store
  }

  /// Store `user` under its object id. Users without one are ignored.
  pub fn insert(&self, user: U) -> bool {
    let Some(id) = user.object_id().map(str::to_owned) else {
      return false;
    };
    self
      .users
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(id, user);
    true
  }

  pub fn remove(&self, object_id: &str) -> Option<U> {
    self
      .users
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(object_id)
  }

  pub fn fail_next(&self, error: StoreError) {
    self
      .failures
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push_back(error);
  }

  pub fn fetch_count(&self) -> usize {
    self.fetch_count.load(Ordering::SeqCst)
  }

  pub fn last_options(&self) -> Option<RequestOptions> {
    self
      .last_options
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

#[async_trait]
impl<U: CloudUser> UserStore<U> for MemoryUserStore<U> {
  async fn fetch_user(&self, object_id: &str, options: &RequestOptions) -> Result<U, StoreError> {
    self.fetch_count.fetch_add(1, Ordering::SeqCst);
    *self.last_options.lock().unwrap_or_else(PoisonError::into_inner) = Some(options.clone());
    trace!(object_id, "memory store fetch");

    if let Some(error) = self
      .failures
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .pop_front()
    {
      return Err(error);
    }

    self
      .users
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(object_id)
      .cloned()
      .ok_or_else(|| StoreError::NotFound {
        id: object_id.to_string(),
      })
  }
}
