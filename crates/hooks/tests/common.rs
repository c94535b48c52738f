//! Common test utilities for hook request and hydration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use cloudhook_core::StoreError;
use hooks::{EmptyParams, FunctionRequest, RequestOptions, User, UserStore};
use serde_json::json;

pub type Request = FunctionRequest<User, EmptyParams>;

/// Route hook logs to the test writer. Safe to call from every test.
#[allow(dead_code)]
pub fn init_logging() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter("hooks=debug")
    .with_test_writer()
    .try_init();
}

#[allow(dead_code)]
pub fn timestamp(secs: i64) -> DateTime<Utc> {
  Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
}

/// The partial user the server embeds in an invocation.
#[allow(dead_code)]
pub fn embedded_user() -> User {
  let mut user = User {
    object_id: Some("yarr".into()),
    session_token: Some("dog".into()),
    ..Default::default()
  };
  user.custom.insert("customKey".into(), json!("blah"));
  user
}

/// The stored record for [`embedded_user`].
#[allow(dead_code)]
pub fn stored_user() -> User {
  let mut user = embedded_user();
  user.created_at = Some(timestamp(1_655_208_000));
  user.updated_at = Some(timestamp(1_655_211_600));
  user
}

/// Store that takes a long time to answer. Used to observe cancellation.
#[allow(dead_code)]
pub struct SlowStore {
  pub delay: Duration,
  pub started: AtomicUsize,
}

#[allow(dead_code)]
impl SlowStore {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      started: AtomicUsize::new(0),
    }
  }

  pub fn started(&self) -> usize {
    self.started.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl UserStore<User> for SlowStore {
  async fn fetch_user(&self, object_id: &str, _options: &RequestOptions) -> Result<User, StoreError> {
    self.started.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(self.delay).await;
    Ok(User::with_object_id(object_id))
  }
}
