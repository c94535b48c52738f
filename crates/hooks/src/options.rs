use crate::request::HookRequest;
use crate::user::CloudUser;

/// Per-call options for requests a hook makes back to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
  /// Authenticate with the primary key instead of a user session
  pub use_primary_key: bool,
  pub session_token: Option<String>,
  pub installation_id: Option<String>,
}

impl RequestOptions {
  /// Derive options from an incoming invocation.
  ///
  /// A primary-key invocation keeps using the primary key. Otherwise the
  /// attached user's session token is used, if any. The installation id is
  /// forwarded either way.
  pub fn for_request<R: HookRequest + ?Sized>(request: &R) -> Self {
    let use_primary_key = request.primary_key() == Some(true);
    let session_token = if use_primary_key {
      None
    } else {
      request
        .user()
        .and_then(|user| user.session_token())
        .map(str::to_owned)
    };

    Self {
      use_primary_key,
      session_token,
      installation_id: request.installation_id().map(str::to_owned),
    }
  }

  pub fn without_session_token(mut self) -> Self {
    self.session_token = None;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{EmptyParams, FunctionRequest, User};

  fn user_with_token() -> User {
    User {
      object_id: Some("u1".into()),
      session_token: Some("r:abc".into()),
      ..Default::default()
    }
  }

  #[test]
  fn test_primary_key_wins() {
    let request = FunctionRequest::new(EmptyParams::default())
      .with_primary_key(true)
      .with_user(user_with_token())
      .with_installation_id("inst-1");

    let options = RequestOptions::for_request(&request);
    assert!(options.use_primary_key);
    assert_eq!(options.session_token, None);
    assert_eq!(options.installation_id.as_deref(), Some("inst-1"));
  }

  #[test]
  fn test_session_token_forwarded() {
    let request = FunctionRequest::new(EmptyParams::default()).with_user(user_with_token());

    let options = RequestOptions::for_request(&request);
    assert!(!options.use_primary_key);
    assert_eq!(options.session_token.as_deref(), Some("r:abc"));
    assert_eq!(options.without_session_token().session_token, None);
  }

  #[test]
  fn test_no_user_no_token() {
    let request = FunctionRequest::<User, _>::new(EmptyParams::default()).with_primary_key(false);
    assert_eq!(RequestOptions::for_request(&request), RequestOptions::default());
  }
}
