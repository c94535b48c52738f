//! Replacing a hook request's partial user with the full stored record.
//!
//! The user embedded in an invocation carries little more than an object id
//! and a session token. [`hydrate_user`] fetches the stored record, merges it
//! with the embedded one, and returns a new request. The input request is
//! never modified, and a failed hydration leaves nothing half-applied.
//!
//! [`Hydrator`] exposes the same operation three ways: as a future, as a
//! single-item stream, and with a completion callback that can be cancelled.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use cloudhook_core::{Error, HydrationConfig, Result, StoreError};
use futures::Stream;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::request::HookRequest;
use crate::store::UserStore;
use crate::user::CloudUser;

/// Lifecycle of one hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HydrationState {
  Unresolved = 0,
  FetchInFlight = 1,
  Hydrated = 2,
  Failed = 3,
  Cancelled = 4,
}

impl HydrationState {
  fn from_u8(raw: u8) -> Self {
    match raw {
      0 => Self::Unresolved,
      1 => Self::FetchInFlight,
      2 => Self::Hydrated,
      3 => Self::Failed,
      4 => Self::Cancelled,
      // only ever stored from `HydrationState as u8`
      other => {
        debug_assert!(other <= Self::Cancelled as u8, "unknown hydration state byte {other}");
        Self::Failed
      }
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Hydrated | Self::Failed | Self::Cancelled)
  }
}

/// Fetch the stored copy of the request's user and return the request with
/// the merged user attached.
///
/// A request without a user is returned as-is and nothing is fetched. An
/// attached user without an object id fails with
/// [`Error::InvalidUserReference`]. Store errors and timeouts surface as
/// [`Error::FetchFailure`].
pub async fn hydrate_user<R, S>(request: &R, store: &S, config: &HydrationConfig) -> Result<R>
where
  R: HookRequest,
  S: UserStore<R::User> + ?Sized,
{
  let Some(user) = request.user() else {
    debug!("no user attached, nothing to hydrate");
    return Ok(request.clone());
  };

  let object_id = match user.object_id() {
    Some(id) if !id.trim().is_empty() => id.to_owned(),
    _ => {
      return Err(Error::InvalidUserReference(
        "attached user has no objectId".to_string(),
      ));
    }
  };

  let mut options = request.options();
  if !config.forward_session_token {
    options = options.without_session_token();
  }

  debug!(
    user_id = %object_id,
    primary_key = options.use_primary_key,
    "fetching user for hydration"
  );

  let timeout = config.fetch_timeout();
  let fetched = match tokio::time::timeout(timeout, store.fetch_user(&object_id, &options)).await {
    Ok(Ok(fetched)) => fetched,
    Ok(Err(e)) => {
      warn!(user_id = %object_id, error = %e, "user fetch failed");
      return Err(e.into());
    }
    Err(_) => {
      warn!(user_id = %object_id, ?timeout, "user fetch timed out");
      return Err(StoreError::Timeout(timeout).into());
    }
  };

  if let Some(found) = fetched.object_id()
    && found != object_id
  {
    warn!(user_id = %object_id, found, "store returned a different user");
    return Err(Error::IdentityMismatch {
      expected: object_id,
      found: found.to_string(),
    });
  }

  let merged = user.merge(&fetched)?;
  if merged.object_id() != user.object_id() || merged.session_token() != user.session_token() {
    warn!(user_id = %object_id, "merge changed the user's identity");
    return Err(Error::IdentityMismatch {
      expected: object_id,
      found: merged.object_id().unwrap_or_default().to_string(),
    });
  }

  debug!(user_id = %object_id, "user hydrated");
  Ok(request.clone().replace_user(Some(merged)))
}

/// Hydrates requests against a shared store.
pub struct Hydrator<S: ?Sized> {
  store: Arc<S>,
  config: HydrationConfig,
}

impl<S: ?Sized> Clone for Hydrator<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      config: self.config.clone(),
    }
  }
}

impl<S: ?Sized> Hydrator<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self::with_config(store, HydrationConfig::default())
  }

  pub fn with_config(store: Arc<S>, config: HydrationConfig) -> Self {
    Self { store, config }
  }

  pub fn config(&self) -> &HydrationConfig {
    &self.config
  }

  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  pub async fn hydrate<R>(&self, request: &R) -> Result<R>
  where
    R: HookRequest,
    S: UserStore<R::User>,
  {
    hydrate_user(request, self.store.as_ref(), &self.config).await
  }

  /// Like [`hydrate`](Self::hydrate), but gives up with [`Error::Cancelled`]
  /// as soon as `token` is cancelled.
  pub async fn hydrate_cancellable<R>(&self, request: &R, token: &CancellationToken) -> Result<R>
  where
    R: HookRequest,
    S: UserStore<R::User>,
  {
    tokio::select! {
      biased;
      _ = token.cancelled() => Err(Error::Cancelled),
      outcome = self.hydrate(request) => outcome,
    }
  }

  /// Hydration as a stream that yields exactly one item.
  ///
  /// Nothing is fetched until the stream is first polled. Dropping the
  /// stream before then cancels the work.
  pub fn hydrate_stream<R>(&self, request: R) -> impl Stream<Item = Result<R>> + Send + 'static
  where
    R: HookRequest + 'static,
    S: UserStore<R::User> + 'static,
  {
    let store = Arc::clone(&self.store);
    let config = self.config.clone();
    futures::stream::once(async move { hydrate_user(&request, store.as_ref(), &config).await })
  }

  /// Run hydration on the tokio runtime and hand the outcome to `callback`.
  ///
  /// The callback runs at most once. After a successful
  /// [`HydrationHandle::cancel`] it never runs. Fails with [`Error::Runtime`]
  /// when called outside a tokio runtime.
  pub fn hydrate_with_callback<R, F>(&self, request: R, callback: F) -> Result<HydrationHandle>
  where
    R: HookRequest + 'static,
    S: UserStore<R::User> + 'static,
    F: FnOnce(Result<R>) + Send + 'static,
  {
    let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
    let hydrator = self.clone();
    let token = CancellationToken::new();
    let state = Arc::new(AtomicU8::new(HydrationState::Unresolved as u8));

    let task_token = token.clone();
    let task_state = Arc::clone(&state);
    let task = runtime.spawn(async move {
      if !transition(&task_state, HydrationState::Unresolved, HydrationState::FetchInFlight) {
        return;
      }

      let outcome = hydrator.hydrate_cancellable(&request, &task_token).await;
      if matches!(outcome, Err(Error::Cancelled)) {
        return;
      }

      let terminal = if outcome.is_ok() {
        HydrationState::Hydrated
      } else {
        HydrationState::Failed
      };
      if !transition(&task_state, HydrationState::FetchInFlight, terminal) {
        debug!("hydration finished after cancellation, dropping result");
        return;
      }

      callback(outcome);
    });

    Ok(HydrationHandle { token, state, task })
  }
}

fn transition(state: &AtomicU8, from: HydrationState, to: HydrationState) -> bool {
  state
    .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
    .is_ok()
}

/// Handle to a hydration started with [`Hydrator::hydrate_with_callback`].
pub struct HydrationHandle {
  token: CancellationToken,
  state: Arc<AtomicU8>,
  task: JoinHandle<()>,
}

impl HydrationHandle {
  pub fn state(&self) -> HydrationState {
    HydrationState::from_u8(self.state.load(Ordering::Acquire))
  }

  pub fn is_cancelled(&self) -> bool {
    self.state() == HydrationState::Cancelled
  }

  /// Cancel the hydration unless it already finished.
  ///
  /// Returns `true` when this call prevented the callback from running.
  pub fn cancel(&self) -> bool {
    loop {
      let current = self.state();
      if current.is_terminal() {
        return false;
      }
      if transition(&self.state, current, HydrationState::Cancelled) {
        self.token.cancel();
        debug!(from = ?current, "hydration cancelled");
        return true;
      }
    }
  }

  /// Wait for the background task to finish and report the final state.
  pub async fn join(self) -> HydrationState {
    let HydrationHandle { state, task, .. } = self;
    if let Err(e) = task.await {
      warn!(error = %e, "hydration task did not complete");
    }
    HydrationState::from_u8(state.load(Ordering::Acquire))
  }
}
