//! Session orchestration over the token broker and the protected resource
//!
//! [`SessionController`] owns the process-wide [`SessionState`] and maps the
//! three user triggers (startup, manual refresh, sign-in-or-out) onto the
//! acquisition state machine, forwarding any obtained token to the protected
//! resource. Each trigger runs to completion and reports back a
//! [`SessionUpdate`] carrying everything a UI boundary needs to render.

use crate::{
    acquire::{AcquireError, TokenBroker},
    account::Account,
    braids::AccessToken,
    provider::IdentityBroker,
    resource::ResourceClient,
    token::TokenResult,
};

/// Marker shown in place of a display name while signed out
pub const NOT_SIGNED_IN: &str = "not signed in";

/// Prompt shown when a manual refresh finds no usable cached token
pub const SIGN_IN_PROMPT: &str = "Please sign in to view your bearer token";

/// The authentication state of the local session
///
/// There is exactly one of these per process, owned by the controller. It
/// reflects the last successfully authenticated account; the account cache
/// may still hold stale entries from earlier sessions until cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No identity holds the session
    SignedOut,
    /// The given account holds the session
    SignedIn(Account),
}

impl SessionState {
    /// Whether an account currently holds the session
    #[inline]
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }

    /// The signed-in account, if any
    pub fn account(&self) -> Option<&Account> {
        match self {
            Self::SignedIn(account) => Some(account),
            Self::SignedOut => None,
        }
    }

    /// The name to show at the UI boundary
    pub fn display_name(&self) -> &str {
        match self {
            Self::SignedIn(account) => account.display_name(),
            Self::SignedOut => NOT_SIGNED_IN,
        }
    }
}

/// A user-visible message produced by a trigger
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserMessage {
    /// An actionable prompt, such as asking the user to sign in
    Prompt(String),
    /// A failure to show once; nothing is retried automatically
    Error(String),
}

/// What the UI boundary needs after a trigger has run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUpdate {
    /// The session state after the trigger
    pub state: SessionState,
    /// The bearer token text obtained during this trigger, if any
    pub token: Option<AccessToken>,
    /// At most one message to show the user
    pub message: Option<UserMessage>,
}

/// Orchestrates user triggers over the broker and the protected resource
///
/// Triggers take `&mut self`, so a single owner cannot interleave them. Hosts
/// that can deliver overlapping triggers should wrap the controller in a
/// [`SerializedSession`]. A caller wanting timeouts or cancellation can wrap
/// each trigger future externally; the state machine itself imposes none.
#[derive(Debug)]
pub struct SessionController<B, R> {
    broker: TokenBroker<B>,
    resource: R,
    state: SessionState,
}

impl<B: IdentityBroker, R: ResourceClient> SessionController<B, R> {
    /// Constructs a controller in the signed-out state
    pub fn new(broker: TokenBroker<B>, resource: R) -> Self {
        Self {
            broker,
            resource,
            state: SessionState::SignedOut,
        }
    }

    /// The current session state
    #[inline]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Startup trigger
    ///
    /// Silent acquisition only. A missing session is the expected empty
    /// state and produces no message; only an unexpected provider failure
    /// is surfaced.
    pub async fn startup(&mut self) -> SessionUpdate {
        self.silent_cycle(true).await
    }

    /// Manual refresh trigger
    ///
    /// Like startup, except that a missing usable token prompts the user to
    /// sign in rather than staying silent.
    pub async fn refresh(&mut self) -> SessionUpdate {
        self.silent_cycle(false).await
    }

    /// Sign-in control trigger
    ///
    /// With an active session this means sign-out: the account cache is
    /// cleared and no resource call is made. Otherwise the interactive flow
    /// runs and, on success, the silent flow is re-entered so the surfaced
    /// token is the freshly cached one.
    pub async fn sign_in_or_out(&mut self) -> SessionUpdate {
        if self.state.is_signed_in() {
            return self.sign_out().await;
        }

        match self.broker.acquire_interactive().await {
            Ok(token) => {
                tracing::info!(account = %token.account().id(), "signed in");
                self.state = SessionState::SignedIn(token.account().clone());
                self.silent_cycle(true).await
            }
            Err(AcquireError::UserCancelled) => {
                tracing::debug!("sign-in cancelled, session unchanged");
                self.update(None, None)
            }
            Err(err) => {
                self.state = SessionState::SignedOut;
                self.update(None, Some(UserMessage::Error(err.to_string())))
            }
        }
    }

    async fn silent_cycle(&mut self, is_startup: bool) -> SessionUpdate {
        match self.broker.acquire_silent(is_startup).await {
            Ok(token) => self.complete_with_resource(token).await,
            Err(AcquireError::NoAccount) => {
                self.state = SessionState::SignedOut;
                self.update(None, None)
            }
            Err(AcquireError::NeedsInteractive) => {
                self.state = SessionState::SignedOut;
                let message =
                    (!is_startup).then(|| UserMessage::Prompt(SIGN_IN_PROMPT.to_owned()));
                self.update(None, message)
            }
            Err(AcquireError::UserCancelled) => {
                // Cannot arise from a silent flow; absorbed without a trace
                // either way.
                self.update(None, None)
            }
            Err(err @ AcquireError::Unexpected { .. }) => {
                self.state = SessionState::SignedOut;
                self.update(None, Some(UserMessage::Error(err.to_string())))
            }
        }
    }

    async fn complete_with_resource(&mut self, token: TokenResult) -> SessionUpdate {
        self.state = SessionState::SignedIn(token.account().clone());

        match self.resource.fetch(token.access_token()).await {
            Ok(()) => {
                tracing::debug!(account = %token.account().id(), "resource call succeeded");
                self.update(Some(token.access_token().to_owned()), None)
            }
            Err(err) => {
                // The token was honored by the provider; a failing downstream
                // call leaves the session signed in.
                tracing::warn!(error = %err, "resource call failed");
                self.update(
                    Some(token.access_token().to_owned()),
                    Some(UserMessage::Error(err.to_string())),
                )
            }
        }
    }

    async fn sign_out(&mut self) -> SessionUpdate {
        let outcome = self.broker.sign_out().await;
        // The session ends even if removal stopped partway; the remaining
        // entries are stale cache, not an active session.
        self.state = SessionState::SignedOut;
        match outcome {
            Ok(()) => {
                tracing::info!("signed out, account cache cleared");
                self.update(None, None)
            }
            Err(err) => self.update(None, Some(UserMessage::Error(err.to_string()))),
        }
    }

    fn update(&self, token: Option<AccessToken>, message: Option<UserMessage>) -> SessionUpdate {
        SessionUpdate {
            state: self.state.clone(),
            token,
            message,
        }
    }
}

/// A session controller behind a mutex, for hosts with overlapping triggers
///
/// Every trigger acquires the lock for its full duration, giving the
/// single-flight execution the state machine requires when the host cannot
/// guarantee serialized delivery itself.
#[derive(Debug)]
pub struct SerializedSession<B, R> {
    inner: tokio::sync::Mutex<SessionController<B, R>>,
}

impl<B: IdentityBroker, R: ResourceClient> SerializedSession<B, R> {
    /// Wraps a controller
    pub fn new(controller: SessionController<B, R>) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(controller),
        }
    }

    /// Runs the startup trigger to completion
    pub async fn startup(&self) -> SessionUpdate {
        self.inner.lock().await.startup().await
    }

    /// Runs the refresh trigger to completion
    pub async fn refresh(&self) -> SessionUpdate {
        self.inner.lock().await.refresh().await
    }

    /// Runs the sign-in-or-out trigger to completion
    pub async fn sign_in_or_out(&self) -> SessionUpdate {
        self.inner.lock().await.sign_in_or_out().await
    }

    /// A snapshot of the current session state
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state().clone()
    }
}
