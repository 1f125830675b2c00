//! The token acquisition state machine
//!
//! [`TokenBroker`] decides, for a given trigger, whether a cached token can be
//! reused silently, whether interactive sign-in is required, and classifies
//! every failure so the session layer knows which ones to surface.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    account::AccountCache,
    braids::{ErrorCode, Scope},
    provider::{IdentityBroker, Prompt, ProviderError},
    token::TokenResult,
};

/// A failed token acquisition, classified by how the session should react
#[derive(Debug, Error)]
pub enum AcquireError {
    /// No account is known locally
    ///
    /// Not an error condition: the session is simply not signed in.
    #[error("no account is signed in")]
    NoAccount,

    /// No token can be produced without user interaction
    ///
    /// Expected during startup; outside of startup the user should be
    /// prompted to sign in.
    #[error("user interaction is required to obtain a token")]
    NeedsInteractive,

    /// The user dismissed the interactive sign-in prompt
    ///
    /// Absorbed silently: never surfaced and never changes session state.
    #[error("sign-in was cancelled by the user")]
    UserCancelled,

    /// An unexpected provider failure
    ///
    /// Always surfaced to the user, never retried automatically.
    #[error("{}", compose_unexpected(.message, .code, .inner))]
    Unexpected {
        /// The provider's description of the failure
        message: String,
        /// The provider's error code
        code: ErrorCode,
        /// The message of a nested failure, when the provider reported one
        inner: Option<String>,
    },
}

fn compose_unexpected(message: &str, code: &ErrorCode, inner: &Option<String>) -> String {
    match inner {
        Some(inner) => format!("{message} (error code: {code}; inner error: {inner})"),
        None => message.to_owned(),
    }
}

impl AcquireError {
    fn unexpected(err: ProviderError) -> Self {
        match err {
            ProviderError::InteractionRequired(message) => Self::Unexpected {
                message,
                code: ErrorCode::from_static("interaction_required"),
                inner: None,
            },
            ProviderError::Failure {
                message,
                code,
                inner,
            } => Self::Unexpected {
                message,
                code,
                inner,
            },
        }
    }
}

/// Decides, per trigger, whether interactive action is required and produces
/// a token or a classified failure
#[derive(Clone, Debug)]
pub struct TokenBroker<B> {
    broker: Arc<B>,
    cache: AccountCache<B>,
    scopes: Vec<Scope>,
}

impl<B: IdentityBroker> TokenBroker<B> {
    /// Constructs a broker requesting the given fixed scope set
    pub fn new(broker: Arc<B>, scopes: Vec<Scope>) -> Self {
        Self {
            cache: AccountCache::new(Arc::clone(&broker)),
            broker,
            scopes,
        }
    }

    /// The live account view backing this broker
    pub fn accounts(&self) -> &AccountCache<B> {
        &self.cache
    }

    /// Attempts to obtain a token without user interaction
    ///
    /// `is_startup` only affects logging and how the caller is expected to
    /// react to [`AcquireError::NeedsInteractive`]: during startup a missing
    /// session is an expected state, afterwards it warrants a prompt.
    #[tracing::instrument(skip(self))]
    pub async fn acquire_silent(&self, is_startup: bool) -> Result<TokenResult, AcquireError> {
        let accounts = self.cache.list().await.map_err(AcquireError::unexpected)?;
        let Some(account) = accounts.first() else {
            tracing::debug!("no locally known account");
            return Err(AcquireError::NoAccount);
        };

        // Only the first account is tried: this session supports a single
        // active identity, and nothing disambiguates additional entries.
        match self.broker.acquire_token_silent(&self.scopes, account).await {
            Ok(token) => {
                tracing::debug!(
                    account = %token.account().id(),
                    expiry = token.expiry().0,
                    "silent acquisition succeeded"
                );
                Ok(token)
            }
            Err(ProviderError::InteractionRequired(reason)) => {
                if is_startup {
                    tracing::debug!(%reason, "no usable cached token at startup");
                } else {
                    tracing::info!(%reason, "cached token unusable, sign-in needed");
                }
                Err(AcquireError::NeedsInteractive)
            }
            Err(err) => {
                tracing::warn!(error = %err, "silent acquisition failed unexpectedly");
                Err(AcquireError::unexpected(err))
            }
        }
    }

    /// Runs the interactive sign-in flow
    ///
    /// The first known account, if any, is passed along as a login hint. The
    /// prompt always forces an explicit account selection: the sign-in
    /// surface may still hold cookies for the previous user, and reusing them
    /// would silently re-authenticate the wrong identity.
    #[tracing::instrument(skip(self))]
    pub async fn acquire_interactive(&self) -> Result<TokenResult, AcquireError> {
        let accounts = self.cache.list().await.map_err(AcquireError::unexpected)?;
        let hint = accounts.first();

        match self
            .broker
            .acquire_token_interactive(&self.scopes, hint, Prompt::SelectAccount)
            .await
        {
            Ok(token) => {
                tracing::info!(
                    account = %token.account().id(),
                    expiry = token.expiry().0,
                    "interactive acquisition succeeded"
                );
                Ok(token)
            }
            Err(err) if err.is_access_denied() => {
                tracing::debug!("user cancelled interactive sign-in");
                Err(AcquireError::UserCancelled)
            }
            Err(err) => {
                tracing::warn!(error = %err, "interactive acquisition failed unexpectedly");
                Err(AcquireError::unexpected(err))
            }
        }
    }

    /// Clears every locally known account and its cached tokens
    #[tracing::instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AcquireError> {
        self.cache
            .remove_all()
            .await
            .map_err(AcquireError::unexpected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{account::Account, braids::{AccessToken, AccountId}};
    use aliri_clock::UnixTime;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type ProviderResult = Result<TokenResult, ProviderError>;

    /// A broker scripted with canned responses, recording what it was asked.
    #[derive(Debug, Default)]
    struct ScriptedBroker {
        accounts: Mutex<Vec<Account>>,
        silent: Mutex<Vec<ProviderResult>>,
        interactive: Mutex<Vec<ProviderResult>>,
        seen_prompts: Mutex<Vec<Prompt>>,
        seen_hints: Mutex<Vec<Option<Account>>>,
    }

    impl ScriptedBroker {
        fn with_account(self, account: Account) -> Self {
            self.accounts.lock().unwrap().push(account);
            self
        }

        fn on_silent(self, response: ProviderResult) -> Self {
            self.silent.lock().unwrap().push(response);
            self
        }

        fn on_interactive(self, response: ProviderResult) -> Self {
            self.interactive.lock().unwrap().push(response);
            self
        }
    }

    #[async_trait]
    impl IdentityBroker for ScriptedBroker {
        async fn accounts(&self) -> Result<Vec<Account>, ProviderError> {
            Ok(self.accounts.lock().unwrap().clone())
        }

        async fn acquire_token_silent(
            &self,
            _: &[Scope],
            _: &Account,
        ) -> ProviderResult {
            self.silent.lock().unwrap().remove(0)
        }

        async fn acquire_token_interactive(
            &self,
            _: &[Scope],
            login_hint: Option<&Account>,
            prompt: Prompt,
        ) -> ProviderResult {
            self.seen_prompts.lock().unwrap().push(prompt);
            self.seen_hints.lock().unwrap().push(login_hint.cloned());
            self.interactive.lock().unwrap().remove(0)
        }

        async fn remove_account(&self, account: &Account) -> Result<(), ProviderError> {
            self.accounts
                .lock()
                .unwrap()
                .retain(|a| a.id() != account.id());
            Ok(())
        }
    }

    fn account() -> Account {
        Account::new(AccountId::from_static("user-1"), "user@example.com")
    }

    fn token() -> TokenResult {
        TokenResult::new(
            AccessToken::from_static("tok-abc"),
            account(),
            UnixTime(1_900_000_000),
        )
    }

    fn broker(fake: ScriptedBroker) -> TokenBroker<ScriptedBroker> {
        TokenBroker::new(Arc::new(fake), vec![Scope::from_static("api://todo/read")])
    }

    mod when_no_account_is_cached {
        use super::*;

        #[tokio::test]
        async fn silent_acquisition_reports_no_account() {
            let broker = broker(ScriptedBroker::default());

            assert!(matches!(
                broker.acquire_silent(true).await,
                Err(AcquireError::NoAccount)
            ));
            assert!(matches!(
                broker.acquire_silent(false).await,
                Err(AcquireError::NoAccount)
            ));
        }

        #[tokio::test]
        async fn interactive_acquisition_passes_no_login_hint() {
            let fake = ScriptedBroker::default().on_interactive(Ok(token()));
            let broker = broker(fake);

            broker.acquire_interactive().await.unwrap();

            assert_eq!(
                *broker.broker.seen_hints.lock().unwrap(),
                vec![None]
            );
        }
    }

    mod when_an_account_is_cached {
        use super::*;

        #[tokio::test]
        async fn silent_acquisition_returns_the_token() {
            let fake = ScriptedBroker::default()
                .with_account(account())
                .on_silent(Ok(token()));
            let broker = broker(fake);

            let result = broker.acquire_silent(true).await.unwrap();

            assert_eq!(result.access_token().as_str(), "tok-abc");
            assert_eq!(result.account(), &account());
        }

        #[tokio::test]
        async fn interaction_required_becomes_needs_interactive() {
            for is_startup in [true, false] {
                let fake = ScriptedBroker::default()
                    .with_account(account())
                    .on_silent(Err(ProviderError::InteractionRequired(
                        "no cached token".into(),
                    )));
                let broker = broker(fake);

                assert!(matches!(
                    broker.acquire_silent(is_startup).await,
                    Err(AcquireError::NeedsInteractive)
                ));
            }
        }

        #[tokio::test]
        async fn provider_failure_becomes_unexpected() {
            let fake = ScriptedBroker::default()
                .with_account(account())
                .on_silent(Err(ProviderError::Failure {
                    message: "token endpoint unreachable".into(),
                    code: ErrorCode::from_static("service_unavailable"),
                    inner: Some("connection refused".into()),
                }));
            let broker = broker(fake);

            let err = broker.acquire_silent(false).await.unwrap_err();
            let text = err.to_string();
            assert!(text.contains("token endpoint unreachable"));
            assert!(text.contains("service_unavailable"));
            assert!(text.contains("connection refused"));
        }

        #[tokio::test]
        async fn interactive_acquisition_hints_the_first_account() {
            let fake = ScriptedBroker::default()
                .with_account(account())
                .on_interactive(Ok(token()));
            let broker = broker(fake);

            broker.acquire_interactive().await.unwrap();

            assert_eq!(
                *broker.broker.seen_hints.lock().unwrap(),
                vec![Some(account())]
            );
        }
    }

    mod interactive_policy {
        use super::*;

        #[tokio::test]
        async fn always_forces_account_selection() {
            let fake = ScriptedBroker::default().on_interactive(Ok(token()));
            let broker = broker(fake);

            broker.acquire_interactive().await.unwrap();

            assert_eq!(
                *broker.broker.seen_prompts.lock().unwrap(),
                vec![Prompt::SelectAccount]
            );
        }

        #[tokio::test]
        async fn access_denied_becomes_user_cancelled() {
            let fake = ScriptedBroker::default().on_interactive(Err(
                ProviderError::failure("the user cancelled", "access_denied"),
            ));
            let broker = broker(fake);

            assert!(matches!(
                broker.acquire_interactive().await,
                Err(AcquireError::UserCancelled)
            ));
        }

        #[tokio::test]
        async fn other_failures_become_unexpected() {
            let fake = ScriptedBroker::default().on_interactive(Err(
                ProviderError::failure("bad client", "invalid_client"),
            ));
            let broker = broker(fake);

            assert!(matches!(
                broker.acquire_interactive().await,
                Err(AcquireError::Unexpected { .. })
            ));
        }
    }

    #[tokio::test]
    async fn sign_out_clears_the_account_cache() {
        let fake = ScriptedBroker::default().with_account(account());
        let broker = broker(fake);

        broker.sign_out().await.unwrap();

        assert!(broker.accounts().list().await.unwrap().is_empty());
    }

    #[test]
    fn unexpected_without_inner_is_just_the_message() {
        let err = AcquireError::Unexpected {
            message: "something broke".into(),
            code: ErrorCode::from_static("unknown_error"),
            inner: None,
        };
        assert_eq!(err.to_string(), "something broke");
    }
}
