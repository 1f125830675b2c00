//! The identity broker seam
//!
//! The provider SDK that actually speaks the OAuth2/OIDC protocol (token
//! endpoint calls, PKCE, cache encryption) sits behind the [`IdentityBroker`]
//! trait. This crate only decides *when* to ask it for which kind of
//! acquisition and how to react to its answers.

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    account::Account,
    braids::{ErrorCode, Scope},
    token::TokenResult,
};

/// How an interactive acquisition should prompt the user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prompt {
    /// Always present the account picker, even when the sign-in surface
    /// still holds a live session for a previously signed-in user
    SelectAccount,
    /// Let the provider decide whether any prompt is needed
    Auto,
}

/// A failure reported by the identity provider
///
/// The provider SDK signals failures as exceptions; on this seam they become
/// values with the one distinction the acquisition logic cares about made
/// structural: whether user interaction would resolve the failure.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No token can be produced without user interaction (no valid cached
    /// token, consent or MFA required, and so on)
    #[error("user interaction required: {0}")]
    InteractionRequired(String),

    /// Any other failure reported by the provider
    #[error("{message}")]
    Failure {
        /// Human-readable description of the failure
        message: String,
        /// The provider's error code
        code: ErrorCode,
        /// The message of a nested failure, when the provider reported one
        inner: Option<String>,
    },
}

impl ProviderError {
    /// Constructs a provider failure without a nested message
    pub fn failure(message: impl Into<String>, code: impl Into<ErrorCode>) -> Self {
        Self::Failure {
            message: message.into(),
            code: code.into(),
            inner: None,
        }
    }

    /// Whether this failure is the user dismissing an interactive prompt
    pub fn is_access_denied(&self) -> bool {
        match self {
            Self::Failure { code, .. } => code.as_str() == "access_denied",
            Self::InteractionRequired(_) => false,
        }
    }
}

/// An identity provider capable of enumerating accounts and issuing tokens
///
/// Implementations own account handles and any token persistence; callers
/// treat accounts as opaque and never mutate them in place.
#[async_trait]
pub trait IdentityBroker: Send + Sync {
    /// Enumerates the locally known accounts
    async fn accounts(&self) -> Result<Vec<Account>, ProviderError>;

    /// Attempts to produce a token for `account` without user interaction
    async fn acquire_token_silent(
        &self,
        scopes: &[Scope],
        account: &Account,
    ) -> Result<TokenResult, ProviderError>;

    /// Runs the interactive sign-in flow
    ///
    /// `login_hint` pre-selects an account in the prompt when present; a
    /// fresh sign-in passes `None`. The call may suspend indefinitely while
    /// the user interacts with the prompt.
    async fn acquire_token_interactive(
        &self,
        scopes: &[Scope],
        login_hint: Option<&Account>,
        prompt: Prompt,
    ) -> Result<TokenResult, ProviderError>;

    /// Removes a single account and its cached tokens
    async fn remove_account(&self, account: &Account) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_is_detected_by_code() {
        let err = ProviderError::failure("the user cancelled", "access_denied");
        assert!(err.is_access_denied());
    }

    #[test]
    fn other_codes_are_not_access_denied() {
        let err = ProviderError::failure("broken", "invalid_grant");
        assert!(!err.is_access_denied());

        let err = ProviderError::InteractionRequired("consent required".into());
        assert!(!err.is_access_denied());
    }

    #[test]
    fn failure_displays_its_message() {
        let err = ProviderError::failure("something broke", "invalid_grant");
        assert_eq!(err.to_string(), "something broke");
    }
}
