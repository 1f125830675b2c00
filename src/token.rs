use aliri_clock::UnixTime;

use crate::{
    account::Account,
    braids::{AccessToken, AccessTokenRef},
};

/// The outcome of a successful token acquisition
///
/// A token result is transient: it is held for the duration of one trigger
/// cycle and then dropped. Persisting tokens, if it happens at all, is the
/// identity broker's responsibility.
#[derive(Clone, Debug)]
pub struct TokenResult {
    access_token: AccessToken,
    account: Account,
    expiry: UnixTime,
}

impl TokenResult {
    /// Bundles a freshly issued token with the account it was issued for
    pub fn new(access_token: AccessToken, account: Account, expiry: UnixTime) -> Self {
        Self {
            access_token,
            account,
            expiry,
        }
    }

    /// The bearer credential itself
    #[inline]
    pub fn access_token(&self) -> &AccessTokenRef {
        self.access_token.as_ref()
    }

    /// The account the token was issued for
    #[inline]
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// The time at which the provider will no longer honor the token
    #[inline]
    pub fn expiry(&self) -> UnixTime {
        self.expiry
    }
}
