//! Accounts known to the identity broker

use std::sync::Arc;

use crate::{
    braids::AccountId,
    provider::{IdentityBroker, ProviderError},
};

/// A locally known, previously authenticated identity
///
/// Accounts are immutable handles owned by the identity broker: when the same
/// identity re-authenticates, the broker hands out a replacement rather than
/// mutating the old handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    display_name: String,
}

impl Account {
    /// Constructs an account handle
    pub fn new(id: AccountId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    /// The provider's stable identifier for this identity
    #[inline]
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// The human-readable name shown at the UI boundary
    #[inline]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// A live view of the accounts the identity broker knows about
///
/// The cache never snapshots: every call queries the broker afresh, since the
/// broker may add or drop entries behind our back.
#[derive(Clone, Debug)]
pub struct AccountCache<B> {
    broker: Arc<B>,
}

impl<B: IdentityBroker> AccountCache<B> {
    /// Constructs a view over the given broker
    pub fn new(broker: Arc<B>) -> Self {
        Self { broker }
    }

    /// Enumerates the currently known accounts
    pub async fn list(&self) -> Result<Vec<Account>, ProviderError> {
        self.broker.accounts().await
    }

    /// Removes every known account, one at a time
    ///
    /// Removing an account can have side effects on the enumeration (the
    /// broker's add/remove is not atomic), so the list is re-queried after
    /// every removal rather than draining an initial snapshot. Terminates
    /// when the list comes back empty; a no-op when it already is.
    pub async fn remove_all(&self) -> Result<(), ProviderError> {
        let mut accounts = self.broker.accounts().await?;
        while let Some(first) = accounts.first() {
            tracing::debug!(account = %first.id(), "removing account from cache");
            self.broker.remove_account(first).await?;
            accounts = self.broker.accounts().await?;
        }
        tracing::debug!("account cache is empty");
        Ok(())
    }
}
