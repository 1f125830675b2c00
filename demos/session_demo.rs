//! Drives a full session cycle against a real protected resource.
//!
//! The identity provider is stood in for by a static broker holding one
//! pre-issued access token, so the demo exercises the trigger state machine
//! and the bearer-authenticated resource call without a browser flow:
//!
//! ```sh
//! cargo run --example session_demo -- \
//!     --tenant contoso.example.com \
//!     --client-id client-123 \
//!     --scope api://todo/read \
//!     --resource-base-url https://todo.example.com \
//!     --resource-path /api/todolist \
//!     --access-token "$TOKEN" \
//!     --display-name "user@contoso.example.com"
//! ```

use std::sync::{Arc, Mutex};

use aliri_clock::{Clock, DurationSecs, System};
use async_trait::async_trait;
use bearer_session::{
    account::Account,
    acquire::TokenBroker,
    config::Settings,
    provider::{IdentityBroker, Prompt, ProviderError},
    resource::HttpResourceClient,
    session::{SessionController, UserMessage},
    AccessToken, AccountId, ClientId, Scope, TokenResult,
};
use clap::Parser;

#[derive(Debug, Parser)]
struct Opts {
    /// Sign-in authority URL template with a `{tenant}` placeholder
    #[arg(
        long,
        env,
        default_value = "https://login.microsoftonline.com/{tenant}"
    )]
    authority_template: String,

    /// The directory tenant the client is registered in
    #[arg(short, long, env)]
    tenant: String,

    /// The client ID presented to the provider
    #[arg(short, long, env)]
    client_id: String,

    /// Scope requested for the protected resource (repeatable)
    #[arg(short, long = "scope", env)]
    scopes: Vec<String>,

    /// Base URL of the protected resource service
    #[arg(long, env)]
    resource_base_url: String,

    /// Path of the protected resource under the base URL
    #[arg(long, env, default_value = "/")]
    resource_path: String,

    /// A pre-issued access token standing in for the provider's answer
    #[arg(long, env, hide_env_values = true)]
    access_token: String,

    /// Display name of the demo identity
    #[arg(long, env, default_value = "demo user")]
    display_name: String,
}

/// A broker that always answers with the same pre-issued token.
#[derive(Debug)]
struct StaticBroker {
    accounts: Mutex<Vec<Account>>,
    token: AccessToken,
}

#[async_trait]
impl IdentityBroker for StaticBroker {
    async fn accounts(&self) -> Result<Vec<Account>, ProviderError> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn acquire_token_silent(
        &self,
        _scopes: &[Scope],
        account: &Account,
    ) -> Result<TokenResult, ProviderError> {
        Ok(TokenResult::new(
            self.token.clone(),
            account.clone(),
            System.now() + DurationSecs(3600),
        ))
    }

    async fn acquire_token_interactive(
        &self,
        _scopes: &[Scope],
        login_hint: Option<&Account>,
        _prompt: Prompt,
    ) -> Result<TokenResult, ProviderError> {
        let account = login_hint
            .cloned()
            .ok_or_else(|| ProviderError::failure("no identity to sign in", "access_denied"))?;
        self.accounts.lock().unwrap().push(account.clone());
        Ok(TokenResult::new(
            self.token.clone(),
            account,
            System.now() + DurationSecs(3600),
        ))
    }

    async fn remove_account(&self, account: &Account) -> Result<(), ProviderError> {
        self.accounts
            .lock()
            .unwrap()
            .retain(|a| a.id() != account.id());
        Ok(())
    }
}

fn report(label: &str, update: &bearer_session::session::SessionUpdate) {
    tracing::info!(
        trigger = label,
        display_name = update.state.display_name(),
        token = update
            .token
            .as_ref()
            .map(|t| format!("{t:#}"))
            .as_deref()
            .unwrap_or("<none>"),
        "trigger completed"
    );
    match &update.message {
        Some(UserMessage::Prompt(text)) => tracing::warn!(%text, "prompt"),
        Some(UserMessage::Error(text)) => tracing::error!(%text, "error"),
        None => {}
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let settings = Settings {
        authority_template: opts.authority_template,
        tenant: opts.tenant,
        client_id: ClientId::from(opts.client_id),
        scopes: opts.scopes.into_iter().map(Scope::from).collect(),
        resource_base_url: opts.resource_base_url,
        resource_path: opts.resource_path,
    };

    tracing::info!(
        authority = settings.authority(),
        resource = settings.resource_url(),
        "configured"
    );

    let identity = Account::new(
        AccountId::from_static("demo-account"),
        opts.display_name,
    );
    let provider = Arc::new(StaticBroker {
        accounts: Mutex::new(vec![identity]),
        token: AccessToken::from(opts.access_token),
    });

    let broker = TokenBroker::new(provider, settings.scopes.clone());
    let resource = HttpResourceClient::new(
        reqwest::Client::new(),
        reqwest::Url::parse(&settings.resource_url())?,
    );
    let mut session = SessionController::new(broker, resource);

    report("startup", &session.startup().await);
    report("refresh", &session.refresh().await);
    report("sign_in_or_out", &session.sign_in_or_out().await);

    Ok(())
}
