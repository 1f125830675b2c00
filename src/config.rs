//! Construction-time configuration
//!
//! Rather than reading knobs from an ambient settings store into globals,
//! everything configurable is one explicit value handed to the broker and
//! controller at construction and never touched again.

use serde::Deserialize;

use crate::braids::{ClientId, Scope};

/// Settings consumed read-only at startup
///
/// The authority template carries a `{tenant}` placeholder, so the same
/// template serves every cloud instance of the provider.
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    /// Sign-in authority URL template, e.g. `https://login.example.com/{tenant}`
    pub authority_template: String,
    /// The directory tenant the client is registered in
    pub tenant: String,
    /// The identifier this client presents to the provider
    pub client_id: ClientId,
    /// The fixed scope set requested for the protected resource
    pub scopes: Vec<Scope>,
    /// Base URL of the protected resource service
    pub resource_base_url: String,
    /// Path of the protected resource under the base URL
    pub resource_path: String,
}

impl Settings {
    /// The sign-in authority for the configured tenant
    pub fn authority(&self) -> String {
        self.authority_template.replace("{tenant}", &self.tenant)
    }

    /// The full URL of the protected resource
    pub fn resource_url(&self) -> String {
        format!("{}{}", self.resource_base_url, self.resource_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        serde_json::from_value(serde_json::json!({
            "authority_template": "https://login.example.com/{tenant}",
            "tenant": "contoso.example.com",
            "client_id": "client-123",
            "scopes": ["api://todo/read"],
            "resource_base_url": "https://todo.example.com",
            "resource_path": "/api/todolist",
        }))
        .unwrap()
    }

    #[test]
    fn authority_substitutes_the_tenant() {
        assert_eq!(
            settings().authority(),
            "https://login.example.com/contoso.example.com"
        );
    }

    #[test]
    fn resource_url_joins_base_and_path() {
        assert_eq!(
            settings().resource_url(),
            "https://todo.example.com/api/todolist"
        );
    }

    #[test]
    fn scopes_and_client_id_deserialize_as_braids() {
        let settings = settings();
        assert_eq!(settings.client_id.as_str(), "client-123");
        assert_eq!(settings.scopes[0].as_str(), "api://todo/read");
    }
}
