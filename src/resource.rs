//! The protected resource call
//!
//! A failed resource call is a distinct failure class from acquisition: the
//! token itself was valid, so the session stays signed in and only the
//! failure text is surfaced.

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use reqwest::header;
use thiserror::Error;

use crate::braids::AccessTokenRef;

/// An error from the protected resource call
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The resource answered with a non-success status
    #[error("{reason}: {body}")]
    CallFailed {
        /// The HTTP status code
        status: u16,
        /// The status line's reason phrase
        reason: String,
        /// The response body text
        body: String,
    },

    /// The request could not be sent or the response could not be read
    #[error("error calling protected resource")]
    Transport(#[from] reqwest::Error),
}

/// A client for one protected HTTP resource
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetches the resource using the given bearer token
    ///
    /// Success is any 2xx status; the response body beyond the status is not
    /// interpreted here.
    async fn fetch(&self, token: &AccessTokenRef) -> Result<(), ResourceError>;
}

/// The reqwest-backed resource client
#[derive(Clone, Debug)]
pub struct HttpResourceClient {
    client: reqwest::Client,
    resource_url: reqwest::Url,
}

impl HttpResourceClient {
    /// Constructs a client for the resource at `resource_url`
    pub fn new(client: reqwest::Client, resource_url: reqwest::Url) -> Self {
        Self {
            client,
            resource_url,
        }
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn fetch(&self, token: &AccessTokenRef) -> Result<(), ResourceError> {
        // The header is attached per call rather than stored as a client
        // default: successive calls may carry different tokens.
        let response = self
            .client
            .get(self.resource_url.clone())
            .header(header::AUTHORIZATION, bearer_header(token))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(
            response.status = status.as_u16(),
            url = %self.resource_url,
            "protected resource responded"
        );

        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        Err(ResourceError::CallFailed {
            status: status.as_u16(),
            reason: status
                .canonical_reason()
                .unwrap_or("<unknown status>")
                .to_owned(),
            body,
        })
    }
}

pub(crate) fn bearer_header(token: &AccessTokenRef) -> header::HeaderValue {
    let mut header_value = BytesMut::with_capacity(token.as_str().len() + 7);
    header_value.put_slice(b"Bearer ");
    header_value.put_slice(token.as_str().as_bytes());
    let mut value =
        header::HeaderValue::from_maybe_shared(header_value).expect("only valid header bytes");
    value.set_sensitive(true);
    value
}
