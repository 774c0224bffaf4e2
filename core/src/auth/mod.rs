//! Credential provider seam and the request authenticator.
//!
//! # Design
//! The authenticator asks the provider for a token on every request and never
//! keeps one around, so a refreshed or revoked session takes effect on the
//! next call. A missing token is not an error here: the request goes out
//! without an `Authorization` header and the server decides.

mod events;
mod oidc;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::HttpRequest;

pub use events::{SessionEvent, SessionEvents, Subscription};
pub use oidc::{OidcSession, ProviderMetadata, SignedInUser, UserProfile};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Provider discovery failed: {0}")]
    Discovery(String),
    #[error("Sign-in state does not match any pending sign-in")]
    StateMismatch,
    #[error("Auth API error: {0}")]
    Api(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Source of bearer tokens for the signed-in identity.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current, non-expired access token; `None` when nobody is signed in.
    async fn access_token(&self) -> AuthResult<Option<String>>;

    /// URL to send the user to for signing in.
    async fn begin_sign_in(&self) -> AuthResult<String>;

    /// Forget the local session and return the URL that ends it upstream.
    async fn begin_sign_out(&self) -> AuthResult<String>;
}

/// Stamps `Authorization: Bearer <token>` onto outbound requests.
#[derive(Clone)]
pub struct RequestAuthenticator {
    provider: Arc<dyn CredentialProvider>,
}

impl RequestAuthenticator {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }

    pub async fn authenticate(&self, request: &mut HttpRequest) -> AuthResult<()> {
        match self.provider.access_token().await? {
            Some(token) => request.set_header("authorization", format!("Bearer {token}")),
            None => {
                tracing::warn!(path = %request.path, "sending request without a credential");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RequestAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuthenticator").finish_non_exhaustive()
    }
}
