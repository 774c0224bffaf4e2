//! OpenID-Connect authorization-code session with PKCE.
//!
//! Tokens live in memory only. There is no silent renew: once the access
//! token expires, `access_token` yields `None` until the user signs in again.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

use super::events::{SessionEvent, SessionEvents};
use super::{AuthError, AuthResult, CredentialProvider};
use crate::config::{Config, OidcSettings};

static SHARED: OnceLock<Arc<OidcSession>> = OnceLock::new();

/// Endpoints advertised by `/.well-known/openid-configuration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SignedInUser {
    pub access_token: String,
    pub id_token: Option<String>,
    /// `None` when the provider did not report a lifetime.
    pub expires_at: Option<DateTime<Utc>>,
    pub profile: Option<UserProfile>,
}

impl SignedInUser {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl fmt::Debug for SignedInUser {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SignedInUser")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("profile", &self.profile)
            .finish()
    }
}

struct PendingSignIn {
    state: String,
    code_verifier: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Signed-in identity backed by a generic OIDC provider.
pub struct OidcSession {
    settings: OidcSettings,
    client: Client,
    metadata: Mutex<Option<ProviderMetadata>>,
    pending: Mutex<Option<PendingSignIn>>,
    user: RwLock<Option<SignedInUser>>,
    events: SessionEvents,
}

impl OidcSession {
    /// Endpoints are discovered from `settings.authority` on first use.
    pub fn new(settings: OidcSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
            metadata: Mutex::new(None),
            pending: Mutex::new(None),
            user: RwLock::new(None),
            events: SessionEvents::default(),
        }
    }

    /// Skip discovery and use the given endpoints.
    pub fn with_metadata(settings: OidcSettings, metadata: ProviderMetadata) -> Self {
        let session = Self::new(settings);
        *session.metadata.lock().unwrap_or_else(PoisonError::into_inner) = Some(metadata);
        session
    }

    /// The process-wide session.
    ///
    /// The first call creates it from `config`; later calls return the same
    /// handle and ignore their argument.
    pub fn shared(config: &Config) -> Arc<Self> {
        SHARED
            .get_or_init(|| Arc::new(Self::new(config.oidc.clone())))
            .clone()
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    pub fn user(&self) -> Option<SignedInUser> {
        self.user.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Install a signed-in user and notify subscribers.
    pub fn store_user(&self, user: SignedInUser) {
        let profile = user.profile.clone();
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
        self.events.emit(&SessionEvent::UserLoaded(profile));
    }

    /// Finish the redirect flow from the URL the provider sent the user back to.
    pub async fn complete_sign_in(&self, callback_url: &str) -> AuthResult<SignedInUser> {
        let callback = Url::parse(callback_url)?;
        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in callback.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(error) = error {
            return Err(AuthError::Api(format!("sign-in rejected: {error}")));
        }
        let pending = match (pending, state) {
            (Some(pending), Some(state)) if pending.state == state => pending,
            _ => return Err(AuthError::StateMismatch),
        };
        let code = code.ok_or_else(|| AuthError::Api("callback carried no code".to_string()))?;

        let metadata = self.metadata().await?;
        let token = self.exchange_code(&metadata, &code, &pending.code_verifier).await?;

        let profile = match metadata.userinfo_endpoint.as_deref() {
            Some(endpoint) => match self.fetch_profile(endpoint, &token.access_token).await {
                Ok(profile) => Some(profile),
                Err(error) => {
                    tracing::warn!("Failed to load user info: {}", error);
                    None
                }
            },
            None => None,
        };

        let user = SignedInUser {
            access_token: token.access_token,
            id_token: token.id_token,
            expires_at: token
                .expires_in
                .and_then(TimeDelta::try_seconds)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime)),
            profile,
        };
        tracing::info!(expires_at = ?user.expires_at, "signed in");
        self.store_user(user.clone());
        Ok(user)
    }

    fn require_configured(&self) -> AuthResult<()> {
        if self.settings.authority.is_empty() {
            return Err(AuthError::InvalidConfiguration("OIDC authority must not be empty"));
        }
        if self.settings.client_id.is_empty() {
            return Err(AuthError::InvalidConfiguration("OIDC client id must not be empty"));
        }
        Ok(())
    }

    async fn metadata(&self) -> AuthResult<ProviderMetadata> {
        let cached = self
            .metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(metadata) = cached {
            return Ok(metadata);
        }

        self.require_configured()?;
        let url = format!("{}/.well-known/openid-configuration", self.settings.authority);
        tracing::debug!(%url, "discovering OIDC provider");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AuthError::Discovery(format!(
                "{url} returned HTTP {}",
                response.status().as_u16()
            )));
        }
        let metadata: ProviderMetadata = response.json().await?;
        *self.metadata.lock().unwrap_or_else(PoisonError::into_inner) = Some(metadata.clone());
        Ok(metadata)
    }

    async fn exchange_code(
        &self,
        metadata: &ProviderMetadata,
        code: &str,
        code_verifier: &str,
    ) -> AuthResult<TokenResponse> {
        let response = self
            .client
            .post(&metadata.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("client_id", self.settings.client_id.as_str()),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::Api(format!(
                "token endpoint returned HTTP {}: {body}",
                status.as_u16()
            )));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_profile(&self, endpoint: &str, access_token: &str) -> AuthResult<UserProfile> {
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

impl fmt::Debug for OidcSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OidcSession")
            .field("settings", &self.settings)
            .field("user", &self.user())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialProvider for OidcSession {
    async fn access_token(&self) -> AuthResult<Option<String>> {
        let user = self.user.read().unwrap_or_else(PoisonError::into_inner);
        Ok(user
            .as_ref()
            .filter(|user| !user.is_expired_at(Utc::now()))
            .map(|user| user.access_token.clone()))
    }

    async fn begin_sign_in(&self) -> AuthResult<String> {
        self.require_configured()?;
        let metadata = self.metadata().await?;

        let state = Uuid::new_v4().simple().to_string();
        let code_verifier = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));

        let url = Url::parse_with_params(
            &metadata.authorization_endpoint,
            &[
                ("response_type", "code"),
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("scope", self.settings.scope.as_str()),
                ("state", state.as_str()),
                ("code_challenge", code_challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )?;

        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(PendingSignIn {
            state,
            code_verifier,
        });
        Ok(url.into())
    }

    async fn begin_sign_out(&self) -> AuthResult<String> {
        let previous = self
            .user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            self.events.emit(&SessionEvent::UserUnloaded);
        }

        let endpoint = match self.metadata().await {
            Ok(metadata) => metadata.end_session_endpoint,
            Err(error) => {
                tracing::warn!("Signing out locally only: {}", error);
                None
            }
        };
        let Some(endpoint) = endpoint else {
            return Ok(self.settings.post_logout_redirect_uri.clone());
        };

        let mut url = Url::parse(&endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.settings.client_id);
            query.append_pair(
                "post_logout_redirect_uri",
                &self.settings.post_logout_redirect_uri,
            );
            if let Some(hint) = previous.as_ref().and_then(|user| user.id_token.as_deref()) {
                query.append_pair("id_token_hint", hint);
            }
        }
        Ok(url.into())
    }
}
