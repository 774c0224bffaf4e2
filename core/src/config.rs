//! Runtime configuration resolved once at startup.
//!
//! Values come from the hosting environment, never from compile-time
//! constants. Blank values count as absent and fall back to the defaults
//! below; URLs lose their trailing slash.

const DEFAULT_APP_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_SCOPE: &str = "openid profile email";

pub const API_URL_KEY: &str = "TODO_API_URL";
pub const AUTHORITY_KEY: &str = "OIDC_AUTHORITY";
pub const CLIENT_ID_KEY: &str = "OIDC_CLIENT_ID";
pub const REDIRECT_URI_KEY: &str = "OIDC_REDIRECT_URI";
pub const POST_LOGOUT_REDIRECT_URI_KEY: &str = "OIDC_POST_LOGOUT_REDIRECT_URI";
pub const SCOPE_KEY: &str = "OIDC_SCOPE";
pub const APP_ORIGIN_KEY: &str = "APP_ORIGIN";

/// Identity-provider settings for the OIDC session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcSettings {
    /// Issuer base URL; empty when not configured.
    pub authority: String,
    /// Empty when not configured.
    pub client_id: String,
    pub redirect_uri: String,
    pub post_logout_redirect_uri: String,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// API base URL as configured; empty means same-origin.
    pub api_url: String,
    /// Origin the app is served from, used for same-origin defaults.
    pub app_origin: String,
    pub oidc: OidcSettings,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Absolute base URL for API requests: `api_url`, or the app origin when
    /// `api_url` is empty.
    pub fn api_base(&self) -> &str {
        if self.api_url.is_empty() {
            &self.app_origin
        } else {
            &self.api_url
        }
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| normalize_text_option(lookup(key));
        let read_url = |key: &str| read(key).map(|url| url.trim_end_matches('/').to_string());

        let origin = read_url(APP_ORIGIN_KEY).unwrap_or_else(|| DEFAULT_APP_ORIGIN.to_string());

        Self {
            api_url: read_url(API_URL_KEY).unwrap_or_default(),
            oidc: OidcSettings {
                authority: read_url(AUTHORITY_KEY).unwrap_or_default(),
                client_id: read(CLIENT_ID_KEY).unwrap_or_default(),
                redirect_uri: read(REDIRECT_URI_KEY).unwrap_or_else(|| format!("{origin}/callback")),
                post_logout_redirect_uri: read(POST_LOGOUT_REDIRECT_URI_KEY)
                    .unwrap_or_else(|| format!("{origin}/")),
                scope: read(SCOPE_KEY).unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            },
            app_origin: origin,
        }
    }
}

fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
