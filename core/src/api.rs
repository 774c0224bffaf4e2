//! Authenticated, async todo operations.
//!
//! Each call builds a request, authenticates it, sends it through the
//! transport, and parses the response. Nothing is cached between calls.

use std::sync::Arc;

use crate::attachments::AttachmentResolver;
use crate::auth::{CredentialProvider, OidcSession, RequestAuthenticator};
use crate::client::TodoClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Todo, TodoCreate};

#[derive(Clone)]
pub struct TodoApi {
    client: TodoClient,
    attachments: AttachmentResolver,
    authenticator: RequestAuthenticator,
    transport: Arc<dyn Transport>,
}

impl TodoApi {
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            client: TodoClient::new(base_url),
            attachments: AttachmentResolver::new(base_url),
            authenticator: RequestAuthenticator::new(credentials),
            transport,
        }
    }

    /// Production wiring: the shared OIDC session and a reqwest transport.
    ///
    /// An empty API URL resolves to the app origin, since the transport
    /// needs absolute URLs.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_base(),
            OidcSession::shared(config),
            Arc::new(ReqwestTransport::default()),
        )
    }

    pub fn attachments(&self) -> &AttachmentResolver {
        &self.attachments
    }

    pub async fn list_todos(&self) -> Result<Vec<Todo>, ApiError> {
        let response = self.send(self.client.build_list_todos()).await?;
        self.client.parse_list_todos(response)
    }

    /// Sends `input` unchanged; see [`TodoCreate::normalized`] for the
    /// client-side checks the view state applies first.
    pub async fn create_todo(&self, input: &TodoCreate) -> Result<Todo, ApiError> {
        let response = self.send(self.client.build_create_todo(input)?).await?;
        self.client.parse_create_todo(response)
    }

    pub async fn get_todo(&self, id: i64) -> Result<Todo, ApiError> {
        let response = self.send(self.client.build_get_todo(id)).await?;
        self.client.parse_get_todo(response)
    }

    pub async fn complete_todo(&self, id: i64) -> Result<Todo, ApiError> {
        let response = self.send(self.client.build_complete_todo(id)).await?;
        self.client.parse_complete_todo(response)
    }

    /// Upload one file; returns the attachment key the store assigned.
    pub async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
        let response = self
            .send(self.attachments.build_upload(file_name, bytes))
            .await?;
        self.attachments.parse_upload(response)
    }

    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.authenticator.authenticate(&mut request).await?;
        tracing::debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let response = self.transport.execute(request).await?;
        tracing::debug!(status = response.status, "received response");
        Ok(response)
    }
}

impl std::fmt::Debug for TodoApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoApi")
            .field("base_url", &self.client.base_url())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_without_api_url_targets_app_origin() {
        let config = Config::from_lookup(|key| {
            (key == crate::config::APP_ORIGIN_KEY).then(|| "https://todo.example".to_string())
        });
        let api = TodoApi::from_config(&config);
        assert_eq!(
            api.attachments().resolve_url(Some("a.png")).as_deref(),
            Some("https://todo.example/api/files/a.png")
        );
        assert_eq!(api.client.build_list_todos().path, "https://todo.example/api/todos/");
    }
}
