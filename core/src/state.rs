//! In-memory view of the todo collection and the selected detail item.
//!
//! # Design
//! The collection is never patched locally. Every successful mutation is
//! followed by a full reload, so the list always mirrors the server's latest
//! answer, including server-assigned ids and normalized dates. Failures leave
//! the list as it was and raise a one-shot `notice` for the user.
//!
//! Actions borrow the state mutably, so one view state never has two
//! mutations in flight at once.

use crate::api::TodoApi;
use crate::error::ApiError;
use crate::types::{Todo, TodoCreate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Loading,
    Ready(Vec<Todo>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Closed,
    Loading(i64),
    Ready(Todo),
    Failed { id: i64, message: String },
}

#[derive(Debug)]
pub struct TodoViewState {
    api: TodoApi,
    list: ListState,
    detail: DetailState,
    notice: Option<String>,
}

impl TodoViewState {
    /// Starts in `Loading`; call [`refresh`](Self::refresh) to populate.
    pub fn new(api: TodoApi) -> Self {
        Self {
            api,
            list: ListState::Loading,
            detail: DetailState::Closed,
            notice: None,
        }
    }

    pub fn list(&self) -> &ListState {
        &self.list
    }

    /// The loaded todos, or an empty slice while loading or failed.
    pub fn todos(&self) -> &[Todo] {
        match &self.list {
            ListState::Ready(todos) => todos,
            ListState::Loading | ListState::Failed(_) => &[],
        }
    }

    pub fn detail(&self) -> &DetailState {
        &self.detail
    }

    pub fn selected_id(&self) -> Option<i64> {
        match &self.detail {
            DetailState::Closed => None,
            DetailState::Loading(id) | DetailState::Failed { id, .. } => Some(*id),
            DetailState::Ready(todo) => Some(todo.id),
        }
    }

    /// Take the pending user-facing message, if any.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn attachment_url(&self, todo: &Todo) -> Option<String> {
        self.api.attachments().resolve_url(todo.image_key.as_deref())
    }

    /// Replace the collection with a fresh server snapshot.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        self.list = ListState::Loading;
        match self.api.list_todos().await {
            Ok(todos) => {
                tracing::debug!(count = todos.len(), "todo list loaded");
                self.list = ListState::Ready(todos);
                Ok(())
            }
            Err(error) => {
                tracing::error!(%error, "failed to load todos");
                self.list = ListState::Failed(error.user_message().to_string());
                Err(error)
            }
        }
    }

    /// Create a todo, then reload the collection.
    ///
    /// A blank title is rejected before anything is sent. A failed reload
    /// after a successful create shows up in [`list`](Self::list), not in
    /// the return value and as a notice.
    pub async fn create(&mut self, input: TodoCreate) -> Result<Todo, ApiError> {
        let input = input.normalized().map_err(|error| self.report("create", error))?;
        let created = self
            .api
            .create_todo(&input)
            .await
            .map_err(|error| self.report("create", error))?;
        tracing::info!(id = created.id, "todo created");
        self.reload_after_mutation().await;
        Ok(created)
    }

    /// Mark a todo complete, then reload the collection.
    pub async fn complete(&mut self, id: i64) -> Result<Todo, ApiError> {
        let updated = self
            .api
            .complete_todo(id)
            .await
            .map_err(|error| self.report("complete", error))?;
        tracing::info!(id, "todo completed");
        self.reload_after_mutation().await;
        Ok(updated)
    }

    /// Upload a file for a todo that is about to be created.
    pub async fn upload_attachment(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ApiError> {
        self.api
            .upload_file(file_name, bytes)
            .await
            .map_err(|error| self.report("upload", error))
    }

    /// Open the detail view for `id`. Errors stay in the detail state.
    pub async fn select(&mut self, id: i64) {
        self.detail = DetailState::Loading(id);
        self.detail = match self.api.get_todo(id).await {
            Ok(todo) => DetailState::Ready(todo),
            Err(error) => {
                tracing::error!(id, %error, "failed to load todo details");
                DetailState::Failed {
                    id,
                    message: error.user_message().to_string(),
                }
            }
        };
    }

    pub fn clear_selection(&mut self) {
        self.detail = DetailState::Closed;
    }

    async fn reload_after_mutation(&mut self) {
        if let Err(error) = self.refresh().await {
            self.notice = Some(error.user_message().to_string());
        }
    }

    fn report(&mut self, action: &'static str, error: ApiError) -> ApiError {
        tracing::error!(action, %error, "todo action failed");
        self.notice = Some(error.user_message().to_string());
        error
    }
}
