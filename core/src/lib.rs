//! Authenticated data access and view-state synchronization for the todo
//! service.
//!
//! # Overview
//! Requests are built and parsed as plain data (`TodoClient`,
//! `AttachmentResolver`), stamped with a bearer token by
//! `RequestAuthenticator`, and executed by a `Transport`. `TodoApi` ties
//! those together; `TodoViewState` keeps the on-screen collection in step
//! with the server by reloading it after every mutation.
//!
//! # Design
//! - Builders and parsers never touch the network, so they are deterministic
//!   and testable without a server.
//! - The credential provider is asked for a token on every request; tokens
//!   are never cached by this crate.
//! - `Config` is resolved once at startup and passed down explicitly.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod attachments;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod state;
pub mod transport;
pub mod types;

pub use api::TodoApi;
pub use attachments::{is_image_key, AttachmentResolver};
pub use auth::{
    AuthError, CredentialProvider, OidcSession, RequestAuthenticator, SessionEvent, Subscription,
};
pub use client::TodoClient;
pub use config::{Config, OidcSettings};
pub use error::ApiError;
pub use http::{FilePart, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use state::{DetailState, ListState, TodoViewState};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Todo, TodoCreate, UploadedFile};
