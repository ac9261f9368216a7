//! Client-side session guard for a REST API.
//!
//! Every outgoing call passes through [`SessionGuard::guard`], which attaches
//! the stored bearer token and recovers from authentication failures by
//! expiring the session or asking the user for new credentials. The network,
//! storage and user-interface sides are traits so they can be swapped out.

pub mod auth;
pub mod config;
pub mod error;
pub mod request;
pub mod store;
pub mod transport;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

pub use reqwest::{Method, StatusCode};

pub use auth::{exchange_credentials, Session, SessionGuard, SessionStore, UserInfo};
pub use config::{Config, GuardConfig, StorageKind};
pub use error::GuardError;
pub use request::{ApiRequest, ApiResponse, Body, NO_AUTH_HEADER};
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
pub use transport::{HttpTransport, Transport};
pub use ui::{CredentialPrompt, NoPrompt, Notifier, TracingNotifier};
