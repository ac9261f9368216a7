//! Authentication module for guarding API calls and managing the session.
//!
//! This module provides:
//! - `SessionGuard`: attaches bearer credentials and recovers from 401/403
//! - `Session` / `SessionStore`: the client-held session and its persistence

pub mod guard;
pub mod session;

pub use guard::{exchange_credentials, SessionGuard};
pub use session::{Session, SessionStore, UserInfo};
