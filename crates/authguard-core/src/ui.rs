//! User-facing capabilities the guard calls out to.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::auth::Session;

pub const SESSION_EXPIRED_MESSAGE: &str =
    "You have been logged out because your session has expired.";
pub const FORBIDDEN_MESSAGE: &str = "You do not have the permission to do that!";

/// Transient user notifications.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);

    /// Re-render the current view after the session changed
    fn refresh(&self) {}
}

/// Asks the user for new credentials. `None` means the prompt was dismissed.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn ask(&self) -> Option<Session>;
}

/// Notifier that only writes to the log, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, message: &str) {
        info!(notice = message, "User notification");
    }

    fn warn(&self, message: &str) {
        warn!(notice = message, "User notification");
    }
}

/// Prompt that is always dismissed, for contexts with no user to ask.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

#[async_trait]
impl CredentialPrompt for NoPrompt {
    async fn ask(&self) -> Option<Session> {
        None
    }
}
