//! Interactive credential prompt on the terminal.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use authguard_core::{exchange_credentials, CredentialPrompt, GuardConfig, GuardError, Session, Transport};
use tracing::{debug, warn};

/// Attempts before the prompt gives up and counts as dismissed
const MAX_LOGIN_ATTEMPTS: usize = 3;

pub struct TerminalPrompt {
    transport: Arc<dyn Transport>,
    config: GuardConfig,
}

impl TerminalPrompt {
    pub fn new(transport: Arc<dyn Transport>, config: GuardConfig) -> Self {
        Self { transport, config }
    }

    /// Read username and password. `None` when the user enters an empty username.
    fn read_credentials() -> Result<Option<(String, String)>> {
        let username = prompt_username()?;
        if username.is_empty() {
            return Ok(None);
        }
        let password = rpassword::prompt_password("Password: ")?;
        Ok(Some((username, password)))
    }
}

#[async_trait]
impl CredentialPrompt for TerminalPrompt {
    async fn ask(&self) -> Option<Session> {
        eprintln!("\n=== Login required (empty username to cancel) ===\n");

        for attempt in 1..=MAX_LOGIN_ATTEMPTS {
            let read = tokio::task::spawn_blocking(Self::read_credentials).await;

            let (username, password) = match read {
                Ok(Ok(Some(credentials))) => credentials,
                Ok(Ok(None)) => {
                    debug!("Login prompt cancelled");
                    return None;
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Failed to read credentials");
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, "Credential prompt task failed");
                    return None;
                }
            };

            match exchange_credentials(self.transport.as_ref(), &self.config, &username, &password).await {
                Ok(session) => return Some(session),
                Err(GuardError::InvalidCredentials) => {
                    eprintln!("Invalid username or password ({}/{})", attempt, MAX_LOGIN_ATTEMPTS);
                }
                Err(e) => {
                    eprintln!("Login failed: {}", e);
                    return None;
                }
            }
        }
        None
    }
}

fn prompt_username() -> Result<String> {
    eprint!("Username: ");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
