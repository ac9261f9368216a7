//! Session guard: credential attachment and 401/403 recovery for every API call.
//!
//! Per call the flow is `attach -> send -> inspect status -> recover`:
//! - 403 notifies the user and fails with `Forbidden`
//! - 401 on a credentialed request expires the session and retries once anonymously
//! - 401 on an anonymous request asks for credentials and retries once with them
//!
//! Retried responses are final. A 401 or 403 on the retry is returned as an
//! error and never triggers another prompt.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{self, HeaderValue};
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::session::{LoginResponse, Session, SessionStore, UserInfo};
use crate::config::GuardConfig;
use crate::error::GuardError;
use crate::request::{ApiRequest, ApiResponse, NO_AUTH_HEADER};
use crate::store::KeyValueStore;
use crate::transport::Transport;
use crate::ui::{CredentialPrompt, Notifier, FORBIDDEN_MESSAGE, SESSION_EXPIRED_MESSAGE};

/// An open credential prompt. Every failure that needs credentials while it
/// is open awaits a clone of the same future.
type PendingPrompt = Shared<BoxFuture<'static, Option<Session>>>;

pub struct SessionGuard {
    transport: Arc<dyn Transport>,
    sessions: SessionStore,
    notifier: Arc<dyn Notifier>,
    prompt: Arc<dyn CredentialPrompt>,
    config: GuardConfig,
    active_prompt: Arc<Mutex<Option<PendingPrompt>>>,
}

impl SessionGuard {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        prompt: Arc<dyn CredentialPrompt>,
        config: GuardConfig,
    ) -> Self {
        Self {
            transport,
            sessions: SessionStore::new(store),
            notifier,
            prompt,
            config,
            active_prompt: Arc::new(Mutex::new(None)),
        }
    }

    /// Current stored session. Unreadable storage reads as no session.
    pub fn session(&self) -> Session {
        self.sessions.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read session");
            Session::default()
        })
    }

    pub fn current_user(&self) -> Option<UserInfo> {
        self.session().user()
    }

    pub fn is_admin(&self) -> bool {
        self.current_user().map(|u| u.administrator).unwrap_or(false)
    }

    /// Add `Authorization: Bearer <token>` if a token is stored, replacing any existing header
    pub fn attach_credentials(&self, request: ApiRequest) -> ApiRequest {
        match self.stored_token() {
            Some(token) => with_bearer(request, &token),
            None => request,
        }
    }

    /// Send a request with credentials attached, recovering from 401 and reporting 403.
    pub async fn guard(&self, request: ApiRequest) -> Result<ApiResponse, GuardError> {
        if request.is_no_auth() {
            debug!(path = %request.target, "No-auth request, bypassing session guard");
            return self.send(request.without_header(NO_AUTH_HEADER)).await;
        }

        let token = self.stored_token();
        let request = match token.as_deref() {
            Some(token) => with_bearer(request, token),
            None => request,
        };

        let response = self.send(request.clone()).await?;
        match response.status {
            StatusCode::UNAUTHORIZED => self.recover(request, token).await,
            StatusCode::FORBIDDEN => Err(self.forbidden(&response)),
            _ => Ok(response),
        }
    }

    /// Exchange username and password for a session and persist it.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, GuardError> {
        let request = login_request(&self.config, username, password).no_auth();
        let response = self.guard(request).await?;
        let session = parse_login_response(response)?;

        self.persist(&session);
        info!(user = session.display_name.as_deref().unwrap_or(username), "Login successful");
        Ok(session)
    }

    /// Terminate the server session (best effort), then clear local state.
    pub async fn logout(&self) {
        match self.sessions.session_id() {
            Ok(Some(session_id)) => {
                let request =
                    self.attach_credentials(ApiRequest::delete(self.config.logout_path(&session_id)));
                match self.transport.send(request).await {
                    Ok(response) if response.is_success() => {
                        debug!("Server session terminated");
                    }
                    Ok(response) => {
                        warn!(status = %response.status, "Server rejected logout");
                    }
                    Err(e) => {
                        warn!(error = %e, "Logout request failed");
                    }
                }
            }
            Ok(None) => debug!("No server session to terminate"),
            Err(e) => warn!(error = %e, "Failed to read session id"),
        }

        self.clear_session();
        self.notifier.refresh();
        info!("Logged out");
    }

    /// Ask the user to log in, joining the prompt if one is already open.
    /// Returns whether a session was established.
    pub async fn show_login_dialog(&self) -> bool {
        let logged_in = self.ask_for_credentials().await.is_some();
        if logged_in {
            self.notifier.refresh();
        }
        logged_in
    }

    /// Set a new password using a reset token sent out of band
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), GuardError> {
        let request = ApiRequest::post(self.config.reset_password_path())
            .with_form(&[("token", token), ("newPassword", new_password)])
            .no_auth();
        let response = self.guard(request).await?;
        if response.is_success() {
            info!("Password reset");
            Ok(())
        } else {
            Err(GuardError::from_login_status(response.status, &response.text()))
        }
    }

    async fn recover(
        &self,
        request: ApiRequest,
        sent_token: Option<String>,
    ) -> Result<ApiResponse, GuardError> {
        let had_credentials = sent_token.is_some() || request.has_authorization();

        if had_credentials || !self.config.retry_unauthenticated_on_session_expiration {
            info!(path = %request.target, "Request unauthenticated, expiring session and retrying without credentials");
            self.expire_session(sent_token.as_deref());
            self.notifier.warn(SESSION_EXPIRED_MESSAGE);

            let retry = request.without_header(header::AUTHORIZATION);
            let response = self.send(retry).await?;
            return self.finish(response);
        }

        if let Some(token) = self.stored_token() {
            debug!(path = %request.target, "Session established while request was in flight, retrying with it");
            let response = self.send(with_bearer(request, &token)).await?;
            return self.finish(response);
        }

        debug!(path = %request.target, "Request unauthenticated, asking for credentials");
        match self.ask_for_credentials().await {
            Some(session) => {
                let retry = match session.token.as_deref() {
                    Some(token) => with_bearer(request, token),
                    None => request,
                };
                let response = self.send(retry).await?;
                self.finish(response)
            }
            None => {
                info!(path = %request.target, "Credential prompt dismissed, not retrying");
                Err(GuardError::Declined)
            }
        }
    }

    /// Outcome of a retried request. No further recovery is attempted.
    fn finish(&self, response: ApiResponse) -> Result<ApiResponse, GuardError> {
        match response.status {
            StatusCode::UNAUTHORIZED => {
                warn!("Retried request still unauthenticated");
                Err(GuardError::Unauthenticated)
            }
            StatusCode::FORBIDDEN => Err(self.forbidden(&response)),
            _ => Ok(response),
        }
    }

    fn forbidden(&self, response: &ApiResponse) -> GuardError {
        self.notifier.warn(FORBIDDEN_MESSAGE);
        GuardError::from_status(response.status, &response.text())
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GuardError> {
        let target = request.target.clone();
        self.transport.send(request).await.map_err(|e| {
            warn!(path = %target, error = %e, "Request failed");
            self.notifier.warn(&e.to_string());
            e
        })
    }

    async fn ask_for_credentials(&self) -> Option<Session> {
        let pending = {
            let mut active = self.active_prompt.lock().await;
            match active.as_ref() {
                Some(pending) => {
                    debug!("Joining open credential prompt");
                    pending.clone()
                }
                None => {
                    let pending = open_prompt(
                        self.prompt.clone(),
                        self.sessions.clone(),
                        self.active_prompt.clone(),
                    );
                    *active = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    fn stored_token(&self) -> Option<String> {
        self.sessions.token().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read session token");
            None
        })
    }

    /// Clear the session unless it was replaced after `sent_token` was attached
    fn expire_session(&self, sent_token: Option<&str>) {
        let stored = self.stored_token();
        if stored.is_some() && stored.as_deref() != sent_token {
            debug!("Session changed since request was issued, keeping it");
            return;
        }
        self.clear_session();
    }

    fn clear_session(&self) {
        if let Err(e) = self.sessions.clear() {
            warn!(error = %e, "Failed to clear session");
        }
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.sessions.save(session) {
            warn!(error = %e, "Failed to save session");
        }
    }
}

/// Build the shared prompt future. It persists the session it obtains and
/// empties the active slot when it completes, so a later failure opens a fresh prompt.
fn open_prompt(
    prompt: Arc<dyn CredentialPrompt>,
    sessions: SessionStore,
    slot: Arc<Mutex<Option<PendingPrompt>>>,
) -> PendingPrompt {
    async move {
        info!("Opening credential prompt");
        let result = prompt.ask().await.filter(Session::has_token);

        if let Some(ref session) = result {
            if let Err(e) = sessions.save(session) {
                warn!(error = %e, "Failed to save session");
            }
            info!("Credentials accepted");
        }

        slot.lock().await.take();
        result
    }
    .boxed()
    .shared()
}

fn with_bearer(request: ApiRequest, token: &str) -> ApiRequest {
    match HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.with_header(header::AUTHORIZATION, value)
        }
        Err(_) => {
            warn!("Stored token is not a valid header value, sending without credentials");
            request
        }
    }
}

fn login_request(config: &GuardConfig, username: &str, password: &str) -> ApiRequest {
    ApiRequest::post(config.login_path.clone())
        .with_form(&[("username", username), ("password", password)])
}

fn parse_login_response(response: ApiResponse) -> Result<Session, GuardError> {
    if !response.is_success() {
        return Err(GuardError::from_login_status(response.status, &response.text()));
    }
    let login: LoginResponse = response.json()?;
    Ok(Session::from(login))
}

/// Raw credential exchange against the login endpoint, bypassing the guard.
/// Used by prompts that must authenticate while the guard is waiting on them.
pub async fn exchange_credentials(
    transport: &dyn Transport,
    config: &GuardConfig,
    username: &str,
    password: &str,
) -> Result<Session, GuardError> {
    let response = transport
        .send(login_request(config, username, password))
        .await?;
    parse_login_response(response)
}
