use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::KeyValueStore;

pub const TOKEN_KEY: &str = "token";
pub const DISPLAY_NAME_KEY: &str = "displayName";
pub const ADMINISTRATOR_KEY: &str = "isAdministrator";
pub const SESSION_ID_KEY: &str = "sessionId";

const SESSION_KEYS: [&str; 4] = [TOKEN_KEY, DISPLAY_NAME_KEY, ADMINISTRATOR_KEY, SESSION_ID_KEY];

/// Client-held authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub display_name: Option<String>,
    pub is_administrator: bool,
    pub session_id: Option<String>,
}

impl Session {
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.display_name.as_ref().map(|name| UserInfo {
            display_name: name.clone(),
            administrator: self.is_administrator,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub display_name: String,
    pub administrator: bool,
}

/// Body returned by the login endpoint on a successful credential exchange.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    jwt: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    #[serde(default)]
    administrator: bool,
    #[serde(rename = "portofinoSessionId")]
    session_id: Option<String>,
}

impl From<LoginResponse> for Session {
    fn from(resp: LoginResponse) -> Self {
        Session {
            token: Some(resp.jwt),
            display_name: resp.display_name,
            is_administrator: resp.administrator,
            session_id: resp.session_id,
        }
    }
}

/// Maps a `Session` onto the string keys of a `KeyValueStore`.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.store.get(TOKEN_KEY)
    }

    pub fn session_id(&self) -> Result<Option<String>> {
        self.store.get(SESSION_ID_KEY)
    }

    pub fn load(&self) -> Result<Session> {
        Ok(Session {
            token: self.store.get(TOKEN_KEY)?,
            display_name: self.store.get(DISPLAY_NAME_KEY)?,
            is_administrator: self.store.get(ADMINISTRATOR_KEY)?.as_deref() == Some("true"),
            session_id: self.store.get(SESSION_ID_KEY)?,
        })
    }

    /// Persist a session. Absent fields remove their key so no stale value survives.
    pub fn save(&self, session: &Session) -> Result<()> {
        self.put(TOKEN_KEY, session.token.as_deref())?;
        self.put(DISPLAY_NAME_KEY, session.display_name.as_deref())?;
        self.store.set(
            ADMINISTRATOR_KEY,
            if session.is_administrator { "true" } else { "false" },
        )?;
        self.put(SESSION_ID_KEY, session.session_id.as_deref())?;
        Ok(())
    }

    /// Remove every session key. Keeps going past individual failures and reports the first.
    pub fn clear(&self) -> Result<()> {
        let mut first_err = None;
        for key in SESSION_KEYS {
            if let Err(e) = self.store.remove(key) {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn put(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) => self.store.set(key, v),
            None => self.store.remove(key),
        }
    }
}
