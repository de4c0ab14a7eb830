//! Caller identity: bearer token → `SessionContext`.
//!
//! Sign-in itself lives elsewhere. The service only needs an `Authenticator`
//! that turns a presented token into a uid and optional display name.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use serde::Serialize;

use crate::error::{AuthError, ConfigError};

/// The authenticated caller, passed explicitly into the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub uid: String,
    pub display_name: Option<String>,
}

impl SessionContext {
    pub fn new(uid: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name,
        }
    }
}

/// Resolves a bearer token to a session.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, token: &str) -> Result<SessionContext, AuthError>;
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?
        .trim();
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Authenticate a request from its headers.
pub async fn authenticate(
    authenticator: &dyn Authenticator,
    headers: &HeaderMap,
) -> Result<SessionContext, AuthError> {
    let token = bearer_token(headers)?;
    authenticator.verify(token).await
}

/// Static token table, configured from `DISHA_AUTH_TOKENS`.
#[derive(Debug, Default)]
pub struct TokenTable {
    sessions: HashMap<String, SessionContext>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `token:uid[:Display Name]` entries.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Result<Self, ConfigError> {
        let mut table = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            let mut parts = entry.splitn(3, ':');
            let token = parts.next().unwrap_or_default().trim();
            let uid = parts.next().unwrap_or_default().trim();
            if token.is_empty() || uid.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "DISHA_AUTH_TOKENS".into(),
                    message: format!("expected token:uid[:name], got {entry:?}"),
                });
            }
            let name = parts
                .next()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from);
            table.insert(token, SessionContext::new(uid, name));
        }
        Ok(table)
    }

    pub fn insert(&mut self, token: impl Into<String>, session: SessionContext) {
        self.sessions.insert(token.into(), session);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl Authenticator for TokenTable {
    async fn verify(&self, token: &str) -> Result<SessionContext, AuthError> {
        self.sessions
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
