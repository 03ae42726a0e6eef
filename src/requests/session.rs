//! Credentials and session token lifecycle.
//!
//! A session token is valid for [SESSION_TOKEN_TTL] after it was acquired. Expiry is decided
//! locally; a 401 from the server invalidates the token as well (see
//! [SessionManager::invalidate]). Re-authentication prefers exchanging the refresh token and
//! falls back to a username/password login.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{Error, Result};

pub const SESSION_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Username and password have to be given together, a refresh token works on its own
    pub fn new(
        username: Option<String>,
        password: Option<String>,
        refresh_token: Option<String>,
    ) -> Result<Self> {
        if username.is_some() != password.is_some() {
            return Err(Error::ConfigurationError(
                "username and password must be provided together".to_owned(),
            ));
        }

        Ok(Self {
            username,
            password,
            refresh_token,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.refresh_token.is_none()
    }

    fn login_pair(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionToken {
    pub value: String,
    pub acquired_at: Instant,
}

impl SessionToken {
    pub fn new(value: String) -> Self {
        Self {
            value,
            acquired_at: Instant::now(),
        }
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.acquired_at) < SESSION_TOKEN_TTL
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

/// Tokens returned by the login and refresh endpoints
#[derive(Deserialize, Clone, Default, PartialEq, Eq)]
pub struct TokenPair {
    pub session: Option<String>,
    pub refresh: Option<String>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("session", &self.session.is_some())
            .field("refresh", &self.refresh.is_some())
            .finish()
    }
}

/// The network side of authentication
pub trait Authenticator {
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<TokenPair>> + Send;

    fn refresh(&self, refresh_token: &str) -> impl Future<Output = Result<TokenPair>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    HasCredentials,
    Authenticated { expired: bool },
}

#[derive(Debug)]
pub struct SessionManager {
    credentials: SyncMutex<Credentials>,
    // held across re-authentication so concurrent callers share one login
    token: Mutex<Option<SessionToken>>,
}

impl SessionManager {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: SyncMutex::new(credentials),
            token: Mutex::new(None),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(Credentials::default())
    }

    pub fn is_anonymous(&self) -> bool {
        self.credentials.lock().is_empty()
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials.lock().clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.credentials.lock().refresh_token.clone()
    }

    pub async fn state(&self) -> SessionState {
        if self.is_anonymous() {
            return SessionState::Anonymous;
        }

        match self.token.lock().await.as_ref() {
            Some(token) => SessionState::Authenticated {
                expired: !token.is_valid_at(Instant::now()),
            },
            None => SessionState::HasCredentials,
        }
    }

    /// Fails without touching the network when the session can never authenticate
    pub fn require_authentication(&self, method: &Method, path: &str) -> Result<()> {
        if self.is_anonymous() {
            return Err(Error::UnauthorizedError {
                method: method.to_string(),
                path: path.to_owned(),
            });
        }

        Ok(())
    }

    /// The current session token, authenticating first if there is none or it has expired
    #[tracing::instrument(skip_all)]
    pub async fn ensure_token<A: Authenticator + Sync>(&self, authenticator: &A) -> Result<String> {
        let mut token = self.token.lock().await;

        if let Some(current) = token.as_ref() {
            if current.is_valid_at(Instant::now()) {
                return Ok(current.value.clone());
            }

            tracing::debug!("session token expired");
        }

        let fresh = self.authenticate(authenticator).await?;
        let value = fresh.value.clone();
        *token = Some(fresh);

        Ok(value)
    }

    async fn authenticate<A: Authenticator + Sync>(&self, authenticator: &A) -> Result<SessionToken> {
        let credentials = self.credentials();

        if let Some(refresh_token) = credentials.refresh_token.as_deref() {
            match authenticator.refresh(refresh_token).await {
                Ok(pair) => {
                    if let Some(session) = self.store(pair) {
                        tracing::info!("session token acquired with refresh token");
                        return Ok(SessionToken::new(session));
                    }
                }
                Err(e) if credentials.login_pair().is_some() => {
                    tracing::warn!("refresh token rejected, logging in again: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        let Some((username, password)) = credentials.login_pair() else {
            return Err(auth_failed(super::routes::REFRESH));
        };

        let pair = authenticator.login(&username, &password).await?;
        let issued_refresh = pair.refresh.clone();
        if let Some(session) = self.store(pair) {
            tracing::info!("logged in as {username}");
            return Ok(SessionToken::new(session));
        }

        // login handed out only a refresh token, exchange it
        let Some(refresh_token) = issued_refresh else {
            return Err(auth_failed(super::routes::LOGIN));
        };
        let pair = authenticator.refresh(&refresh_token).await?;
        let Some(session) = self.store(pair) else {
            return Err(auth_failed(super::routes::REFRESH));
        };

        tracing::info!("logged in as {username}");
        Ok(SessionToken::new(session))
    }

    /// Keeps the refresh token from `pair` and returns its session token
    fn store(&self, pair: TokenPair) -> Option<String> {
        if let Some(refresh) = pair.refresh {
            self.credentials.lock().refresh_token = Some(refresh);
        }

        pair.session
    }

    /// Drops the token if it is still the one that was rejected by the server
    pub async fn invalidate(&self, rejected: &str) {
        let mut token = self.token.lock().await;

        if token.as_ref().is_some_and(|current| current.value == rejected) {
            tracing::debug!("session token rejected by server");
            *token = None;
        }
    }

    pub async fn clear_token(&self) {
        *self.token.lock().await = None;
    }

    /// Forgets the session and the refresh token, keeping username and password
    pub async fn logout(&self) {
        self.clear_token().await;
        self.credentials.lock().refresh_token = None;
    }

    #[cfg(test)]
    pub(crate) async fn set_token(&self, token: SessionToken) {
        *self.token.lock().await = Some(token);
    }
}

/// An auth endpoint answered without the token the session needs
fn auth_failed(path: &str) -> Error {
    Error::UnauthorizedError {
        method: Method::POST.to_string(),
        path: path.to_owned(),
    }
}
