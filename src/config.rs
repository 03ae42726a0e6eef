//! Client configuration, from code, the environment or a json file

use serde::Deserialize;

use std::path::Path;

use crate::requests::session::Credentials;
use crate::requests::{pager::DEFAULT_PAGE_SIZE, Error, Result};
use crate::MangoClient;

pub const USERNAME_VAR: &str = "MANGO_USERNAME";
pub const PASSWORD_VAR: &str = "MANGO_PASSWORD";
pub const REFRESH_TOKEN_VAR: &str = "MANGO_REFRESH_TOKEN";
pub const ANONYMOUS_VAR: &str = "MANGO_ANONYMOUS";

fn default_base_url() -> String {
    MangoClient::BASE_URL.to_owned()
}

fn default_user_agent() -> String {
    format!("mango-dex/{}", env!("CARGO_PKG_VERSION"))
}

fn default_retries() -> usize {
    3
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Deserialize, Debug, Clone, PartialEq, bon::Builder)]
#[serde(default)]
pub struct ClientConfig {
    #[builder(into, default = default_base_url())]
    pub base_url: String,
    #[builder(into, default = default_user_agent())]
    pub user_agent: String,
    #[builder(into)]
    pub username: Option<String>,
    #[builder(into)]
    pub password: Option<String>,
    #[builder(into)]
    pub refresh_token: Option<String>,
    /// Never authenticate, even when credentials are present
    #[builder(default)]
    pub anonymous: bool,
    /// Extra attempts for GET requests that failed on the transport level
    #[builder(default = default_retries())]
    pub retries: usize,
    #[builder(default = default_page_size())]
    pub page_size: usize,
    /// Per-request timeout in milliseconds, a timed out GET counts as a transport failure
    #[builder(default = default_timeout_ms())]
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfig {
    /// Defaults plus credentials taken from `MANGO_USERNAME`, `MANGO_PASSWORD`,
    /// `MANGO_REFRESH_TOKEN` and `MANGO_ANONYMOUS`
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            var(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let anonymous = read(ANONYMOUS_VAR)
            .is_some_and(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"));

        Self::builder()
            .maybe_username(read(USERNAME_VAR))
            .maybe_password(read(PASSWORD_VAR))
            .maybe_refresh_token(read(REFRESH_TOKEN_VAR))
            .anonymous(anonymous)
            .build()
    }

    /// Reads a json object, missing keys keep their defaults
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        Ok(serde_json::from_str(&content)?)
    }

    /// The credentials a session should start with. Anonymous configs have none.
    pub fn credentials(&self) -> Result<Credentials> {
        if self.anonymous {
            return Ok(Credentials::default());
        }

        Credentials::new(
            self.username.clone(),
            self.password.clone(),
            self.refresh_token.clone(),
        )
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > DEFAULT_PAGE_SIZE {
            return Err(Error::ConfigurationError(format!(
                "page size must be between 1 and {DEFAULT_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }

        if self.timeout_ms == 0 {
            return Err(Error::ConfigurationError(
                "timeout must be positive".to_owned(),
            ));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::ConfigurationError(format!(
                "base url must be an http(s) url, got {}",
                self.base_url
            )));
        }

        Ok(())
    }
}
