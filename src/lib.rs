//! Client for the MangaDex catalog API.
//!
//! [MangoClient] keeps every request inside the server's rate limits, logs in when a route
//! needs it and caches the records it has seen. Listings come back as [Pager]s that fetch
//! pages concurrently, chapter feeds as [ChapterList]s that can be filtered and deduplicated.

pub mod config;
pub mod requests;
pub mod utils;

pub use config::ClientConfig;
pub use requests::chapter_list::{ChapterFilter, ChapterList, DuplicateResolutionAlgorithm};
pub use requests::download::DownloadOptions;
pub use requests::pager::Pager;
pub use requests::{ApiRequest, AuthMode, Error, Result};

use requests::ratelimit::RateLimiter;
use requests::registry::Registry;
use requests::session::SessionManager;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use std::sync::Arc;
use std::time::Duration;

/// Cheap to clone, clones share the rate limits, the session and the record cache
#[derive(Clone, Debug)]
pub struct MangoClient {
    pub(crate) client: ClientWithMiddleware,
    pub(crate) base_url: String,
    pub(crate) retries: usize,
    pub(crate) page_size: usize,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) session: Arc<SessionManager>,
    pub(crate) registry: Arc<Registry>,
}

impl MangoClient {
    /// Anonymous client for the public API
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let credentials = config.credentials()?;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let client = ClientBuilder::new(client)
            .with(TracingMiddleware::default())
            .build();

        let session = if credentials.is_empty() {
            SessionManager::anonymous()
        } else {
            SessionManager::new(credentials)
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            retries: config.retries,
            page_size: config.page_size,
            rate_limiter: Arc::new(RateLimiter::with_default_rules()?),
            session: Arc::new(session),
            registry: Arc::new(Registry::default()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}
