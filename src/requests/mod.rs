//! Structs and utilities for making requests to mangadex servers

pub mod aggregate;
pub mod author;
pub mod chapter;
pub mod chapter_list;
pub mod custom_list;
pub mod download;
pub mod manga;
pub mod pager;
pub mod query_utils;
pub mod ratelimit;
pub mod registry;
pub mod routes;
pub mod scanlation_group;
pub mod session;
pub mod tag;
pub mod user;

use crate::MangoClient;
use aggregate::MangaAggregate;
use author::Author;
use chapter::{Chapter, ChapterQuery};
use chapter_list::ChapterList;
use custom_list::CustomList;
use manga::{FollowsQuery, Manga, MangaFeedQuery, MangaQuery};
use pager::Pager;
use query_utils::{EntityType, Query, ResponseResultOk as _};
use registry::Registry;
use scanlation_group::ScanlationGroup;
use session::{Authenticator, SessionState, TokenPair};
use tag::Tag;
use user::User;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use std::collections::HashMap;
use std::time::Duration;

/// Used to deserialize errors returned from server
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ServerResponseError {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    pub title: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
}

impl std::fmt::Display for ServerResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }

        match &self.context {
            None | Some(Value::Null) => Ok(()),
            Some(Value::String(context)) => write!(f, " ({context})"),
            Some(context) => write!(f, " ({context})"),
        }
    }
}

/// Custom error type that contains all errors that this can be emitted by this crate's functions
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error(transparent)]
    RequestWithMiddleWareError(#[from] reqwest_middleware::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    QsError(#[from] serde_qs::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    RegexError(#[from] regex::Error),
    #[error(transparent)]
    JoinError(#[from] tokio::task::JoinError),
    #[error("error while parsing json value")]
    ParseError,
    #[error("{method} {path} requires an authenticated session")]
    UnauthorizedError { method: String, path: String },
    #[error("Ratelimited for {:.3} seconds on {path}", seconds_until(.reset))]
    RateLimitError {
        path: String,
        remaining: u32,
        reset: DateTime<Utc>,
    },
    #[error("{message}")]
    HttpError {
        status: StatusCode,
        message: String,
        errors: Vec<ServerResponseError>,
    },
    #[error("no {entity:?} with id {id}")]
    InvalidReferenceError { id: String, entity: EntityType },
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),
    #[error("{0} is not supported by the API")]
    NotSupportedError(String),
    #[error("malformed {entity:?} record {id}: {reason}")]
    MalformedRecordError {
        id: String,
        entity: EntityType,
        reason: String,
    },
}

fn seconds_until(reset: &DateTime<Utc>) -> f64 {
    (*reset - Utc::now()).num_milliseconds().max(0) as f64 / 1000.0
}

impl Error {
    /// Failures worth another attempt: transport problems and server side errors
    pub fn is_transient(&self) -> bool {
        match self {
            Error::ReqwestError(_) | Error::RequestWithMiddleWareError(_) => true,
            Error::HttpError { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::UnauthorizedError { .. } => Some(StatusCode::UNAUTHORIZED),
            Error::RateLimitError { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            Error::ReqwestError(e) => e.status(),
            _ => None,
        }
    }
}

/// Type alias for the [`Result`](std::result::Result) that is used in the crate's functions
pub type Result<T> = std::result::Result<T, Error>;

/// [Entity] is implemented for all structs that represent Entity types in terms used by mangadex servers.
/// Every entity has an id and a version and is kept in the client's [Registry].
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    const ENTITY_TYPE: EntityType;

    fn id(&self) -> &str;

    fn version(&self) -> u32;

    /// The registry table this kind of entity lives in
    fn table(registry: &Registry) -> &RwLock<HashMap<String, Self>>;

    /// Registers entities embedded in this one, e.g. the tags of a manga
    fn register_related(&self, _registry: &Registry) {}
}

/// How a request deals with the session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Never attach a token
    None,
    /// Attach a token when the client has credentials
    #[default]
    Optional,
    /// Fail without a network call when the client is anonymous
    Required,
}

#[derive(Debug, Clone, bon::Builder)]
pub struct ApiRequest {
    #[builder(default = Method::GET)]
    pub method: Method,
    /// Route relative to the base url, or an absolute url
    #[builder(into)]
    pub path: String,
    pub params: Option<Map<String, Value>>,
    pub body: Option<Value>,
    #[builder(default)]
    pub auth: AuthMode,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::builder().path(path).build()
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::builder()
            .method(Method::POST)
            .path(path)
            .body(body)
            .build()
    }
}

/// Only idempotent reads that never got an answer are sent again
fn is_retryable(request: &ApiRequest, error: &Error) -> bool {
    if request.method != Method::GET {
        return false;
    }

    match error {
        Error::RequestWithMiddleWareError(reqwest_middleware::Error::Reqwest(e))
        | Error::ReqwestError(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}

/// Joins server errors into a single message
fn compose_error_message(status: StatusCode, errors: &[ServerResponseError]) -> String {
    let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();

    format!("HTTP {}: {}", status.as_u16(), lines.join("\n"))
}

impl MangoClient {
    pub const BASE_URL: &str = "https://api.mangadex.org";

    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else {
            format!("{}{path}", self.base_url)
        }
    }

    /// Route of `url` relative to the base url, `None` when it points at another host
    fn api_path(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(self.base_url.as_str())?;
        if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')) {
            return None;
        }

        let path = rest.split(['?', '#']).next().unwrap_or_default();
        if path.is_empty() {
            Some("/".to_owned())
        } else {
            Some(path.to_owned())
        }
    }

    /// Sends one attempt of `request` to `url`
    async fn send(&self, request: &ApiRequest, url: &str, token: Option<&str>) -> Result<Response> {
        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body)?);
        }

        Ok(builder.send().await?)
    }

    /// Rate limited send without any session handling. Transport failures of GET requests are
    /// retried, every attempt is charged to the rate limiter.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        url: &str,
        api_path: Option<&str>,
        token: Option<&str>,
    ) -> Result<Response> {
        let url = match &request.params {
            Some(params) if !params.is_empty() => {
                format!("{url}?{}", serde_qs::to_string(params)?)
            }
            _ => url.to_owned(),
        };

        let mut attempt = 0;
        loop {
            if let Some(api_path) = api_path {
                self.rate_limiter.acquire(&request.method, api_path).await;
            }

            match self.send(request, &url, token).await {
                Ok(resp) => {
                    if let Some(api_path) = api_path {
                        self.rate_limiter
                            .reconcile(&request.method, api_path, resp.headers())
                            .await;
                    }

                    return Ok(resp);
                }
                Err(e) if attempt < self.retries && is_retryable(request, &e) => {
                    attempt += 1;
                    tracing::warn!("transport error on {url}, retry {attempt}/{}: {e}", self.retries);
                    tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Turns a 429 or an error status into the matching [Error]
    async fn response_error(request: &ApiRequest, url: &str, path: &str, resp: Response) -> Error {
        let status = resp.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let budget = ratelimit::ServerBudget::from_headers(resp.headers());
            let error = Error::RateLimitError {
                path: path.to_owned(),
                remaining: budget.map_or(0, |budget| budget.remaining),
                reset: budget
                    .and_then(|budget| budget.retry_after)
                    .unwrap_or_else(Utc::now),
            };
            tracing::warn!("{error}");

            return error;
        }

        if status == StatusCode::UNAUTHORIZED {
            return Error::UnauthorizedError {
                method: request.method.to_string(),
                path: path.to_owned(),
            };
        }

        let errors = match resp.json::<Value>().await {
            Ok(mut body) => body
                .get_mut("errors")
                .map(Value::take)
                .and_then(|errors| serde_json::from_value::<Vec<ServerResponseError>>(errors).ok())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let message = if errors.is_empty() {
            format!(
                "HTTP {}: HTTP Error on {} for {url}.",
                status.as_u16(),
                request.method
            )
        } else {
            compose_error_message(status, &errors)
        };

        tracing::warn!("got an error from server: {message}");

        Error::HttpError {
            status,
            message,
            errors,
        }
    }

    /// Lowest level function that executes an arbitrary [ApiRequest] and returns its response.
    ///
    /// Attaches the session token, waits for the rate limiter and replays the request once
    /// after re-authenticating when the server rejects the token.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn request(&self, request: &ApiRequest) -> Result<Response> {
        let url = self.resolve_url(&request.path);
        let api_path = self.api_path(&url);
        let path = api_path.clone().unwrap_or_else(|| url.clone());

        if request.auth == AuthMode::Required {
            self.session.require_authentication(&request.method, &path)?;
        }

        let mut replayed = false;
        loop {
            let token = match request.auth {
                AuthMode::Optional | AuthMode::Required
                    if api_path.is_some() && !self.session.is_anonymous() =>
                {
                    Some(self.session.ensure_token(self).await?)
                }
                _ => None,
            };

            let resp = self
                .dispatch(request, &url, api_path.as_deref(), token.as_deref())
                .await?;
            let status = resp.status();

            if status.is_success() || status.is_redirection() {
                return Ok(resp);
            }

            if status == StatusCode::UNAUTHORIZED {
                if let Some(token) = token.filter(|_| !replayed) {
                    tracing::debug!("session token rejected, re-authenticating");
                    self.session.invalidate(&token).await;
                    replayed = true;
                    continue;
                }
            }

            return Err(Self::response_error(request, &url, &path, resp).await);
        }
    }

    /// Executes the request and parses the body as json
    pub async fn request_json(&self, request: &ApiRequest) -> Result<Value> {
        Ok(self.request(request).await?.json().await?)
    }

    /// Deserializes the `data` of a successful response
    pub fn parse_respond_data<T: DeserializeOwned>(mut resp: Value) -> Result<T> {
        if !resp.response_result_ok()? {
            let errors: Vec<ServerResponseError> = match resp.get_mut("errors") {
                Some(errors) => serde_json::from_value(errors.take())?,
                None => return Err(Error::ParseError),
            };

            return Err(Error::HttpError {
                status: StatusCode::OK,
                message: compose_error_message(StatusCode::OK, &errors),
                errors,
            });
        }

        match resp.get_mut("data") {
            Some(data) => Ok(serde_json::from_value(data.take())?),
            None => Err(Error::ParseError),
        }
    }

    /// Fetches a single entity, mapping a 404 onto [Error::InvalidReferenceError]
    async fn fetch_entity<T: Entity>(&self, path: String, id: &str) -> Result<T> {
        let request = ApiRequest::get(path);

        let resp = match self.request_json(&request).await {
            Err(Error::HttpError { status, .. }) if status == StatusCode::NOT_FOUND => {
                return Err(Error::InvalidReferenceError {
                    id: id.to_owned(),
                    entity: T::ENTITY_TYPE,
                })
            }
            resp => resp?,
        };

        Ok(self.registry.merge(Self::parse_respond_data::<T>(resp)?))
    }

    /// A [Pager] over a listing endpoint, the page size comes from the client config
    pub fn pager<T: Entity>(
        &self,
        path: impl Into<String>,
        query: &impl Query,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Pager<T>> {
        Ok(Pager::builder()
            .client(self.clone())
            .path(path)
            .params(query.to_params()?)
            .offset(offset.unwrap_or_default())
            .page_size(self.page_size)
            .maybe_limit(limit)
            .build())
    }

    #[tracing::instrument(skip(self))]
    pub async fn ping(&self) -> Result<()> {
        let request = ApiRequest::builder()
            .path(routes::PING)
            .auth(AuthMode::None)
            .build();

        let body = self.request(&request).await?.text().await?;
        if body.trim() != "pong" {
            tracing::warn!("unexpected ping response: {body}");
            return Err(Error::ParseError);
        }

        Ok(())
    }

    /// Authenticates right away instead of on the first request that needs a token
    #[tracing::instrument(skip(self))]
    pub async fn login(&self) -> Result<()> {
        self.session.require_authentication(&Method::POST, routes::LOGIN)?;
        self.session.ensure_token(self).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let request = ApiRequest::builder()
            .method(Method::POST)
            .path(routes::LOGOUT)
            .auth(AuthMode::Required)
            .build();

        self.request(&request).await?;
        self.session.logout().await;

        Ok(())
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    /// Queries for the manga with the given `id`
    #[tracing::instrument(skip(self))]
    pub async fn get_manga(&self, id: &str) -> Result<Manga> {
        self.fetch_entity(routes::manga(id), id).await
    }

    /// Searches for manga with parameters specified by `query`
    #[tracing::instrument(skip(self))]
    pub fn search_manga(&self, query: &MangaQuery) -> Result<Pager<Manga>> {
        self.pager(routes::MANGA, query, query.offset, query.limit)
    }

    /// Shorthand for searching manga just by name
    pub fn search_manga_by_name(&self, name: &str) -> Result<Pager<Manga>> {
        self.search_manga(&MangaQuery::builder().title(name).build())
    }

    #[tracing::instrument(skip(self))]
    pub async fn random_manga(&self) -> Result<Manga> {
        let resp = self.request_json(&ApiRequest::get(routes::RANDOM_MANGA)).await?;

        Ok(self.registry.merge(Self::parse_respond_data::<Manga>(resp)?))
    }

    /// Queries for the feed of the manga with the given `id` and parameters specified by `query`
    #[tracing::instrument(skip(self))]
    pub fn manga_feed(&self, id: &str, query: &MangaFeedQuery) -> Result<Pager<Chapter>> {
        self.pager(routes::manga_feed(id), query, query.offset, query.limit)
    }

    /// The whole feed of the manga collected into a [ChapterList]
    #[tracing::instrument(skip(self))]
    pub async fn manga_chapters(&self, id: &str, query: &MangaFeedQuery) -> Result<ChapterList> {
        let chapters = self.manga_feed(id, query)?.as_list().await?;

        Ok(ChapterList::new(Some(id.to_owned()), chapters))
    }

    /// Volumes and chapters of the manga, optionally restricted to some languages
    #[tracing::instrument(skip(self))]
    pub async fn get_manga_aggregate(&self, id: &str, languages: &[String]) -> Result<MangaAggregate> {
        let mut params = Map::new();
        if !languages.is_empty() {
            params.insert("translatedLanguage".to_owned(), json!(languages));
        }

        let request = ApiRequest::builder()
            .path(routes::manga_aggregate(id))
            .params(params)
            .build();

        let mut resp = match self.request_json(&request).await {
            Err(Error::HttpError { status, .. }) if status == StatusCode::NOT_FOUND => {
                return Err(Error::InvalidReferenceError {
                    id: id.to_owned(),
                    entity: EntityType::Manga,
                })
            }
            resp => resp?,
        };

        if !resp.response_result_ok()? {
            return Err(Error::ParseError);
        }

        match resp.get_mut("volumes") {
            Some(volumes) => MangaAggregate::from_value(volumes.take()),
            None => Err(Error::ParseError),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_chapter(&self, id: &str) -> Result<Chapter> {
        self.fetch_entity(routes::chapter(id), id).await
    }

    #[tracing::instrument(skip(self))]
    pub fn get_chapters(&self, query: &ChapterQuery) -> Result<Pager<Chapter>> {
        self.pager(routes::CHAPTER, query, query.offset, query.limit)
    }

    /// Queries for the info about the scanlation group with the specified `id`
    #[tracing::instrument(skip(self))]
    pub async fn get_scanlation_group(&self, id: &str) -> Result<ScanlationGroup> {
        self.fetch_entity(routes::group(id), id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.fetch_entity(routes::user(id), id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_author(&self, id: &str) -> Result<Author> {
        self.fetch_entity(routes::author(id), id).await
    }

    /// Queries for available tags and refreshes the tag cache with them
    #[tracing::instrument(skip(self))]
    pub async fn get_tags(&self) -> Result<Vec<Tag>> {
        let resp = self.request_json(&ApiRequest::get(routes::TAGS)).await?;
        let tags: Vec<Tag> = Self::parse_respond_data(resp)?;

        Ok(tags.into_iter().map(|tag| self.registry.merge(tag)).collect())
    }

    /// Tag cache lookup, fetching the tag list once if it is empty
    pub async fn tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        if self.registry.tags().is_empty() {
            self.get_tags().await?;
        }

        Ok(self
            .registry
            .tags()
            .into_iter()
            .find(|tag| tag.names.languages().any(|lang| tag.name(lang).eq_ignore_ascii_case(name))))
    }

    /// Hydrates many entities through the `ids[]` filter of a listing endpoint
    async fn batch<T: Entity>(&self, path: &str, ids: &[String]) -> Result<Vec<T>> {
        let requests = ids.chunks(pager::DEFAULT_PAGE_SIZE).map(|chunk| {
            let mut params = Map::new();
            params.insert("ids".to_owned(), json!(chunk));

            Pager::<T>::builder()
                .client(self.clone())
                .path(path)
                .params(params)
                .page_size(chunk.len())
                .limit(chunk.len())
                .build()
                .as_list()
        });

        let found: Vec<T> = futures::future::try_join_all(requests)
            .await?
            .into_iter()
            .flatten()
            .collect();

        if found.len() < ids.len() {
            tracing::warn!(
                "asked for {} {:?} records, server knows {}",
                ids.len(),
                T::ENTITY_TYPE,
                found.len()
            );
        }

        Ok(found)
    }

    /// Records for `ids` in the given order, fetching the ones that are not cached yet
    pub(crate) async fn resolve<T: Entity>(&self, path: &str, ids: &[String]) -> Result<Vec<T>> {
        let missing = self.registry.missing::<T>(ids);
        if !missing.is_empty() {
            self.batch::<T>(path, &missing).await?;
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.registry.get::<T>(id))
            .collect())
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn batch_mangas(&self, ids: &[String]) -> Result<Vec<Manga>> {
        self.batch(routes::MANGA, ids).await
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn batch_chapters(&self, ids: &[String]) -> Result<Vec<Chapter>> {
        self.batch(routes::CHAPTER, ids).await
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn batch_groups(&self, ids: &[String]) -> Result<Vec<ScanlationGroup>> {
        self.batch(routes::GROUP, ids).await
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn batch_users(&self, ids: &[String]) -> Result<Vec<User>> {
        self.batch(routes::USER, ids).await
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn batch_authors(&self, ids: &[String]) -> Result<Vec<Author>> {
        self.batch(routes::AUTHOR, ids).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_custom_list(&self, id: &str) -> Result<CustomList> {
        self.fetch_entity(routes::list(id), id).await
    }

    /// Manga the logged in user follows
    #[tracing::instrument(skip(self))]
    pub fn followed_mangas(&self, query: &FollowsQuery) -> Result<Pager<Manga>> {
        self.session
            .require_authentication(&Method::GET, routes::FOLLOWED_MANGA)?;

        Ok(Pager::builder()
            .client(self.clone())
            .path(routes::FOLLOWED_MANGA)
            .params(query.to_params()?)
            .auth(AuthMode::Required)
            .offset(query.offset.unwrap_or_default())
            .page_size(self.page_size)
            .maybe_limit(query.limit)
            .build())
    }

    /// Chapters of every manga the logged in user follows
    #[tracing::instrument(skip(self))]
    pub fn followed_manga_feed(&self, query: &MangaFeedQuery) -> Result<Pager<Chapter>> {
        self.session
            .require_authentication(&Method::GET, routes::FOLLOWED_MANGA_FEED)?;

        Ok(Pager::builder()
            .client(self.clone())
            .path(routes::FOLLOWED_MANGA_FEED)
            .params(query.to_params()?)
            .auth(AuthMode::Required)
            .offset(query.offset.unwrap_or_default())
            .page_size(self.page_size)
            .maybe_limit(query.limit)
            .build())
    }

    async fn token_request(&self, path: &str, body: Value) -> Result<TokenPair> {
        let request = ApiRequest::builder()
            .method(Method::POST)
            .path(path)
            .body(body)
            .auth(AuthMode::None)
            .build();

        let url = self.resolve_url(path);
        let resp = self.dispatch(&request, &url, Some(path), None).await?;
        if !resp.status().is_success() {
            return Err(Self::response_error(&request, &url, path, resp).await);
        }

        let mut body: Value = resp.json().await?;
        if !body.response_result_ok()? {
            return Err(Error::UnauthorizedError {
                method: Method::POST.to_string(),
                path: path.to_owned(),
            });
        }

        match body.get_mut("token") {
            Some(token) => Ok(serde_json::from_value(token.take())?),
            None => Err(Error::ParseError),
        }
    }
}

impl Authenticator for MangoClient {
    async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        tracing::info!("logging in as {username}");

        self.token_request(
            routes::LOGIN,
            json!({ "username": username, "password": password }),
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        tracing::debug!("exchanging refresh token for a session token");

        self.token_request(routes::REFRESH, json!({ "token": refresh_token }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_joined() {
        let errors = vec![
            ServerResponseError {
                id: None,
                status: Some(400),
                title: "Bad request".to_owned(),
                detail: Some("limit must be at most 100".to_owned()),
                context: None,
            },
            ServerResponseError {
                id: None,
                status: Some(400),
                title: "Bad request".to_owned(),
                detail: Some("offset is invalid".to_owned()),
                context: Some(json!("offset")),
            },
        ];

        assert_eq!(
            compose_error_message(StatusCode::BAD_REQUEST, &errors),
            "HTTP 400: Bad request: limit must be at most 100\nBad request: offset is invalid (offset)"
        );
    }

    #[test]
    fn data_of_failed_response_is_not_parsed() {
        let resp = json!({
            "result": "error",
            "errors": [{ "title": "Forbidden", "detail": "nope" }]
        });

        match MangoClient::parse_respond_data::<Value>(resp) {
            Err(Error::HttpError { errors, .. }) => assert_eq!(errors[0].title, "Forbidden"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_envelope_becomes_http_error() {
        let resp = json!({
            "result": "error",
            "errors": [
                { "id": "e1", "status": 400, "title": "Bad request", "detail": "limit is too large" },
                { "title": "Bad request", "detail": "offset is invalid", "context": "offset" }
            ]
        });

        match MangoClient::parse_respond_data::<Value>(resp) {
            Err(Error::HttpError {
                status,
                message,
                errors,
            }) => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(errors.len(), 2);
                assert_eq!(
                    message,
                    "HTTP 200: Bad request: limit is too large\nBad request: offset is invalid (offset)"
                );
            }
            other => panic!("unexpected {other:?}"),
        }

        let without_errors = json!({ "result": "error" });
        assert!(matches!(
            MangoClient::parse_respond_data::<Value>(without_errors),
            Err(Error::ParseError)
        ));

        let ok = json!({ "result": "ok", "data": [1, 2] });
        assert_eq!(
            MangoClient::parse_respond_data::<Vec<u32>>(ok).unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn only_get_transport_failures_are_retried() {
        let get = ApiRequest::get("/manga");
        let post = ApiRequest::post("/manga", json!({}));

        assert!(!is_retryable(&get, &Error::ParseError));
        assert!(!is_retryable(&post, &Error::ParseError));
    }

    #[test]
    fn urls_of_other_hosts_are_not_api_paths() {
        let client = MangoClient::new().unwrap();

        assert_eq!(
            client.api_path("https://api.mangadex.org/manga/abc?limit=1").as_deref(),
            Some("/manga/abc")
        );
        assert_eq!(client.api_path("https://api.mangadex.org.evil.com/manga"), None);
        assert_eq!(client.api_path("https://uploads.mangadex.org/data/x/1.png"), None);
        assert_eq!(client.resolve_url("/ping"), "https://api.mangadex.org/ping");
    }

    #[test]
    fn rate_limit_message() {
        let error = Error::RateLimitError {
            path: "/manga".to_owned(),
            remaining: 0,
            reset: Utc::now() - chrono::Duration::seconds(5),
        };

        assert_eq!(error.to_string(), "Ratelimited for 0.000 seconds on /manga");
    }
}
