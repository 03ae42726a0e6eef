//! Lazy pagination over `offset`/`limit` list endpoints.
//!
//! The first page is fetched when the pager is first polled. Its `total` tells how many more
//! pages exist; all of them are then requested at once in background tasks while the first
//! page is handed out. Pages are still consumed strictly in offset order.

use std::collections::VecDeque;

use async_stream::stream;
use futures::Stream;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use super::{ApiRequest, AuthMode, Entity, Result};
use crate::MangoClient;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Deserialize, Debug)]
struct CollectionPage {
    #[serde(alias = "data", default)]
    results: Vec<Value>,
    #[serde(default)]
    total: usize,
}

/// Items of one page, `None` when the server answered 204
type PageItems<T> = Option<Vec<T>>;

pub struct Pager<T: Entity> {
    client: MangoClient,
    path: String,
    params: Map<String, Value>,
    auth: AuthMode,
    offset: usize,
    page_size: usize,
    limit: Option<usize>,
    buffer: VecDeque<T>,
    pending: VecDeque<JoinHandle<Result<PageItems<T>>>>,
    started: bool,
    exhausted: bool,
    yielded: usize,
}

impl<T: Entity> std::fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("path", &self.path)
            .field("offset", &self.offset)
            .field("page_size", &self.page_size)
            .field("limit", &self.limit)
            .field("buffered", &self.buffer.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[bon::bon]
impl<T: Entity> Pager<T> {
    /// `limit` of `None` or `0` means every item the endpoint has
    #[builder]
    pub fn new(
        client: MangoClient,
        #[builder(into)] path: String,
        #[builder(default)] params: Map<String, Value>,
        #[builder(default)] auth: AuthMode,
        #[builder(default)] offset: usize,
        #[builder(default = DEFAULT_PAGE_SIZE)] page_size: usize,
        limit: Option<usize>,
    ) -> Self {
        let limit = limit.filter(|limit| *limit > 0);
        let mut page_size = page_size.max(1);
        if let Some(limit) = limit {
            page_size = page_size.min(limit);
        }

        Self {
            client,
            path,
            params,
            auth,
            offset,
            page_size,
            limit,
            buffer: VecDeque::new(),
            pending: VecDeque::new(),
            started: false,
            exhausted: false,
            yielded: 0,
        }
    }
}

impl<T: Entity> Pager<T> {
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The next item, `None` once the listing is exhausted
    pub async fn next(&mut self) -> Option<Result<T>> {
        loop {
            if self.limit.is_some_and(|limit| self.yielded >= limit) {
                self.finish();
                return None;
            }

            if let Some(item) = self.buffer.pop_front() {
                self.yielded += 1;
                return Some(Ok(item));
            }

            if !self.started {
                self.started = true;

                if let Err(e) = self.first_page().await {
                    self.finish();
                    return Some(Err(e));
                }

                continue;
            }

            let handle = self.pending.pop_front()?;
            match handle.await {
                Ok(Ok(Some(items))) => self.buffer.extend(items),
                Ok(Ok(None)) => {
                    tracing::debug!(path = %self.path, "no content, ending pagination");
                    self.finish();
                    return None;
                }
                Ok(Err(e)) => {
                    self.finish();
                    return Some(Err(e));
                }
                Err(e) => {
                    self.finish();
                    return Some(Err(e.into()));
                }
            }
        }
    }

    async fn first_page(&mut self) -> Result<()> {
        let response = fetch_page(
            &self.client,
            &self.path,
            &self.params,
            self.auth,
            self.offset,
            self.page_size,
        )
        .await?;

        let Some(page) = response else {
            self.exhausted = true;
            return Ok(());
        };

        self.buffer.extend(decode_items::<T>(&self.client, page.results)?);

        if page.total <= self.offset + self.page_size {
            self.exhausted = true;
            return Ok(());
        }

        let mut wanted = page.total - self.offset;
        if let Some(limit) = self.limit {
            wanted = wanted.min(limit);
        }

        let extra = wanted.saturating_sub(self.page_size).div_ceil(self.page_size);
        tracing::debug!(
            path = %self.path,
            total = page.total,
            extra_pages = extra,
            "fetching remaining pages ahead"
        );

        for i in 0..extra {
            let offset = self.offset + self.page_size * (i + 1);
            let client = self.client.clone();
            let path = self.path.clone();
            let params = self.params.clone();
            let auth = self.auth;
            let page_size = self.page_size;

            self.pending.push_back(tokio::spawn(async move {
                let page = fetch_page(&client, &path, &params, auth, offset, page_size).await?;

                page.map(|page| decode_items::<T>(&client, page.results))
                    .transpose()
            }));
        }

        self.offset += self.page_size * (extra + 1);
        self.exhausted = true;

        Ok(())
    }

    fn finish(&mut self) {
        self.exhausted = true;
        self.buffer.clear();
        for handle in self.pending.drain(..) {
            handle.abort();
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.buffer.is_empty() && self.pending.is_empty()
    }

    /// Drains the pager, failing on the first error
    pub async fn as_list(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }

        Ok(items)
    }

    pub fn into_stream(mut self) -> impl Stream<Item = Result<T>> {
        stream! {
            while let Some(item) = self.next().await {
                yield item;
            }
        }
    }
}

impl<T: Entity> Drop for Pager<T> {
    fn drop(&mut self) {
        for handle in self.pending.drain(..) {
            handle.abort();
        }
    }
}

async fn fetch_page(
    client: &MangoClient,
    path: &str,
    params: &Map<String, Value>,
    auth: AuthMode,
    offset: usize,
    page_size: usize,
) -> Result<Option<CollectionPage>> {
    let mut params = params.clone();
    params.insert("offset".to_owned(), offset.into());
    params.insert("limit".to_owned(), page_size.into());

    let request = ApiRequest::builder()
        .method(Method::GET)
        .path(path)
        .params(params)
        .auth(auth)
        .build();

    let response = client.request(&request).await?;
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    Ok(Some(response.json().await?))
}

fn decode_items<T: Entity>(client: &MangoClient, results: Vec<Value>) -> Result<Vec<T>> {
    results
        .into_iter()
        .map(|item| Ok(client.registry.merge(serde_json::from_value::<T>(item)?)))
        .collect()
}
