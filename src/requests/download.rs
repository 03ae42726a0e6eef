//! Chapter pages through MangaDex@Home.
//!
//! `/at-home/server/{id}` hands out a node and the file names of every page. Nodes can
//! refuse or drop downloads, so a failed chapter is retried with a freshly assigned node.

use bytes::Bytes;
use futures::stream::{self, StreamExt as _, TryStreamExt as _};
use kdam::{tqdm, BarExt as _};
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Map;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::chapter::Chapter;
use super::chapter_list::ChapterList;
use super::manga::Manga;
use super::query_utils::{EntityType, ResponseResultOk as _};
use super::{routes, ApiRequest, AuthMode, Error, Result};
use crate::MangoClient;

static INVALID_FOLDER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F]|\b(?:CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])\b"#)
        .expect("folder name regex is valid")
});

static REPEATED_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("_{2,}").expect("underscore regex is valid"));

pub const DEFAULT_FOLDER_FORMAT: &str = "{manga}/{chapter_num}{separator}{title}";
pub const DEFAULT_FILE_FORMAT: &str = "{num}";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterMeta {
    pub hash: String,
    pub data: Vec<String>,
    pub data_saver: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDownloadMeta {
    pub base_url: String,
    pub chapter: ChapterMeta,
}

impl ChapterDownloadMeta {
    pub fn file_names(&self, data_saver: bool) -> &[String] {
        if data_saver {
            &self.chapter.data_saver
        } else {
            &self.chapter.data
        }
    }

    /// Page urls in reading order. They are only valid for a short time.
    pub fn page_urls(&self, data_saver: bool) -> Vec<String> {
        let quality = if data_saver { "data-saver" } else { "data" };

        self.file_names(data_saver)
            .iter()
            .map(|file| format!("{}/{quality}/{}/{file}", self.base_url, self.chapter.hash))
            .collect()
    }
}

#[derive(Debug, Clone, bon::Builder)]
pub struct DownloadOptions {
    /// Extra attempts with a new node after a failed download
    #[builder(default = 3)]
    pub retries: usize,
    #[builder(default)]
    pub data_saver: bool,
    /// Only use nodes listening on port 443
    #[builder(default)]
    pub ssl_only: bool,
    #[builder(default = 8)]
    pub max_concurrent_pages: usize,
    /// Replace pages that already exist on disk
    #[builder(default = true)]
    pub overwrite: bool,
    /// Show a progress bar for multi chapter downloads
    #[builder(default)]
    pub progress: bool,
    /// Folder of a saved chapter relative to the target directory. Knows `{manga}`,
    /// `{chapter_num}`, `{separator}` (` - ` when the chapter has a number and a title) and `{title}`.
    #[builder(into, default = DEFAULT_FOLDER_FORMAT.to_owned())]
    pub folder_format: String,
    /// Page file name without extension. Knows `{num}` (from 1), `{num0}` (from 0) and `{name}`,
    /// the file name on the server.
    #[builder(into, default = DEFAULT_FILE_FORMAT.to_owned())]
    pub file_format: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Replaces characters that are not allowed in folder names and squashes repeated underscores
pub fn sanitize_folder_name(name: &str) -> String {
    let replaced = INVALID_FOLDER_NAME.replace_all(name.trim(), "_");

    REPEATED_UNDERSCORES.replace_all(&replaced, "_").into_owned()
}

/// Fills `{key}` placeholders of `template`, unknown placeholders are left as they are
fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_owned(), |rendered, (key, value)| {
            rendered.replace(&format!("{{{key}}}"), value)
        })
}

fn chapter_folder(chapter: &Chapter, manga_title: &str, format: &str) -> PathBuf {
    let number = chapter.number.clone().unwrap_or_default();
    let separator = if chapter.number.is_some() && chapter.title.is_some() {
        " - "
    } else {
        ""
    };
    let title = chapter
        .title
        .as_deref()
        .map(sanitize_folder_name)
        .unwrap_or_default();

    PathBuf::from(render(
        format,
        &[
            ("manga", sanitize_folder_name(manga_title).as_str()),
            ("chapter_num", number.as_str()),
            ("separator", separator),
            ("title", title.as_str()),
        ],
    ))
}

/// `num` counts from 1, the extension of `original` is kept
fn page_file_name(format: &str, num: usize, original: &str) -> String {
    let (stem, extension) = match original.rsplit_once('.') {
        Some((stem, extension)) => (stem, Some(extension)),
        None => (original, None),
    };

    let name = render(
        format,
        &[
            ("num", num.to_string().as_str()),
            ("num0", num.saturating_sub(1).to_string().as_str()),
            ("name", stem),
        ],
    );

    match extension {
        Some(extension) => format!("{name}.{extension}"),
        None => name,
    }
}

impl MangoClient {
    /// Asks for a MangaDex@Home node serving the chapter with the given `id`
    #[tracing::instrument(skip(self))]
    pub async fn get_chapter_download_meta(
        &self,
        id: &str,
        ssl_only: bool,
    ) -> Result<ChapterDownloadMeta> {
        let mut params = Map::new();
        if ssl_only {
            params.insert("forcePort443".to_owned(), true.into());
        }

        let request = ApiRequest::builder()
            .path(routes::at_home(id))
            .params(params)
            .build();

        let resp = match self.request_json(&request).await {
            Err(Error::HttpError { status, .. }) if status == StatusCode::NOT_FOUND => {
                return Err(Error::InvalidReferenceError {
                    id: id.to_owned(),
                    entity: EntityType::Chapter,
                })
            }
            resp => resp?,
        };

        if !resp.response_result_ok()? {
            return Err(Error::ParseError);
        }

        Ok(serde_json::from_value(resp)?)
    }

    /// Downloads a single page from a MangaDex@Home node
    #[tracing::instrument(skip(self))]
    pub async fn get_page(&self, url: &str) -> Result<Bytes> {
        let request = ApiRequest::builder().path(url).auth(AuthMode::None).build();

        Ok(self.request(&request).await?.bytes().await?)
    }

    async fn download_pages(&self, chapter_id: &str, options: &DownloadOptions) -> Result<Vec<(String, Bytes)>> {
        let meta = self
            .get_chapter_download_meta(chapter_id, options.ssl_only)
            .await?;

        let names = meta.file_names(options.data_saver).to_vec();
        let urls = meta.page_urls(options.data_saver);

        // `buffered` keeps the page order
        let pages: Vec<Bytes> = stream::iter(urls)
            .map(|url| async move { self.get_page(&url).await })
            .buffered(options.max_concurrent_pages.max(1))
            .try_collect()
            .await?;

        Ok(names.into_iter().zip(pages).collect())
    }

    async fn download_pages_with_retries(
        &self,
        chapter_id: &str,
        options: &DownloadOptions,
    ) -> Result<Vec<(String, Bytes)>> {
        let mut attempt = 0;
        loop {
            match self.download_pages(chapter_id, options).await {
                Ok(pages) => return Ok(pages),
                Err(e) if e.is_transient() && attempt < options.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "downloading chapter {chapter_id} failed, retry {attempt}/{}: {e}",
                        options.retries
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Downloads every page of a chapter, in reading order
    #[tracing::instrument(skip(self, options))]
    pub async fn download_chapter(&self, chapter_id: &str, options: &DownloadOptions) -> Result<Vec<Bytes>> {
        let pages = self.download_pages_with_retries(chapter_id, options).await?;

        Ok(pages.into_iter().map(|(_, page)| page).collect())
    }

    /// Downloads a chapter into `dir`, laid out by the folder and file formats of `options`, and
    /// returns the chapter folder. Page files keep the extension they have on the server.
    #[tracing::instrument(skip(self, chapter, manga, options), fields(chapter = %chapter.id))]
    pub async fn save_chapter(
        &self,
        chapter: &Chapter,
        manga: Option<&Manga>,
        dir: &Path,
        options: &DownloadOptions,
    ) -> Result<PathBuf> {
        let manga_title = match (manga, &chapter.manga) {
            (Some(manga), _) => manga.title(&chapter.language),
            (None, Some(id)) => match self.registry.get::<Manga>(id) {
                Some(manga) => manga.title(&chapter.language),
                None => self.get_manga(id).await?.title(&chapter.language),
            },
            (None, None) => chapter.id.clone(),
        };

        let folder = dir.join(chapter_folder(chapter, &manga_title, &options.folder_format));
        tokio::fs::create_dir_all(&folder).await?;

        let pages = self.download_pages_with_retries(&chapter.id, options).await?;
        for (num, (name, page)) in pages.into_iter().enumerate() {
            let path = folder.join(page_file_name(&options.file_format, num + 1, &name));

            if !options.overwrite && tokio::fs::try_exists(&path).await? {
                tracing::debug!("{} exists, skipping", path.display());
                continue;
            }

            tokio::fs::write(&path, &page).await?;
        }

        tracing::info!("saved chapter to {}", folder.display());

        Ok(folder)
    }
}

impl ChapterList {
    /// Downloads every chapter of the list. Failed chapters map to their error instead of
    /// failing the whole batch.
    #[tracing::instrument(skip_all, fields(chapters = self.len()))]
    pub async fn download_all(
        &self,
        client: &MangoClient,
        options: &DownloadOptions,
    ) -> HashMap<String, Result<Vec<Bytes>>> {
        let mut bar = options.progress.then(|| tqdm!(total = self.len(), desc = "chapters"));

        let mut downloads = stream::iter(self.iter())
            .map(|chapter| async move {
                let pages = client.download_chapter(&chapter.id, options).await;
                (chapter.id.clone(), pages)
            })
            .buffer_unordered(4);

        let mut results = HashMap::new();
        while let Some((id, pages)) = downloads.next().await {
            if let Err(e) = &pages {
                tracing::warn!("chapter {id} could not be downloaded: {e}");
            }
            if let Some(bar) = bar.as_mut() {
                if let Err(e) = bar.update(1) {
                    tracing::debug!("could not draw the progress bar: {e}");
                }
            }

            results.insert(id, pages);
        }

        results
    }
}
