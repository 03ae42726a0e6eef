use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use super::query_utils::{
    deserialize_localized, related_ids, serialize_query_date, ContentRating, EntityType, MangaStatus,
    PublicationDemographic, Query, Relationship, SortingOptions,
};
use super::registry::Registry;
use super::tag::{Tag, TagsMode};
use super::author::Author;
use super::{routes, Entity, Result};
use crate::MangoClient;
use crate::utils::{DefaultMap, TitleList};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, std::hash::Hash, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum MangaLinkSource {
    Al,
    Ap,
    Bw,
    Mu,
    Nu,
    Kt,
    Amz,
    Ebj,
    Mal,
    Cdj,
    Raw,
    Engtl,
}

impl MangaLinkSource {
    /// Full url of an id stored under this source. `Raw`, `Engtl`, `Amz`, `Ebj` and `Cdj` already hold urls.
    pub fn url(self, id: &str) -> String {
        match self {
            Self::Al => format!("https://anilist.co/manga/{id}"),
            Self::Ap => format!("https://www.anime-planet.com/manga/{id}"),
            Self::Bw => format!("https://bookwalker.jp/{id}"),
            Self::Mu => format!("https://www.mangaupdates.com/series.html?id={id}"),
            Self::Nu => format!("https://www.novelupdates.com/series/{id}"),
            Self::Kt => format!("https://kitsu.io/manga/{id}"),
            Self::Mal => format!("https://myanimelist.net/manga/{id}"),
            Self::Amz | Self::Ebj | Self::Cdj | Self::Raw | Self::Engtl => id.to_owned(),
        }
    }
}

pub type MangaLinks = HashMap<MangaLinkSource, String>;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MangaAttributes {
    #[serde(default, deserialize_with = "deserialize_localized")]
    pub title: HashMap<String, String>,
    #[serde(default)]
    pub alt_titles: Vec<HashMap<String, String>>,
    #[serde(default, deserialize_with = "deserialize_localized")]
    pub description: HashMap<String, String>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub links: Option<MangaLinks>,
    pub original_language: String,
    pub last_volume: Option<String>,
    pub last_chapter: Option<String>,
    pub publication_demographic: Option<PublicationDemographic>,
    pub status: Option<MangaStatus>,
    pub year: Option<i32>,
    pub content_rating: Option<ContentRating>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MangaEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub attributes: MangaAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "MangaEntity")]
pub struct Manga {
    pub id: String,
    pub version: u32,
    /// Main and alternative titles, grouped by language
    pub titles: DefaultMap<TitleList>,
    pub descriptions: DefaultMap<Option<String>>,
    pub locked: bool,
    pub links: MangaLinks,
    pub original_language: String,
    pub last_volume: Option<String>,
    pub last_chapter: Option<String>,
    pub demographic: Option<PublicationDemographic>,
    pub status: Option<MangaStatus>,
    pub year: Option<i32>,
    pub content_rating: Option<ContentRating>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub authors: Vec<String>,
    pub artists: Vec<String>,
}

impl From<MangaEntity> for Manga {
    fn from(entity: MangaEntity) -> Self {
        let attributes = entity.attributes;

        let mut titles: DefaultMap<TitleList> = DefaultMap::new();
        let alt_titles = attributes.alt_titles.into_iter().flatten();
        for (language, title) in attributes.title.into_iter().chain(alt_titles) {
            titles.entry_mut(&language).push(title);
        }

        let descriptions = attributes
            .description
            .into_iter()
            .map(|(language, description)| (language, Some(description)))
            .collect();

        Self {
            authors: related_ids(&entity.relationships, EntityType::Author),
            artists: related_ids(&entity.relationships, EntityType::Artist),
            id: entity.id,
            version: attributes.version,
            titles,
            descriptions,
            locked: attributes.is_locked,
            links: attributes.links.unwrap_or_default(),
            original_language: attributes.original_language,
            last_volume: attributes.last_volume,
            last_chapter: attributes.last_chapter,
            demographic: attributes.publication_demographic,
            status: attributes.status,
            year: attributes.year,
            content_rating: attributes.content_rating,
            tags: attributes.tags,
            created_at: attributes.created_at,
            updated_at: attributes.updated_at,
        }
    }
}

impl Manga {
    /// Primary title in `language`, falling back to any language and finally to the id
    pub fn title(&self, language: &str) -> String {
        let titles = self.titles.get(language);

        titles
            .primary()
            .or_else(|| self.titles.first().and_then(TitleList::primary))
            .unwrap_or(&self.id)
            .to_owned()
    }

    pub fn link(&self, source: MangaLinkSource) -> Option<String> {
        self.links.get(&source).map(|id| source.url(id))
    }

    /// Authors followed by artists, each person once
    pub async fn load_authors(&self, client: &MangoClient) -> Result<Vec<Author>> {
        let mut ids = self.authors.clone();
        for id in &self.artists {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }

        client.resolve(routes::AUTHOR, &ids).await
    }
}

impl Entity for Manga {
    const ENTITY_TYPE: EntityType = EntityType::Manga;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn table(registry: &Registry) -> &RwLock<HashMap<String, Self>> {
        &registry.mangas
    }

    fn register_related(&self, registry: &Registry) {
        for tag in &self.tags {
            registry.merge(tag.clone());
        }
    }
}

/// Filters of the `/manga` search
#[derive(Serialize, Debug, Clone, Default, bon::Builder)]
#[serde(rename_all = "camelCase")]
pub struct MangaQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artists: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included_tags_mode: Option<TagsMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_tags_mode: Option<TagsMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<MangaStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_translated_language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_demographic: Option<Vec<PublicationDemographic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_rating: Option<Vec<ContentRating>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_query_date"
    )]
    pub created_at_since: Option<DateTime<Utc>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_query_date"
    )]
    pub updated_at_since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortingOptions>,
    /// Maximum number of results the pager yields
    #[serde(skip)]
    pub limit: Option<usize>,
    #[serde(skip)]
    pub offset: Option<usize>,
}

impl Query for MangaQuery {}

/// Filters of a manga feed
#[derive(Serialize, Debug, Clone, Default, bon::Builder)]
#[serde(rename_all = "camelCase")]
pub struct MangaFeedQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_original_language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_rating: Option<Vec<ContentRating>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_uploaders: Option<Vec<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_query_date"
    )]
    pub created_at_since: Option<DateTime<Utc>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_query_date"
    )]
    pub updated_at_since: Option<DateTime<Utc>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_query_date"
    )]
    pub publish_at_since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortingOptions>,
    #[serde(skip)]
    pub limit: Option<usize>,
    #[serde(skip)]
    pub offset: Option<usize>,
}

impl Query for MangaFeedQuery {}

/// Paging of the followed manga listing
#[derive(Serialize, Debug, Clone, Default, bon::Builder)]
pub struct FollowsQuery {
    #[serde(skip)]
    pub limit: Option<usize>,
    #[serde(skip)]
    pub offset: Option<usize>,
}

impl Query for FollowsQuery {}
