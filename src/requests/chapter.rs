use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use super::query_utils::{
    related_ids, serialize_query_date, ContentRating, EntityType, Query, Relationship,
    SortingOptions,
};
use super::registry::Registry;
use super::{Entity, Error};

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChapterAttributes {
    pub title: Option<String>,
    pub volume: Option<String>,
    pub chapter: Option<String>,
    #[serde(default)]
    pub pages: usize,
    pub translated_language: String,
    pub external_url: Option<String>,
    #[serde(default)]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub publish_at: Option<DateTime<Utc>>,
    pub readable_at: Option<DateTime<Utc>>,
}

/// The chapter as the server sends it
#[derive(Deserialize, Debug, Clone)]
pub struct ChapterEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub attributes: ChapterAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// A chapter of a manga. Always has a number or a title (or both).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "ChapterEntity")]
pub struct Chapter {
    pub id: String,
    pub version: u32,
    pub volume: Option<String>,
    pub number: Option<String>,
    pub title: Option<String>,
    pub language: String,
    pub pages: usize,
    pub external_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub publish_at: Option<DateTime<Utc>>,
    pub manga: Option<String>,
    pub groups: Vec<String>,
    pub uploader: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl TryFrom<ChapterEntity> for Chapter {
    type Error = Error;

    fn try_from(entity: ChapterEntity) -> Result<Self, Self::Error> {
        let attributes = entity.attributes;
        let number = non_empty(attributes.chapter);
        let title = non_empty(attributes.title);

        if number.is_none() && title.is_none() {
            return Err(Error::MalformedRecordError {
                id: entity.id,
                entity: EntityType::Chapter,
                reason: "chapter has neither a number nor a title".to_owned(),
            });
        }

        Ok(Self {
            manga: related_ids(&entity.relationships, EntityType::Manga)
                .into_iter()
                .next(),
            groups: related_ids(&entity.relationships, EntityType::ScanlationGroup),
            uploader: related_ids(&entity.relationships, EntityType::User)
                .into_iter()
                .next(),
            id: entity.id,
            version: attributes.version,
            volume: non_empty(attributes.volume),
            number,
            title,
            language: attributes.translated_language,
            pages: attributes.pages,
            external_url: attributes.external_url,
            created_at: attributes.created_at,
            updated_at: attributes.updated_at,
            publish_at: attributes.publish_at,
        })
    }
}

/// First run of digits and dots in `s`, parsed as a number
fn leading_number(s: &str) -> Option<f64> {
    let start = s.find(|c: char| c.is_ascii_digit() || c == '.')?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    digits.parse().ok()
}

impl Chapter {
    /// A readable name built from the volume, number and title, e.g. `Volume 2 Chapter 10: Title`
    pub fn name(&self) -> String {
        let Some(number) = &self.number else {
            return self.title.clone().unwrap_or_default();
        };

        let mut name = String::new();
        if let Some(volume) = &self.volume {
            name.push_str(&format!("Volume {volume} "));
        }

        match number.parse::<f64>() {
            Ok(n) if n.fract() == 0.0 && number.chars().all(|c| c.is_ascii_digit()) => {
                name.push_str(&format!("Chapter {}", n as u64))
            }
            _ => name.push_str(&format!("Chapter {number}")),
        }

        if let Some(title) = &self.title {
            name.push_str(&format!(": {title}"));
        }

        name
    }

    /// The chapter number as a float. Numbers like `12a` or `Extra 3` yield the first
    /// number they contain.
    pub fn numeric_number(&self) -> Option<f64> {
        let number = self.number.as_deref()?;

        number.parse().ok().or_else(|| leading_number(number))
    }

    /// `-1` for chapters without a usable number
    pub fn sorting_number(&self) -> f64 {
        self.numeric_number().unwrap_or(-1.0)
    }

    pub fn volume_number(&self) -> Option<f64> {
        self.volume.as_deref().and_then(|volume| {
            volume.parse().ok().or_else(|| leading_number(volume))
        })
    }

    /// Last modification time, the creation time if the chapter was never updated
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.publish_at.unwrap_or(self.created_at)
    }

    pub fn is_external(&self) -> bool {
        self.external_url.is_some()
    }
}

impl Entity for Chapter {
    const ENTITY_TYPE: EntityType = EntityType::Chapter;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn table(registry: &Registry) -> &RwLock<HashMap<String, Self>> {
        &registry.chapters
    }
}

/// Filters of the `/chapter` listing
#[derive(Serialize, Debug, Clone, Default, bon::Builder)]
#[serde(rename_all = "camelCase")]
pub struct ChapterQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub uploader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub manga: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_language: Option<Vec<String>>,
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
    /// Maximum number of chapters the pager yields
    #[serde(skip)]
    pub limit: Option<usize>,
    #[serde(skip)]
    pub offset: Option<usize>,
}

impl Query for ChapterQuery {}
