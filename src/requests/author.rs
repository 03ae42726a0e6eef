use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;

use std::collections::HashMap;

use super::query_utils::{deserialize_localized, related_ids, EntityType, Relationship};
use super::registry::Registry;
use super::manga::Manga;
use super::{routes, Entity, Result};
use crate::MangoClient;
use crate::utils::DefaultMap;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthorAttributes {
    pub name: String,
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_localized")]
    pub biography: HashMap<String, String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AuthorEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub attributes: AuthorAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// An author or an artist, both are stored the same way
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "AuthorEntity")]
pub struct Author {
    pub id: String,
    pub version: u32,
    pub name: String,
    pub image: Option<String>,
    pub biographies: DefaultMap<Option<String>>,
    pub twitter: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub mangas: Vec<String>,
}

impl From<AuthorEntity> for Author {
    fn from(entity: AuthorEntity) -> Self {
        let attributes = entity.attributes;

        Self {
            mangas: related_ids(&entity.relationships, EntityType::Manga),
            id: entity.id,
            version: attributes.version,
            name: attributes.name,
            image: attributes.image_url,
            biographies: attributes
                .biography
                .into_iter()
                .map(|(language, biography)| (language, Some(biography)))
                .collect(),
            twitter: attributes.twitter,
            website: attributes.website,
            created_at: attributes.created_at,
            updated_at: attributes.updated_at,
        }
    }
}

impl Entity for Author {
    const ENTITY_TYPE: EntityType = EntityType::Author;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn table(registry: &Registry) -> &RwLock<HashMap<String, Self>> {
        &registry.authors
    }
}

impl Author {
    /// Every manga the author worked on, fetching the ones that are not cached yet
    pub async fn load_mangas(&self, client: &MangoClient) -> Result<Vec<Manga>> {
        client.resolve(routes::MANGA, &self.mangas).await
    }
}
