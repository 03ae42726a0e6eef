use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;

use std::collections::HashMap;

use super::query_utils::{related_ids, EntityType, Relationship};
use super::registry::Registry;
use super::chapter::ChapterQuery;
use super::chapter_list::ChapterList;
use super::{Entity, Result};
use crate::MangoClient;

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ScanlationGroupAttributes {
    pub name: String,
    #[serde(default)]
    pub alt_names: Vec<HashMap<String, String>>,
    pub website: Option<String>,
    pub discord: Option<String>,
    pub contact_email: Option<String>,
    pub description: Option<String>,
    pub twitter: Option<String>,
    #[serde(default)]
    pub focused_languages: Option<Vec<String>>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub official: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ScanlationGroupEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub attributes: ScanlationGroupAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(from = "ScanlationGroupEntity")]
pub struct ScanlationGroup {
    pub id: String,
    pub version: u32,
    pub name: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub focused_languages: Vec<String>,
    pub official: bool,
    pub verified: bool,
    pub inactive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// User id of the group leader
    pub leader: Option<String>,
    pub members: Vec<String>,
}

impl From<ScanlationGroupEntity> for ScanlationGroup {
    fn from(entity: ScanlationGroupEntity) -> Self {
        let attributes = entity.attributes;

        Self {
            leader: related_ids(&entity.relationships, EntityType::Leader)
                .into_iter()
                .next(),
            members: related_ids(&entity.relationships, EntityType::Member),
            id: entity.id,
            version: attributes.version,
            name: attributes.name,
            website: attributes.website,
            description: attributes.description,
            focused_languages: attributes.focused_languages.unwrap_or_default(),
            official: attributes.official,
            verified: attributes.verified,
            inactive: attributes.inactive,
            created_at: attributes.created_at,
            updated_at: attributes.updated_at,
        }
    }
}

impl Entity for ScanlationGroup {
    const ENTITY_TYPE: EntityType = EntityType::ScanlationGroup;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn table(registry: &Registry) -> &RwLock<HashMap<String, Self>> {
        &registry.groups
    }
}

impl ScanlationGroup {
    /// Chapters released by the group, further narrowed by `query`
    pub async fn load_chapters(&self, client: &MangoClient, query: &ChapterQuery) -> Result<ChapterList> {
        let query = ChapterQuery {
            groups: Some(vec![self.id.clone()]),
            ..query.clone()
        };
        let chapters = client.get_chapters(&query)?.as_list().await?;

        Ok(ChapterList::new(None, chapters))
    }
}
