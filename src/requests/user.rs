use parking_lot::RwLock;
use serde::Deserialize;

use std::collections::HashMap;

use super::query_utils::{related_ids, EntityType, Relationship};
use super::registry::Registry;
use super::chapter::ChapterQuery;
use super::chapter_list::ChapterList;
use super::{Entity, Result};
use crate::MangoClient;

#[derive(Deserialize, Debug, Clone)]
pub struct UserAttributes {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub version: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub attributes: UserAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "UserEntity")]
pub struct User {
    pub id: String,
    pub version: u32,
    pub username: String,
    pub roles: Vec<String>,
    /// Scanlation groups the user belongs to
    pub groups: Vec<String>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            groups: related_ids(&entity.relationships, EntityType::ScanlationGroup),
            id: entity.id,
            version: entity.attributes.version,
            username: entity.attributes.username,
            roles: entity.attributes.roles,
        }
    }
}

impl Entity for User {
    const ENTITY_TYPE: EntityType = EntityType::User;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn table(registry: &Registry) -> &RwLock<HashMap<String, Self>> {
        &registry.users
    }
}

impl User {
    /// Chapters uploaded by the user, further narrowed by `query`
    pub async fn load_chapters(&self, client: &MangoClient, query: &ChapterQuery) -> Result<ChapterList> {
        let query = ChapterQuery {
            uploader: Some(self.id.clone()),
            ..query.clone()
        };
        let chapters = client.get_chapters(&query)?.as_list().await?;

        Ok(ChapterList::new(None, chapters))
    }
}
