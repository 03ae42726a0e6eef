use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use super::query_utils::{deserialize_localized, EntityType, Relationship};
use super::registry::Registry;
use super::Entity;
use crate::utils::DefaultMap;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TagGroup {
    Content,
    Format,
    Genre,
    Theme,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TagAttributes {
    #[serde(default, deserialize_with = "deserialize_localized")]
    pub name: HashMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_localized")]
    pub description: HashMap<String, String>,
    pub group: TagGroup,
    #[serde(default)]
    pub version: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TagEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub attributes: TagAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "TagEntity")]
pub struct Tag {
    pub id: String,
    pub version: u32,
    pub names: DefaultMap<Option<String>>,
    pub descriptions: DefaultMap<Option<String>>,
    pub group: TagGroup,
}

fn localized(map: HashMap<String, String>) -> DefaultMap<Option<String>> {
    map.into_iter()
        .map(|(language, value)| (language, Some(value)))
        .collect()
}

impl From<TagEntity> for Tag {
    fn from(entity: TagEntity) -> Self {
        Self {
            id: entity.id,
            version: entity.attributes.version,
            names: localized(entity.attributes.name),
            descriptions: localized(entity.attributes.description),
            group: entity.attributes.group,
        }
    }
}

impl Tag {
    /// Name in `language`, an empty string if the tag has none there
    pub fn name(&self, language: &str) -> String {
        self.names.get(language).unwrap_or_default()
    }
}

impl Entity for Tag {
    const ENTITY_TYPE: EntityType = EntityType::Tag;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn table(registry: &Registry) -> &RwLock<HashMap<String, Self>> {
        &registry.tags
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagsMode {
    And,
    Or,
}
