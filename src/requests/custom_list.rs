use parking_lot::RwLock;
use serde::Deserialize;

use std::collections::HashMap;

use super::manga::Manga;
use super::query_utils::{related_ids, EntityType, Relationship};
use super::registry::Registry;
use super::{Entity, Result};
use crate::MangoClient;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CustomListAttributes {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub version: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CustomListEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub attributes: CustomListAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// A user curated list of manga
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "CustomListEntity")]
pub struct CustomList {
    pub id: String,
    pub version: u32,
    pub name: String,
    pub visibility: Visibility,
    pub mangas: Vec<String>,
    pub owner: Option<String>,
}

impl From<CustomListEntity> for CustomList {
    fn from(entity: CustomListEntity) -> Self {
        Self {
            mangas: related_ids(&entity.relationships, EntityType::Manga),
            owner: related_ids(&entity.relationships, EntityType::User)
                .into_iter()
                .next(),
            id: entity.id,
            version: entity.attributes.version,
            name: entity.attributes.name,
            visibility: entity.attributes.visibility,
        }
    }
}

impl Entity for CustomList {
    const ENTITY_TYPE: EntityType = EntityType::CustomList;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn table(registry: &Registry) -> &RwLock<HashMap<String, Self>> {
        &registry.custom_lists
    }
}

impl CustomList {
    /// Every manga of the list, fetching the ones that are not cached yet
    pub async fn load_mangas(&self, client: &MangoClient) -> Result<Vec<Manga>> {
        client.resolve(super::routes::MANGA, &self.mangas).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mangas_and_owner() {
        let list: CustomList = serde_json::from_value(json!({
            "id": "l1",
            "type": "custom_list",
            "attributes": {
                "name": "Weekly reads",
                "visibility": "private",
                "version": 2
            },
            "relationships": [
                { "id": "m1", "type": "manga" },
                { "id": "u1", "type": "user" },
                { "id": "m2", "type": "manga" }
            ]
        }))
        .unwrap();

        assert_eq!(list.name, "Weekly reads");
        assert_eq!(list.visibility, Visibility::Private);
        assert_eq!(list.mangas, vec!["m1", "m2"]);
        assert_eq!(list.owner.as_deref(), Some("u1"));
    }
}
