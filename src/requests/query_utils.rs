use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Error, Result};

use std::collections::HashMap;

/// Implemented by everything that can be serialized into the query string of a request
pub trait Query: Serialize + std::fmt::Debug {
    /// Query parameters as a json object, the form the [Pager](super::pager::Pager) keeps them in
    fn to_params(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            _ => Err(Error::ParseError),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, std::hash::Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Manga,
    CoverArt,
    Chapter,
    Author,
    ApiClient,
    ReportReason,
    ScanlationGroup,
    User,
    Leader,
    Member,
    Tag,
    Artist,
    Creator,
    CustomList,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub related: Option<String>,
    pub attributes: Option<Value>,
}

/// Ids of all relationships of the given type, in server order
pub(crate) fn related_ids(relationships: &[Relationship], entity_type: EntityType) -> Vec<String> {
    relationships
        .iter()
        .filter(|relationship| relationship.entity_type == entity_type)
        .map(|relationship| relationship.id.clone())
        .collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, std::hash::Hash)]
#[serde(rename_all = "camelCase")]
pub enum OrderOption {
    Title,
    Year,
    CreatedAt,
    UpdatedAt,
    PublishAt,
    ReadableAt,
    LatestUploadedChapter,
    FollowedCount,
    Relevance,
    Volume,
    Chapter,
    Name,
}

pub type SortingOptions = HashMap<OrderOption, Order>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    Safe,
    Suggestive,
    Erotica,
    Pornographic,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublicationDemographic {
    Shounen,
    Shoujo,
    Josei,
    Seinen,
    None,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MangaStatus {
    Completed,
    Ongoing,
    Cancelled,
    Hiatus,
}

/// Formats a timestamp the way the `*Since` query parameters expect it
pub fn query_date(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub(crate) fn serialize_query_date<S>(
    time: &Option<DateTime<Utc>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match time {
        Some(time) => serializer.serialize_str(&query_date(time)),
        None => serializer.serialize_none(),
    }
}

/// Localized strings. Empty ones sometimes come back as `[]` instead of `{}`.
pub(crate) fn deserialize_localized<'de, D>(
    deserializer: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(language, value)| match value {
                Value::String(value) => Some(Ok((language, value))),
                Value::Null => None,
                other => Some(Err(serde::de::Error::custom(format!(
                    "expected a string for language {language}, got {other}"
                )))),
            })
            .collect(),
        Value::Array(items) if items.is_empty() => Ok(HashMap::new()),
        Value::Null => Ok(HashMap::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected localized strings, got {other}"
        ))),
    }
}

pub trait ResponseResultOk {
    fn response_result_ok(&self) -> Result<bool>;
}

impl ResponseResultOk for Value {
    fn response_result_ok(&self) -> Result<bool> {
        match self.get("result") {
            Some(Value::String(result)) => Ok(result == "ok"),
            _ => Err(Error::ParseError),
        }
    }
}
