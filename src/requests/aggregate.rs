//! Volume and chapter counts of a manga, as reported by `/manga/{id}/aggregate` or computed
//! locally from a [ChapterList](super::chapter_list::ChapterList).

use serde::Deserialize;
use serde_json::Value;

use std::collections::HashMap;

use super::{Error, Result};

/// Chapter number to the number of chapters uploaded with it. Chapters without a number are
/// counted under the `None` key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeAggregate(pub HashMap<Option<String>, usize>);

/// Volume number to its chapters. Chapters without a volume live under the `None` key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MangaAggregate(pub HashMap<Option<String>, VolumeAggregate>);

#[derive(Deserialize)]
struct RawChapterCount {
    chapter: Option<String>,
    count: usize,
}

#[derive(Deserialize)]
struct RawVolume {
    count: usize,
    // an empty volume comes back as `[]` instead of `{}`
    #[serde(default)]
    chapters: Value,
}

fn volume_key(key: String) -> Option<String> {
    match key.as_str() {
        "N/A" | "none" | "" => None,
        _ => Some(key),
    }
}

impl VolumeAggregate {
    pub fn chapters(&self) -> Vec<Option<&str>> {
        self.0.keys().map(Option::as_deref).collect()
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn count(&self, chapter: Option<&str>) -> usize {
        self.0
            .get(&chapter.map(str::to_owned))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn add(&mut self, chapter: Option<String>) {
        *self.0.entry(chapter).or_default() += 1;
    }

    fn from_raw(raw: RawVolume) -> Result<Self> {
        let mut volume = Self::default();

        if let Value::Object(chapters) = raw.chapters {
            for (_, chapter) in chapters {
                let chapter: RawChapterCount = serde_json::from_value(chapter)?;
                let key = chapter.chapter.and_then(volume_key);
                *volume.0.entry(key).or_default() += chapter.count;
            }
        }

        let counted = volume.total();
        if counted < raw.count {
            *volume.0.entry(None).or_default() += raw.count - counted;
        }

        Ok(volume)
    }
}

impl MangaAggregate {
    /// Parses the `volumes` object of an aggregate response
    pub fn from_value(volumes: Value) -> Result<Self> {
        let volumes = match volumes {
            Value::Object(volumes) => volumes,
            Value::Array(items) if items.is_empty() => return Ok(Self::default()),
            _ => return Err(Error::ParseError),
        };

        let mut aggregate = Self::default();
        for (key, volume) in volumes {
            let volume = VolumeAggregate::from_raw(serde_json::from_value(volume)?)?;
            aggregate.0.insert(volume_key(key), volume);
        }

        Ok(aggregate)
    }

    pub fn volumes(&self) -> Vec<Option<&str>> {
        self.0.keys().map(Option::as_deref).collect()
    }

    pub fn volume(&self, volume: Option<&str>) -> Option<&VolumeAggregate> {
        self.0.get(&volume.map(str::to_owned))
    }

    pub fn total(&self) -> usize {
        self.0.values().map(VolumeAggregate::total).sum()
    }

    pub(crate) fn add(&mut self, volume: Option<String>, chapter: Option<String>) {
        self.0.entry(volume).or_default().add(chapter);
    }
}
