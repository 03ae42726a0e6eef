//! Small value types shared by the records and the chapter filters

use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

/// Half-open interval test: `min <= value < max`. Either bound may be left open.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Interval<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd> Interval<T> {
    pub fn new(min: T, max: T) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: T) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn below(max: T) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        if let Some(min) = &self.min {
            if value < min {
                return false;
            }
        }

        if let Some(max) = &self.max {
            if value >= max {
                return false;
            }
        }

        true
    }
}

/// A pair of allow/deny lists. An empty `include` list allows everything that is not excluded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InclusionExclusionPair<T> {
    pub include: Vec<T>,
    pub exclude: Vec<T>,
}

impl<T> Default for InclusionExclusionPair<T> {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl<T: PartialEq> InclusionExclusionPair<T> {
    pub fn include(include: Vec<T>) -> Self {
        Self {
            include,
            exclude: Vec::new(),
        }
    }

    pub fn exclude(exclude: Vec<T>) -> Self {
        Self {
            include: Vec::new(),
            exclude,
        }
    }

    pub fn matches(&self, item: &T) -> bool {
        (self.include.is_empty() || self.include.contains(item)) && !self.exclude.contains(item)
    }

    /// Matching for items that carry several values at once, e.g. all groups of a chapter.
    /// At least one value must be included (if anything is) and none may be excluded.
    pub fn matches_any<'a>(&self, items: impl IntoIterator<Item = &'a T> + Clone) -> bool
    where
        T: 'a,
    {
        let included = self.include.is_empty()
            || items.clone().into_iter().any(|item| self.include.contains(item));

        included && !items.into_iter().any(|item| self.exclude.contains(item))
    }
}

/// Language keyed map where looking up a missing language yields `V::default()`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct DefaultMap<V>(HashMap<String, V>);

impl<V: Default + Clone> DefaultMap<V> {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, language: &str) -> V {
        self.0.get(language).cloned().unwrap_or_default()
    }

    pub fn entry_mut(&mut self, language: &str) -> &mut V {
        self.0.entry(language.to_owned()).or_default()
    }

    pub fn insert(&mut self, language: impl Into<String>, value: V) -> Option<V> {
        self.0.insert(language.into(), value)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Value of an arbitrary language, used when the wanted one is missing
    pub fn first(&self) -> Option<&V> {
        self.0.values().next()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<V> FromIterator<(String, V)> for DefaultMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// All the titles a manga has in one language. The first one is the primary title.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct TitleList(Vec<String>);

impl TitleList {
    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }
}

impl Deref for TitleList {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for TitleList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
