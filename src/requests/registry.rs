//! Client owned arena of every record the client has seen, keyed by id.
//!
//! Records refer to each other by id and are resolved through the registry. A record
//! coming from the server replaces the cached one only when its version is strictly higher.

use parking_lot::RwLock;

use std::collections::HashMap;

use super::author::Author;
use super::chapter::Chapter;
use super::custom_list::CustomList;
use super::manga::Manga;
use super::scanlation_group::ScanlationGroup;
use super::tag::Tag;
use super::user::User;
use super::Entity;

#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) mangas: RwLock<HashMap<String, Manga>>,
    pub(crate) chapters: RwLock<HashMap<String, Chapter>>,
    pub(crate) groups: RwLock<HashMap<String, ScanlationGroup>>,
    pub(crate) users: RwLock<HashMap<String, User>>,
    pub(crate) authors: RwLock<HashMap<String, Author>>,
    pub(crate) tags: RwLock<HashMap<String, Tag>>,
    pub(crate) custom_lists: RwLock<HashMap<String, CustomList>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches `item` and returns the record now held for its id
    pub fn merge<T: Entity>(&self, item: T) -> T {
        item.register_related(self);

        let mut table = T::table(self).write();
        match table.get_mut(item.id()) {
            Some(cached) if item.version() > cached.version() => {
                tracing::trace!(
                    id = item.id(),
                    from = cached.version(),
                    to = item.version(),
                    "newer {:?} version",
                    T::ENTITY_TYPE
                );
                *cached = item.clone();
                item
            }
            Some(cached) => cached.clone(),
            None => {
                table.insert(item.id().to_owned(), item.clone());
                item
            }
        }
    }

    pub fn get<T: Entity>(&self, id: &str) -> Option<T> {
        T::table(self).read().get(id).cloned()
    }

    pub fn contains<T: Entity>(&self, id: &str) -> bool {
        T::table(self).read().contains_key(id)
    }

    /// Ids from `ids` that are not cached yet, in the given order
    pub fn missing<T: Entity>(&self, ids: &[String]) -> Vec<String> {
        let table = T::table(self).read();

        ids.iter()
            .filter(|id| !table.contains_key(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn len<T: Entity>(&self) -> usize {
        T::table(self).read().len()
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.tags.read().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.mangas.write().clear();
        self.chapters.write().clear();
        self.groups.write().clear();
        self.users.write().clear();
        self.authors.write().clear();
        self.tags.write().clear();
        self.custom_lists.write().clear();
    }
}
