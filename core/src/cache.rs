//! In-memory detail cache.
//!
//! Records are keyed by id, with a secondary index from lowercased name to id
//! so name lookups are case-insensitive. Nothing expires and nothing is
//! evicted; the cache lives exactly as long as the repository that owns it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::{DetailKey, Pokemon};

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<u32, Arc<Pokemon>>,
    id_by_name: HashMap<String, u32>,
}

#[derive(Debug, Default)]
pub struct DetailCache {
    entries: RwLock<Entries>,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &DetailKey) -> Option<Arc<Pokemon>> {
        match key {
            DetailKey::Id(id) => self.get_by_id(*id),
            DetailKey::Name(name) => self.get_by_name(name),
        }
    }

    pub fn get_by_id(&self, id: u32) -> Option<Arc<Pokemon>> {
        self.read().by_id.get(&id).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<Pokemon>> {
        let entries = self.read();
        let id = entries.id_by_name.get(&name.trim().to_lowercase())?;
        entries.by_id.get(id).cloned()
    }

    /// Insert or overwrite by id. The name index is pointed at this id under
    /// the record's current name; a renamed record drops its old alias.
    pub fn put(&self, record: Arc<Pokemon>) {
        let mut entries = self.write();
        let id = record.id;
        if let Some(previous) = entries.by_id.get(&id) {
            let old_name = previous.name.to_lowercase();
            if entries.id_by_name.get(&old_name) == Some(&id) {
                entries.id_by_name.remove(&old_name);
            }
        }
        entries.id_by_name.insert(record.name.to_lowercase(), id);
        entries.by_id.insert(id, record);
    }

    pub fn clear(&self) {
        let mut entries = self.write();
        entries.by_id.clear();
        entries.id_by_name.clear();
    }

    pub fn len(&self) -> usize {
        self.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sprites;

    fn pokemon(id: u32, name: &str, weight: u32) -> Arc<Pokemon> {
        Arc::new(Pokemon {
            id,
            name: name.to_string(),
            height: 4,
            weight,
            base_experience: None,
            sprites: Sprites::default(),
            types: Vec::new(),
            stats: Vec::new(),
            abilities: Vec::new(),
        })
    }

    #[test]
    fn empty_cache_misses() {
        let cache = DetailCache::new();
        assert!(cache.is_empty());
        assert!(cache.get_by_id(25).is_none());
        assert!(cache.get_by_name("pikachu").is_none());
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let cache = DetailCache::new();
        cache.put(pokemon(25, "Pikachu", 60));

        for name in ["pikachu", "PIKACHU", "Pikachu", " pikachu "] {
            let hit = cache.get_by_name(name).expect(name);
            assert_eq!(hit.id, 25);
        }
        assert_eq!(cache.get(&DetailKey::from("PiKaChU")).unwrap().id, 25);
        assert_eq!(cache.get(&DetailKey::Id(25)).unwrap().name, "Pikachu");
    }

    #[test]
    fn put_overwrites_same_id() {
        let cache = DetailCache::new();
        cache.put(pokemon(1, "bulbasaur", 69));
        cache.put(pokemon(1, "bulbasaur", 70));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_by_id(1).unwrap().weight, 70);
    }

    #[test]
    fn renamed_record_moves_the_name_index() {
        let cache = DetailCache::new();
        cache.put(pokemon(122, "mr-mime", 545));
        cache.put(pokemon(122, "Mr-Mime-Galar", 568));
        assert!(cache.get_by_name("mr-mime").is_none());
        assert_eq!(cache.get_by_name("mr-mime-galar").unwrap().weight, 568);
    }

    #[test]
    fn clear_empties_both_indexes() {
        let cache = DetailCache::new();
        cache.put(pokemon(1, "bulbasaur", 69));
        cache.put(pokemon(4, "charmander", 85));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(cache.get_by_name("charmander").is_none());
    }
}
