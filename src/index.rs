//! Key → record index, rebuilt from the record store and overlay config.

use std::collections::HashMap;
use std::sync::Arc;

use crate::overlay::OverlayConfig;
use crate::path;
use crate::record::ResourceRecord;

/// A live index slot: the winning record plus the tags the overlay pass
/// stamped on it.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    record: Arc<ResourceRecord>,
    language: Option<String>,
    category: Option<String>,
}

impl IndexEntry {
    pub fn record(&self) -> &Arc<ResourceRecord> {
        &self.record
    }

    /// Language folder the record was found under, if any.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Category folder the record was found under, if any.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Mapping from normalized lookup key to the record that currently wins it.
#[derive(Debug, Default, Clone)]
pub struct ResourceIndex {
    entries: HashMap<String, IndexEntry>,
}

impl ResourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from scratch.
    ///
    /// Records are visited in discovery order and later ones overwrite
    /// earlier ones on the same key, so an overlay added after a base asset
    /// replaces it.
    pub fn build<'a>(
        records: impl IntoIterator<Item = &'a Arc<ResourceRecord>>,
        overlay: &OverlayConfig,
    ) -> Self {
        let mut entries = HashMap::new();

        for record in records {
            let outcome = overlay.apply(record.relative_path());
            if outcome.excluded {
                continue;
            }

            let entry = IndexEntry {
                record: Arc::clone(record),
                language: outcome.language,
                category: outcome.category,
            };

            entries.insert(overlay.make_key(&outcome.stripped_path), entry.clone());

            // The empty root never matches; it stands for the full path above
            for root in overlay.search_roots() {
                if let Some(shorthand) = path::strip_root(&outcome.stripped_path, root) {
                    entries.insert(overlay.make_key(shorthand), entry.clone());
                }
            }
        }

        Self { entries }
    }

    /// Look up an already-derived key.
    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordStore;
    use std::path::PathBuf;

    fn store_with(paths: &[&str]) -> RecordStore {
        let mut store = RecordStore::new();
        for p in paths {
            store.push(ResourceRecord::loose(p, PathBuf::from("/root").join(p), Some(1)));
        }
        store
    }

    #[test]
    fn test_basename_keys() {
        let store = store_with(&["textures/Demo.png", "sounds/boom.ogg"]);
        let index = ResourceIndex::build(store.iter(), &OverlayConfig::new());

        assert_eq!(index.len(), 2);
        assert!(index.contains_key("demo.png"));
        assert!(index.contains_key("boom.ogg"));
        assert!(!index.contains_key("textures/demo.png"));
    }

    #[test]
    fn test_relative_keys_and_search_roots() {
        let store = store_with(&["assets/textures/demo.png"]);
        let mut overlay = OverlayConfig::new();
        overlay.set_search_by_relative_paths(true);
        overlay.add_search_root("assets");

        let index = ResourceIndex::build(store.iter(), &overlay);
        let full = index.get("assets/textures/demo.png").unwrap();
        let short = index.get("textures/demo.png").unwrap();
        assert!(Arc::ptr_eq(full.record(), short.record()));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_last_record_wins_on_collision() {
        let store = store_with(&["base/logo.png", "mod/logo.png"]);
        let index = ResourceIndex::build(store.iter(), &OverlayConfig::new());

        let winner = index.get("logo.png").unwrap();
        assert_eq!(winner.record().relative_path(), "mod/logo.png");
    }

    #[test]
    fn test_language_overlay_selects_one_record() {
        let store = store_with(&["res/en/hello.txt", "res/fr/hello.txt", "res/other.txt"]);
        let mut overlay = OverlayConfig::new();
        overlay.add_language_folder("res/en", "en");
        overlay.add_language_folder("res/fr", "fr");
        overlay.set_language("en");

        let index = ResourceIndex::build(store.iter(), &overlay);
        let hello = index.get("hello.txt").unwrap();
        assert_eq!(hello.record().relative_path(), "res/en/hello.txt");
        assert_eq!(hello.language(), Some("en"));
        assert!(index.contains_key("other.txt"));

        overlay.set_language("de");
        let index = ResourceIndex::build(store.iter(), &overlay);
        assert!(!index.contains_key("hello.txt"));
        assert!(index.contains_key("other.txt"));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let store = store_with(&["a/one.txt", "b/two.txt", "b/one.txt"]);
        let mut overlay = OverlayConfig::new();
        overlay.set_search_by_relative_paths(true);
        overlay.add_search_root("b");

        let first = ResourceIndex::build(store.iter(), &overlay);
        let second = ResourceIndex::build(store.iter(), &overlay);

        assert_eq!(first.len(), second.len());
        for (key, entry) in first.iter() {
            let other = second.get(key).unwrap();
            assert!(Arc::ptr_eq(entry.record(), other.record()));
        }
    }
}
