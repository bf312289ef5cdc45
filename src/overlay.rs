//! Overlay configuration: language and category folders, search roots and
//! key derivation.
//!
//! Overlay folders act as in-place tags. A record under `res/fr/` is tagged
//! with language `fr` and the folder is removed from its lookup path, so
//! `res/fr/hello.txt` and `res/en/hello.txt` compete for the same key and the
//! active language decides which one is visible.

use std::collections::BTreeSet;

use crate::path;

/// Result of running one relative path through the overlay folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayOutcome {
    /// Normalized path with every matched overlay folder removed.
    pub stripped_path: String,
    pub language: Option<String>,
    pub category: Option<String>,
    /// The record belongs to an inactive language or a disabled category.
    pub excluded: bool,
}

/// Mutable overlay state owned by the resource manager.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    language: String,
    language_folders: Vec<(String, String)>,
    category_folders: Vec<(String, String)>,
    enabled_categories: BTreeSet<String>,
    search_by_relative_paths: bool,
    search_roots: Vec<String>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            language: String::new(),
            language_folders: Vec::new(),
            category_folders: Vec::new(),
            enabled_categories: BTreeSet::new(),
            search_by_relative_paths: false,
            search_roots: vec![String::new()],
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active language; empty when none is selected.
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    /// Tag everything under `folder` with `language`. Re-mapping a folder
    /// replaces its previous language.
    pub fn add_language_folder(&mut self, folder: &str, language: impl Into<String>) {
        upsert(&mut self.language_folders, folder, language.into());
    }

    pub fn remove_language_folder(&mut self, folder: &str) -> bool {
        remove(&mut self.language_folders, folder)
    }

    pub fn language_folders(&self) -> &[(String, String)] {
        &self.language_folders
    }

    /// Tag everything under `folder` with `category`.
    pub fn add_category_folder(&mut self, folder: &str, category: impl Into<String>) {
        upsert(&mut self.category_folders, folder, category.into());
    }

    pub fn remove_category_folder(&mut self, folder: &str) -> bool {
        remove(&mut self.category_folders, folder)
    }

    pub fn category_folders(&self) -> &[(String, String)] {
        &self.category_folders
    }

    /// Returns `false` if the category was already enabled.
    pub fn enable_category(&mut self, category: impl Into<String>) -> bool {
        self.enabled_categories.insert(category.into())
    }

    /// Returns `false` if the category was not enabled.
    pub fn disable_category(&mut self, category: &str) -> bool {
        self.enabled_categories.remove(category)
    }

    pub fn is_category_enabled(&self, category: &str) -> bool {
        self.enabled_categories.contains(category)
    }

    pub fn search_by_relative_paths(&self) -> bool {
        self.search_by_relative_paths
    }

    pub fn set_search_by_relative_paths(&mut self, enabled: bool) {
        self.search_by_relative_paths = enabled;
    }

    /// Returns `false` if the root was already configured.
    pub fn add_search_root(&mut self, root: &str) -> bool {
        let root = path::normalize_folder(root);
        if self.search_roots.contains(&root) {
            return false;
        }
        self.search_roots.push(root);
        true
    }

    /// Configured search roots in insertion order; the first is always `""`.
    pub fn search_roots(&self) -> &[String] {
        &self.search_roots
    }

    /// Derive the lookup key for a path or filename.
    ///
    /// Used for both indexing and lookup; any divergence between the two
    /// makes resources silently unresolvable.
    pub fn make_key(&self, raw: &str) -> String {
        let normalized = path::normalize(raw);
        if self.search_by_relative_paths {
            normalized
        } else {
            path::basename(&normalized).to_string()
        }
    }

    /// Strip language then category folders from `relative_path`, stamping
    /// the tags they carry.
    pub fn apply(&self, relative_path: &str) -> OverlayOutcome {
        let mut outcome = OverlayOutcome {
            stripped_path: path::normalize(relative_path),
            language: None,
            category: None,
            excluded: false,
        };

        for (folder, language) in &self.language_folders {
            if let Some(stripped) = path::strip_segment(&outcome.stripped_path, folder) {
                outcome.stripped_path = stripped;
                if *language != self.language {
                    outcome.excluded = true;
                    return outcome;
                }
                outcome.language = Some(language.clone());
            }
        }

        for (folder, category) in &self.category_folders {
            if let Some(stripped) = path::strip_segment(&outcome.stripped_path, folder) {
                outcome.stripped_path = stripped;
                if !self.enabled_categories.contains(category) {
                    outcome.excluded = true;
                    return outcome;
                }
                outcome.category = Some(category.clone());
            }
        }

        outcome
    }
}

fn upsert(mappings: &mut Vec<(String, String)>, folder: &str, value: String) {
    let folder = path::normalize_folder(folder);
    match mappings.iter_mut().find(|(f, _)| *f == folder) {
        Some(existing) => existing.1 = value,
        None => mappings.push((folder, value)),
    }
}

fn remove(mappings: &mut Vec<(String, String)>, folder: &str) -> bool {
    let folder = path::normalize_folder(folder);
    let before = mappings.len();
    mappings.retain(|(f, _)| *f != folder);
    mappings.len() != before
}
