//! Catalog across all enabled libraries.
//!
//! Flattens every library's entries into one list, ordered by content name,
//! that can be searched with the name/tag filter.

use std::path::PathBuf;

use tracing::warn;

use super::entry::{Entry, EntryId};
use super::error::ErrorKind;
use super::filter::{matches_filter, parse_terms};
use super::registry::Registry;
use crate::config::LibraryConfig;

/// Entries of every enabled library
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// All cataloged items, sorted by content name
    pub items: Vec<CatalogItem>,

    /// Libraries that could not be read
    pub errors: Vec<CatalogError>,
}

/// A single entry together with the library it came from
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    /// Name of the owning library
    pub library: String,

    pub id: EntryId,

    pub entry: Entry,
}

/// A library skipped while loading the catalog
#[derive(Debug, Clone)]
pub struct CatalogError {
    pub library: String,
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every enabled library.
    ///
    /// A library that fails to load is recorded in `errors` and skipped;
    /// it is never repaired or rewritten.
    pub fn load(registry: &Registry, libraries: &[LibraryConfig]) -> Self {
        let mut catalog = Self::new();

        for library in libraries.iter().filter(|lib| lib.enabled) {
            match registry.list_entries(&library.path) {
                Ok(entries) => {
                    for (id, entry) in entries {
                        catalog.items.push(CatalogItem {
                            library: library.name.clone(),
                            id,
                            entry,
                        });
                    }
                }
                Err(e) => {
                    warn!(library = %library.name, "Skipping library: {}", e);
                    catalog.errors.push(CatalogError {
                        library: library.name.clone(),
                        path: library.path.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        catalog.sort();
        catalog
    }

    /// Add an item, keeping the catalog ordered
    pub fn add(&mut self, library: impl Into<String>, id: EntryId, entry: Entry) {
        self.items.push(CatalogItem {
            library: library.into(),
            id,
            entry,
        });
        self.sort();
    }

    fn sort(&mut self) {
        self.items.sort_by(|a, b| {
            a.entry
                .content_name
                .to_lowercase()
                .cmp(&b.entry.content_name.to_lowercase())
                .then_with(|| a.library.cmp(&b.library))
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    /// Items matching every whitespace-separated term of `query`
    pub fn search(&self, query: &str) -> Vec<&CatalogItem> {
        let terms = parse_terms(query);

        self.items
            .iter()
            .filter(|item| matches_filter(&item.entry, &item.library, &terms))
            .collect()
    }

    /// Items stored under `id`, in any library
    pub fn find(&self, id: &EntryId) -> Vec<&CatalogItem> {
        self.items.iter().filter(|item| &item.id == id).collect()
    }

    /// Get the number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
