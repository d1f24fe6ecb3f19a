//! In-memory catalog doubles for unit tests.

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::catalog::{CatalogSearch, FavoriteEntry, FavoritesMutator, FavoritesPage, FavoritesSource};
use crate::error::{CatalogError, Result};
use crate::models::TrackId;

/// Minimal catalog payload.
pub fn track_json(id: u64, artist: &str, title: &str, quality: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "artist": {"name": artist},
        "album": {"title": "Album"},
        "audioQuality": quality,
    })
}

pub fn entries(payloads: Vec<Value>) -> Vec<FavoriteEntry> {
    payloads
        .into_iter()
        .map(|payload| FavoriteEntry {
            payload: Some(payload),
        })
        .collect()
}

pub fn ghost() -> FavoriteEntry {
    FavoriteEntry { payload: None }
}

/// Replays a fixed sequence of page responses and records the offsets asked
/// for. Once the script runs out every further page is empty.
pub struct ScriptedSource {
    pages: RefCell<VecDeque<Result<FavoritesPage>>>,
    pub offsets: RefCell<Vec<usize>>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<Result<FavoritesPage>>) -> Self {
        Self {
            pages: RefCell::new(pages.into()),
            offsets: RefCell::new(Vec::new()),
        }
    }

    pub fn page(items: Vec<FavoriteEntry>) -> Result<FavoritesPage> {
        Ok(FavoritesPage { items, total: None })
    }

    pub fn calls(&self) -> usize {
        self.offsets.borrow().len()
    }
}

impl FavoritesSource for ScriptedSource {
    fn favorites_page(&self, offset: usize, _limit: usize) -> Result<FavoritesPage> {
        self.offsets.borrow_mut().push(offset);
        self.pages
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(FavoritesPage::default()))
    }
}

/// Stateful favorites service: listing, search, add and remove all act on
/// the same in-memory list.
#[derive(Default)]
pub struct MemoryCatalog {
    favorites: RefCell<Vec<Value>>,
    ghosts: usize,
    /// Payloads appended to the listing after the first successful removal,
    /// as an eventually-consistent service would surface them late.
    hidden_until_removal: RefCell<Vec<Value>>,
    catalog: FxHashMap<u64, Value>,
    search_results: FxHashMap<String, Vec<u64>>,
    failing_adds: FxHashSet<u64>,
    failing_removes: FxHashSet<u64>,
    failing_searches: FxHashSet<String>,
    pub search_calls: Cell<usize>,
    pub removed: RefCell<Vec<TrackId>>,
    pub added: RefCell<Vec<TrackId>>,
}

impl MemoryCatalog {
    pub fn with_favorites(favorites: Vec<Value>) -> Self {
        Self {
            favorites: RefCell::new(favorites),
            ..Self::default()
        }
    }

    pub fn with_ghosts(mut self, ghosts: usize) -> Self {
        self.ghosts = ghosts;
        self
    }

    pub fn reveal_after_first_removal(self, payloads: Vec<Value>) -> Self {
        *self.hidden_until_removal.borrow_mut() = payloads;
        self
    }

    /// Register `results` as the response to `query`; the payloads also
    /// become addable catalog records.
    pub fn with_search(mut self, query: &str, results: Vec<Value>) -> Self {
        let mut ids = Vec::new();
        for payload in results {
            if let Some(id) = payload.get("id").and_then(Value::as_u64) {
                ids.push(id);
                self.catalog.insert(id, payload);
            }
        }
        self.search_results.insert(query.to_string(), ids);
        self
    }

    pub fn failing_add(mut self, id: u64) -> Self {
        self.failing_adds.insert(id);
        self
    }

    pub fn failing_remove(mut self, id: u64) -> Self {
        self.failing_removes.insert(id);
        self
    }

    pub fn failing_search(mut self, query: &str) -> Self {
        self.failing_searches.insert(query.to_string());
        self
    }

    pub fn favorite_ids(&self) -> Vec<u64> {
        self.favorites
            .borrow()
            .iter()
            .filter_map(|p| p.get("id").and_then(Value::as_u64))
            .collect()
    }
}

fn rejected(id: TrackId) -> CatalogError {
    CatalogError::Status {
        status: 500,
        message: format!("rejected {}", id),
    }
}

impl FavoritesSource for MemoryCatalog {
    fn favorites_page(&self, offset: usize, limit: usize) -> Result<FavoritesPage> {
        let mut listing: Vec<FavoriteEntry> = (0..self.ghosts).map(|_| ghost()).collect();
        listing.extend(entries(self.favorites.borrow().clone()));
        let total = listing.len() as u64;
        let items = listing.into_iter().skip(offset).take(limit).collect();
        Ok(FavoritesPage {
            items,
            total: Some(total),
        })
    }
}

impl CatalogSearch for MemoryCatalog {
    fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Value>> {
        self.search_calls.set(self.search_calls.get() + 1);
        if self.failing_searches.contains(query) {
            return Err(CatalogError::Transport("connection reset".to_string()));
        }
        Ok(self
            .search_results
            .get(query)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.catalog.get(id).cloned())
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl FavoritesMutator for MemoryCatalog {
    fn add_favorite(&self, id: TrackId) -> Result<()> {
        if self.failing_adds.contains(&id.0) {
            return Err(rejected(id));
        }
        let payload = self
            .catalog
            .get(&id.0)
            .cloned()
            .unwrap_or_else(|| json!({"id": id.0}));
        self.favorites.borrow_mut().push(payload);
        self.added.borrow_mut().push(id);
        Ok(())
    }

    fn remove_favorite(&self, id: TrackId) -> Result<()> {
        if self.failing_removes.contains(&id.0) {
            return Err(rejected(id));
        }
        let mut favorites = self.favorites.borrow_mut();
        let before = favorites.len();
        favorites.retain(|p| p.get("id").and_then(Value::as_u64) != Some(id.0));
        if favorites.len() == before {
            return Err(CatalogError::Status {
                status: 404,
                message: format!("{} is not a favorite", id),
            });
        }
        favorites.append(&mut self.hidden_until_removal.borrow_mut());
        self.removed.borrow_mut().push(id);
        Ok(())
    }
}
