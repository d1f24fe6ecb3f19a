//! Catalog service abstractions.
//!
//! The reconciliation engine talks to the remote service only through these
//! traits: a paginated favorites listing, a track search and the two
//! favorites mutations. [`crate::tidal::TidalClient`] implements all three.

use serde_json::Value;

use crate::error::Result;
use crate::models::TrackId;

/// One favorites listing entry. `payload` is `None` for ghost entries whose
/// underlying catalog record was deleted upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteEntry {
    pub payload: Option<Value>,
}

/// One offset/limit page of the favorites listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesPage {
    pub items: Vec<FavoriteEntry>,
    /// `totalNumberOfItems` when the service sent a numeric value.
    pub total: Option<u64>,
}

impl FavoritesPage {
    /// Interpret a raw listing response: `{"items": [{"item": {...}}], "totalNumberOfItems": n}`.
    pub fn from_json(body: &Value) -> FavoritesPage {
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|entry| FavoriteEntry {
                        payload: entry.get("item").filter(|v| is_present(v)).cloned(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let total = body.get("totalNumberOfItems").and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        FavoritesPage { items, total }
    }
}

/// Null, empty objects and empty arrays all mean "no record".
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Paginated read access to the user's favorites.
pub trait FavoritesSource {
    fn favorites_page(&self, offset: usize, limit: usize) -> Result<FavoritesPage>;
}

/// Free-text track search over the whole catalog.
pub trait CatalogSearch {
    /// Returns raw track payloads in the service's relevance order.
    fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Value>>;
}

/// Favorites mutations. Each call is assumed atomic at the service.
pub trait FavoritesMutator {
    fn add_favorite(&self, id: TrackId) -> Result<()>;
    fn remove_favorite(&self, id: TrackId) -> Result<()>;
}
