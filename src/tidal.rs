//! Tidal catalog client backed by `ureq`.
//!
//! Thin wrapper: one blocking request per call, no retries. Every failure is
//! returned as a [`CatalogError`] for the caller to bucket.

use log::debug;
use serde_json::Value;
use std::time::Duration;

use crate::catalog::{CatalogSearch, FavoritesMutator, FavoritesPage, FavoritesSource};
use crate::config::SessionArgs;
use crate::error::{CatalogError, Result};
use crate::models::TrackId;

/// Already-issued credentials plus the request context.
#[derive(Clone, Debug)]
pub struct TidalSession {
    pub api_base: String,
    pub access_token: String,
    pub user_id: String,
    pub country_code: String,
}

impl From<&SessionArgs> for TidalSession {
    fn from(args: &SessionArgs) -> Self {
        TidalSession {
            api_base: args.api_base.trim().trim_end_matches('/').to_string(),
            access_token: args.token.trim().to_string(),
            user_id: args.user_id.trim().to_string(),
            country_code: args.country.trim().to_string(),
        }
    }
}

pub struct TidalClient {
    http_client: ureq::Agent,
    session: TidalSession,
}

impl TidalClient {
    pub fn new(session: TidalSession) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(20))
            .timeout_write(Duration::from_secs(20))
            .build();
        Self {
            http_client,
            session,
        }
    }

    pub fn session(&self) -> &TidalSession {
        &self.session
    }

    fn favorites_url(&self) -> String {
        format!(
            "{}/users/{}/favorites/tracks",
            self.session.api_base,
            urlencoding::encode(&self.session.user_id)
        )
    }

    /// Append `params` plus the country code as an encoded query string.
    fn with_query(&self, url: &str, params: &[(&str, String)]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .chain(std::iter::once(("countryCode", self.session.country_code.as_str())))
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect();
        format!("{url}?{}", query.join("&"))
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.session.access_token)
    }

    fn request_json(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);
        let response = self
            .http_client
            .get(url)
            .set("Authorization", &self.bearer())
            .set("Accept", "application/json")
            .call()?;
        response
            .into_json::<Value>()
            .map_err(|err| CatalogError::Decode(err.to_string()))
    }
}

impl FavoritesSource for TidalClient {
    fn favorites_page(&self, offset: usize, limit: usize) -> Result<FavoritesPage> {
        let url = self.with_query(
            &self.favorites_url(),
            &[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("order", "DATE".to_string()),
                ("orderDirection", "DESC".to_string()),
            ],
        );
        let body = self.request_json(&url)?;
        if !body.is_object() {
            return Err(CatalogError::Decode(
                "favorites listing is not a JSON object".to_string(),
            ));
        }
        Ok(FavoritesPage::from_json(&body))
    }
}

impl CatalogSearch for TidalClient {
    fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Value>> {
        let url = self.with_query(
            &format!("{}/search", self.session.api_base),
            &[
                ("query", query.to_string()),
                ("types", "TRACKS".to_string()),
                ("limit", limit.to_string()),
            ],
        );
        let body = self.request_json(&url)?;
        Ok(search_items(&body))
    }
}

impl FavoritesMutator for TidalClient {
    fn add_favorite(&self, id: TrackId) -> Result<()> {
        let url = self.with_query(&self.favorites_url(), &[]);
        debug!("POST {} trackIds={}", url, id);
        self.http_client
            .post(&url)
            .set("Authorization", &self.bearer())
            .send_form(&[
                ("trackIds", id.to_string().as_str()),
                ("onArtifactNotFound", "FAIL"),
            ])?;
        Ok(())
    }

    fn remove_favorite(&self, id: TrackId) -> Result<()> {
        let url = self.with_query(&format!("{}/{}", self.favorites_url(), id), &[]);
        debug!("DELETE {}", url);
        self.http_client
            .delete(&url)
            .set("Authorization", &self.bearer())
            .call()?;
        Ok(())
    }
}

/// Search responses nest results as `{"tracks": {"items": [...]}}`.
fn search_items(body: &Value) -> Vec<Value> {
    body.get("tracks")
        .and_then(|tracks| tracks.get("items"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
