// src/services/serper.rs

//! HTTP client for the maps search endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{PlaceEntry, SearchConfig};
use crate::services::search::{PageFetcher, PageRequest};
use crate::utils::http;

const API_KEY_HEADER: &str = "X-API-KEY";

/// Request body for one page.
#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    q: &'a str,
    hl: &'a str,
    ll: String,
    page: u32,
}

/// The part of the response we consume.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    places: Option<Vec<serde_json::Value>>,
}

/// Page fetcher that POSTs JSON queries with a static API key.
pub struct SerperClient {
    client: Client,
    endpoint: String,
    language: String,
    zoom: u8,
    api_key: String,
}

impl SerperClient {
    /// Create a new client with the given configuration.
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::config("API key is empty"));
        }

        Ok(Self {
            client: http::create_async_client(config)?,
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
            zoom: config.zoom,
            api_key,
        })
    }

    fn decode_places(page: u32, body: &str) -> Result<Vec<PlaceEntry>> {
        let response: SearchResponse =
            serde_json::from_str(body).map_err(|e| AppError::fetch(page, e))?;

        let mut entries = Vec::new();
        for value in response.places.unwrap_or_default() {
            match serde_json::from_value::<PlaceEntry>(value) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::debug!("Dropping malformed place on page {}: {}", page, e),
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl PageFetcher for SerperClient {
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<Vec<PlaceEntry>> {
        let body = SearchBody {
            q: request.query,
            hl: &self.language,
            ll: request.city.search_center(self.zoom),
            page: request.page,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::fetch(request.page, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(request.page, format!("status {}", status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::fetch(request.page, e))?;
        Self::decode_places(request.page, &text)
    }
}
