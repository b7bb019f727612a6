//! API client for the remote document store and blob store.
//!
//! This module provides the `CatalogClient` struct for fetching catalog
//! entries and image metadata, and for admin uploads of color images.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{CatalogItem, ColorImage, ImageTier, ImagesById};

use super::storage::{blob_path, content_type_for};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Maximum ids per batched lookup, imposed by the document store.
pub const MAX_BATCH_IDS: usize = 30;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

const CATALOG_COLLECTION: &str = "catalog";
const IMAGES_COLLECTION: &str = "images";

#[derive(Debug, Serialize)]
struct BatchGetRequest<'a> {
    ids: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    download_url: String,
}

/// Client for the catalog document store and image blob store.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    api_url: String,
    storage_url: String,
    storage_root: String,
    token: Option<String>,
}

impl CatalogClient {
    /// Create a new client for the endpoints in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_endpoint().trim_end_matches('/').to_string(),
            storage_url: config.storage_endpoint().trim_end_matches('/').to_string(),
            storage_root: config.storage_root.clone(),
            token: None,
        })
    }

    /// Create a new client with the given admin token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            token: Some(token),
            ..self.clone()
        }
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        Self::check_response(response)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send POST request to {}", url))?;

        Self::check_response(response)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// Run a batched lookup against `collection`, one request per chunk of ids.
    async fn batch_get<T, F>(&self, collection: &str, ids: &[String], mut merge: F) -> Result<()>
    where
        T: DeserializeOwned,
        F: FnMut(T),
    {
        let url = format!("{}/{}:batchGet", self.api_url, collection);
        for (i, chunk) in batch_ids(ids).iter().enumerate() {
            debug!(collection, chunk = i, size = chunk.len(), "Batched lookup");
            let response: T = self.post(&url, &BatchGetRequest { ids: chunk }).await?;
            merge(response);
        }
        Ok(())
    }

    // ===== Catalog =====

    /// Fetch every catalog entry
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>> {
        let url = format!("{}/{}", self.api_url, CATALOG_COLLECTION);
        let items: Vec<CatalogItem> = self.get(&url).await?;
        info!(count = items.len(), "Fetched catalog");
        Ok(items)
    }

    /// Fetch catalog entries by id, chunked to `MAX_BATCH_IDS` per request
    pub async fn fetch_items_by_ids(&self, ids: &[String]) -> Result<Vec<CatalogItem>> {
        let mut items = Vec::with_capacity(ids.len());
        self.batch_get(CATALOG_COLLECTION, ids, |chunk: Vec<CatalogItem>| {
            items.extend(chunk)
        })
        .await?;
        Ok(items)
    }

    /// Fetch image metadata for the given item ids
    pub async fn fetch_images(&self, ids: &[String]) -> Result<ImagesById> {
        let mut images = ImagesById::with_capacity(ids.len());
        self.batch_get(IMAGES_COLLECTION, ids, |chunk: ImagesById| images.extend(chunk))
            .await?;
        info!(count = images.len(), "Fetched image metadata");
        Ok(images)
    }

    // ===== Admin =====

    /// Upload one color image to the blob store, returning its download URL.
    pub async fn upload_color_image(
        &self,
        item_id: &str,
        color: &str,
        tier: ImageTier,
        bytes: Vec<u8>,
        ext: &str,
    ) -> Result<String> {
        if self.token.is_none() {
            return Err(ApiError::Unauthorized.into());
        }
        let path = blob_path(&self.storage_root, item_id, color, tier, ext);
        let url = format!("{}/{}", self.storage_url, path);

        let response = self
            .client
            .put(&url)
            .headers(self.auth_headers()?)
            .header(header::CONTENT_TYPE, content_type_for(ext))
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Failed to upload image to {}", path))?;

        let upload: UploadResponse = Self::check_response(response)
            .await?
            .json()
            .await
            .context("Failed to parse upload response")?;

        info!(item_id, color, %tier, "Uploaded color image");
        Ok(upload.download_url)
    }

    /// Record the URLs and swatch override for one color of an item.
    pub async fn update_color_image(
        &self,
        item_id: &str,
        color: &str,
        image: &ColorImage,
    ) -> Result<()> {
        if self.token.is_none() {
            return Err(ApiError::Unauthorized.into());
        }
        let url = format!("{}/{}/{}", self.api_url, IMAGES_COLLECTION, item_id);
        let body = serde_json::json!({ color: image });

        let response = self
            .client
            .patch(&url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to update image metadata for {}", item_id))?;

        Self::check_response(response).await?;
        Ok(())
    }
}

/// Split ids into request-sized chunks, dropping empty and repeated ids.
fn batch_ids(ids: &[String]) -> Vec<Vec<String>> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = ids
        .iter()
        .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
        .cloned()
        .collect();
    unique
        .chunks(MAX_BATCH_IDS)
        .map(|chunk| chunk.to_vec())
        .collect()
}
