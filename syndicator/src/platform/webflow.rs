use anyhow::{Context, Result};
use common::PlatformConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{ContentPlatform, CreatedItem, ItemFieldData, PlatformItem};

/// Webflow CMS v2 collection items client
pub struct WebflowClient {
    api_url: String,
    collection_id: String,
    api_key: String,
    page_size: usize,
    client: reqwest::Client,
}

impl WebflowClient {
    pub fn new(
        api_url: impl Into<String>,
        collection_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            collection_id: collection_id.into(),
            api_key: api_key.into(),
            page_size: 100,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &PlatformConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            api_url: config.api_url.clone(),
            collection_id: config.collection_id.clone(),
            api_key: api_key.into(),
            page_size: config.page_size,
            client,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn items_url(&self) -> String {
        format!(
            "{}/collections/{}/items",
            self.api_url.trim_end_matches('/'),
            self.collection_id
        )
    }

    async fn fetch_page(&self, offset: usize) -> Result<ItemsPage> {
        let response = self
            .client
            .get(self.items_url())
            .query(&[("offset", offset), ("limit", self.page_size)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Webflow item list request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webflow API error {} listing items: {}", status, body);
        }

        response.json().await.context("Failed to parse Webflow item list")
    }
}

#[async_trait::async_trait]
impl ContentPlatform for WebflowClient {
    async fn list_items(&self) -> Result<Vec<PlatformItem>> {
        let mut items = Vec::new();

        loop {
            let page = self.fetch_page(items.len()).await?;
            let fetched = page.items.len();
            items.extend(page.items);

            let total = match page.pagination {
                Some(p) => p.total,
                None => break,
            };
            if fetched == 0 || items.len() >= total {
                break;
            }
            debug!(fetched = items.len(), total, "fetching next page of Webflow items");
        }

        info!(count = items.len(), collection = %self.collection_id, "fetched Webflow items");
        Ok(items)
    }

    async fn create_item(&self, field_data: &ItemFieldData) -> Result<CreatedItem> {
        let payload = CreateItemRequest { field_data };
        debug!(?payload, "creating Webflow item");

        let response = self
            .client
            .post(self.items_url())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Webflow create request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webflow API error {} creating item: {}", status, body);
        }

        response.json().await.context("Failed to parse Webflow create response")
    }

    async fn publish_items(&self, item_ids: &[String]) -> Result<()> {
        let payload = PublishRequest { item_ids };

        let response = self
            .client
            .post(format!("{}/publish", self.items_url()))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Webflow publish request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webflow API error {} publishing items: {}", status, body);
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<PlatformItem>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total: usize,
}

#[derive(Debug, Serialize)]
struct CreateItemRequest<'a> {
    #[serde(rename = "fieldData")]
    field_data: &'a ItemFieldData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest<'a> {
    item_ids: &'a [String],
}
