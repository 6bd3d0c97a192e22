use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod webflow;

/// Custom field holding the source article URL on every syndicated item.
pub const ORIGINAL_LINK_FIELD: &str = "autopostgeneratororiginallink";

/// The content-management platform receiving reworded posts
#[async_trait::async_trait]
pub trait ContentPlatform: Send + Sync {
    /// Every item currently stored in the collection
    async fn list_items(&self) -> Result<Vec<PlatformItem>>;

    /// Create an item; errors on non-2xx responses
    async fn create_item(&self, field_data: &ItemFieldData) -> Result<CreatedItem>;

    /// Publish previously created items
    async fn publish_items(&self, item_ids: &[String]) -> Result<()>;
}

/// A stored item, reduced to what deduplication reads
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformItem {
    pub id: String,
    #[serde(rename = "fieldData", default)]
    pub field_data: StoredFieldData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredFieldData {
    #[serde(rename = "autopostgeneratororiginallink", default)]
    pub original_link: Option<String>,
}

impl PlatformItem {
    pub fn original_link(&self) -> Option<&str> {
        self.field_data.original_link.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub url: String,
}

/// Payload of a new collection item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFieldData {
    pub name: String,
    #[serde(rename = "author-name", skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(rename = "post-summary")]
    pub post_summary: String,
    #[serde(rename = "rich-text")]
    pub rich_text: String,
    #[serde(rename = "main-image-2")]
    pub main_image: ImageRef,
    #[serde(rename = "thumbnail-image")]
    pub thumbnail_image: ImageRef,
    #[serde(rename = "autopostgeneratororiginallink")]
    pub original_link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedItem {
    pub id: String,
}
