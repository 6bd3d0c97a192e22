use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::platform::{ContentPlatform, PlatformItem};

/// Keeps the links whose exact string is not recorded on any platform item.
/// Order and in-page duplicates of `links` are preserved.
pub fn filter_new_links(links: Vec<String>, known: &[PlatformItem]) -> Vec<String> {
    let known: HashSet<&str> = known.iter().filter_map(PlatformItem::original_link).collect();
    links.into_iter().filter(|link| !known.contains(link.as_str())).collect()
}

/// Dedup Filter: fetch the platform's items and drop already-syndicated links.
pub async fn filter_new_post_links(platform: &dyn ContentPlatform, links: Vec<String>) -> Result<Vec<String>> {
    let items = platform
        .list_items()
        .await
        .context("failed to fetch items already stored on the platform")?;

    debug!(
        known = ?items.iter().filter_map(PlatformItem::original_link).collect::<Vec<_>>(),
        "already known links"
    );

    let harvested = links.len();
    let new_links = filter_new_links(links, &items);
    info!(harvested, new = new_links.len(), "filtered new post links");
    Ok(new_links)
}
