use common::ReformulatedPost;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{error, info, warn};

use crate::platform::{ContentPlatform, ImageRef, ItemFieldData};

const SUMMARY_MAX_CHARS: usize = 300;

/// What happened to a post handed to the publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No thumbnail, nothing sent to the platform
    SkippedNoThumbnail,
    /// Creation refused by the platform
    CreateFailed,
    /// Created but left as a draft because publishing failed
    CreatedUnpublished { item_id: String },
    Published { item_id: String },
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>?").expect("valid tag regex"))
}

/// Drops every markup tag, keeping text as-is.
pub fn remove_html_tags(html: &str) -> String {
    tag_re().replace_all(html, "").into_owned()
}

/// First 300 characters, with "..." appended when anything was cut.
pub fn summarize(text: &str) -> String {
    match text.char_indices().nth(SUMMARY_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Builds the item payload; `None` when the post has no thumbnail.
pub fn build_field_data(
    original_link: &str,
    post: &ReformulatedPost,
    author_name: Option<&str>,
) -> Option<ItemFieldData> {
    let thumbnail_url = post.thumbnail_url.as_ref()?;

    Some(ItemFieldData {
        name: post.title.clone(),
        author_name: author_name.map(str::to_string),
        post_summary: summarize(&remove_html_tags(&post.html_content)),
        rich_text: post.html_content.clone(),
        main_image: ImageRef { url: thumbnail_url.clone() },
        thumbnail_image: ImageRef { url: thumbnail_url.clone() },
        original_link: original_link.to_string(),
    })
}

/// Publisher: create the item, then publish it. Nothing is retried or rolled back.
pub async fn publish_post(
    platform: &dyn ContentPlatform,
    original_link: &str,
    post: &ReformulatedPost,
    author_name: Option<&str>,
) -> PublishOutcome {
    let Some(field_data) = build_field_data(original_link, post, author_name) else {
        warn!(link = original_link, "skip creating post because thumbnail url is not available");
        return PublishOutcome::SkippedNoThumbnail;
    };

    info!(link = original_link, title = %post.title, "creating the post on the platform");
    let created = match platform.create_item(&field_data).await {
        Ok(created) => created,
        Err(e) => {
            error!(link = original_link, error = %e, "error creating post on the platform");
            return PublishOutcome::CreateFailed;
        }
    };
    info!(item_id = %created.id, "post created successfully");

    match platform.publish_items(std::slice::from_ref(&created.id)).await {
        Ok(()) => {
            info!(item_id = %created.id, "post published successfully");
            PublishOutcome::Published { item_id: created.id }
        }
        Err(e) => {
            error!(item_id = %created.id, error = %e, "error publishing post, item left unpublished");
            PublishOutcome::CreatedUnpublished { item_id: created.id }
        }
    }
}
