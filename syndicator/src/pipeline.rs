//! Sequential orchestration: per site, per post, one network call at a time.

use common::{PacingConfig, RunEntry, SiteConfig};
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::dedup;
use crate::llm::LlmProvider;
use crate::platform::ContentPlatform;
use crate::publisher::{self, PublishOutcome};
use crate::reformulation;
use crate::run_log::RunBuffer;
use crate::scraping;

/// Random politeness delay within the configured bounds (inclusive).
pub fn pacing_delay(pacing: &PacingConfig) -> Duration {
    let ms = if pacing.min_delay_ms >= pacing.max_delay_ms {
        pacing.min_delay_ms
    } else {
        rand::thread_rng().gen_range(pacing.min_delay_ms..=pacing.max_delay_ms)
    };
    Duration::from_millis(ms)
}

pub struct Pipeline<'a> {
    http: Client,
    llm: &'a dyn LlmProvider,
    platform: &'a dyn ContentPlatform,
    pacing: PacingConfig,
    image_size: String,
    author_name: Option<String>,
    max_posts_per_site: Option<usize>,
}

impl<'a> Pipeline<'a> {
    pub fn new(http: Client, llm: &'a dyn LlmProvider, platform: &'a dyn ContentPlatform) -> Self {
        Self {
            http,
            llm,
            platform,
            pacing: PacingConfig::default(),
            image_size: "1024x1024".to_string(),
            author_name: None,
            max_posts_per_site: None,
        }
    }

    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_image_size(mut self, image_size: impl Into<String>) -> Self {
        self.image_size = image_size.into();
        self
    }

    pub fn with_author_name(mut self, author_name: Option<String>) -> Self {
        self.author_name = author_name;
        self
    }

    /// Cap the number of new posts processed per site
    pub fn with_max_posts_per_site(mut self, max: Option<usize>) -> Self {
        self.max_posts_per_site = max;
        self
    }

    /// Runs every site in order and returns what was reformulated.
    /// Failures never escape: a failing site or post is logged and skipped.
    pub async fn run(&self, sites: &[SiteConfig]) -> RunBuffer {
        let mut buffer = RunBuffer::new();
        for site in sites {
            info!(site = %site.id, name = %site.name, "syndicating posts");
            self.process_site(site, &mut buffer).await;
        }
        info!(entries = buffer.len(), "run complete");
        buffer
    }

    async fn process_site(&self, site: &SiteConfig, buffer: &mut RunBuffer) {
        let links = match scraping::harvest_post_links(&self.http, site).await {
            Ok(links) => links,
            Err(e) => {
                error!(site = %site.id, stage = "harvest", error = %e, "skipping site");
                return;
            }
        };

        let mut new_links = match dedup::filter_new_post_links(self.platform, links).await {
            Ok(links) => links,
            Err(e) => {
                error!(site = %site.id, stage = "dedup", error = %e, "skipping site");
                return;
            }
        };

        if let Some(max) = self.max_posts_per_site {
            new_links.truncate(max);
        }

        for link in &new_links {
            self.process_post(site, link, buffer).await;
        }
    }

    async fn process_post(&self, site: &SiteConfig, link: &str, buffer: &mut RunBuffer) {
        let delay = pacing_delay(&self.pacing);
        info!(site = %site.id, link, delay_ms = delay.as_millis() as u64, "waiting before fetching the next post");
        tokio::time::sleep(delay).await;

        let original = match scraping::scrape_post(&self.http, site, link).await {
            Ok(Some(post)) => post,
            Ok(None) => {
                warn!(site = %site.id, link, stage = "extract", "post details not extracted");
                return;
            }
            Err(e) => {
                warn!(site = %site.id, link, stage = "extract", error = %e, "post page fetch failed");
                return;
            }
        };

        let mut reformulated = match reformulation::reformulate_post(self.llm, site, &original).await {
            Ok(Some(post)) => post,
            Ok(None) => return,
            Err(e) => {
                warn!(site = %site.id, link, stage = "reformulate", error = %e, "reformulation failed");
                return;
            }
        };

        reformulated.thumbnail_url =
            match reformulation::generate_thumbnail(self.llm, &reformulated.title, &self.image_size).await {
                Ok(url) => url,
                Err(e) => {
                    warn!(site = %site.id, link, stage = "thumbnail", error = %e, "thumbnail generation failed");
                    None
                }
            };

        buffer.push(
            &site.id,
            RunEntry {
                original: original.clone(),
                reformulated: reformulated.clone(),
            },
        );

        let outcome = publisher::publish_post(
            self.platform,
            &original.original_link,
            &reformulated,
            self.author_name.as_deref(),
        )
        .await;
        if !matches!(outcome, PublishOutcome::Published { .. }) {
            warn!(site = %site.id, link, stage = "publish", ?outcome, "post not published");
        }
    }
}
