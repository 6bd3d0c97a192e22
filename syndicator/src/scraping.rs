use anyhow::{Context, Result};
use common::{FetchConfig, OriginalPost, SiteConfig};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::sanitize;

/// Builds the client used for every source-site request.
pub fn build_client(fetch: &FetchConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(fetch.timeout_seconds))
        .user_agent(fetch.user_agent.as_str())
        .build()
        .context("failed to build reqwest client")
}

/// Single GET, no retry. Non-2xx statuses are errors.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to fetch page {}", url))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("page fetch failed with status: {} ({})", status, url));
    }

    response.text().await.context("failed to read response body")
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow::anyhow!("invalid CSS selector '{}': {:?}", selector, e))
}

/// Checks that the three selectors of a site parse.
pub fn validate_selectors(site: &SiteConfig) -> Result<()> {
    for selector in [&site.link_selector, &site.title_selector, &site.body_selector] {
        parse_selector(selector).with_context(|| format!("site '{}'", site.id))?;
    }
    Ok(())
}

/// Relative links are resolved against the site's domain with a fixed https scheme.
pub fn absolutize_link(domain: &str, link: &str) -> String {
    if link.starts_with("http") {
        link.to_string()
    } else {
        format!("https://{}{}", domain, link)
    }
}

/// Reads the `href` of every element matching the site's link selector, in document order.
/// Duplicates are kept; empty hrefs are dropped.
pub fn extract_post_links(site: &SiteConfig, listing_html: &str) -> Result<Vec<String>> {
    let selector = parse_selector(&site.link_selector)?;
    let document = Html::parse_document(listing_html);

    let links = document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(|href| absolutize_link(&site.domain, href))
        .collect();

    Ok(links)
}

/// Link Harvester: fetch the listing page and extract candidate article links.
pub async fn harvest_post_links(client: &Client, site: &SiteConfig) -> Result<Vec<String>> {
    info!(site = %site.id, url = %site.listing_url, "fetching blog page");
    let listing_html = fetch_page(client, &site.listing_url).await?;
    let links = extract_post_links(site, &listing_html)?;
    info!(site = %site.id, count = links.len(), "extracted post links");
    debug!(site = %site.id, ?links, "post links");
    Ok(links)
}

/// Pulls title and sanitized body out of an article page.
/// Returns `Ok(None)` when the title or the body cannot be found.
pub fn extract_post(site: &SiteConfig, original_link: &str, page_html: &str) -> Result<Option<OriginalPost>> {
    let title_selector = parse_selector(&site.title_selector)?;
    let body_selector = parse_selector(&site.body_selector)?;
    let document = Html::parse_document(page_html);

    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let Some(title) = title else {
        warn!(site = %site.id, link = original_link, "post title not found");
        return Ok(None);
    };

    let body_html: String = document.select(&body_selector).map(|el| el.html()).collect();
    if body_html.is_empty() {
        warn!(site = %site.id, link = original_link, "post content not found");
        return Ok(None);
    }

    Ok(Some(OriginalPost {
        original_link: original_link.to_string(),
        title,
        html_content: sanitize::clean_html(&body_html),
    }))
}

/// Content Extractor: fetch one article page and extract it.
pub async fn scrape_post(client: &Client, site: &SiteConfig, link: &str) -> Result<Option<OriginalPost>> {
    info!(site = %site.id, link, "fetching post page");
    let page_html = fetch_page(client, link).await?;
    let post = extract_post(site, link, &page_html)?;
    if let Some(post) = &post {
        info!(
            site = %site.id,
            link,
            title = %post.title,
            chars = post.html_content.len(),
            "extracted post details"
        );
    }
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteConfig {
        SiteConfig {
            id: "acme".to_string(),
            name: "Acme".to_string(),
            domain: "blog.acme.test".to_string(),
            listing_url: "https://blog.acme.test/articles".to_string(),
            link_selector: "a.post-card".to_string(),
            title_selector: "h1.title".to_string(),
            body_selector: ".post-body".to_string(),
        }
    }

    #[test]
    fn links_are_absolutized_and_kept_in_order() {
        let html = r#"
            <html><body>
              <a class="post-card" href="/posts/one">One</a>
              <a class="nav" href="/about">About</a>
              <a class="post-card" href="https://cdn.acme.test/posts/two">Two</a>
              <a class="post-card" href="">Empty</a>
              <a class="post-card">No href</a>
              <a class="post-card" href="/posts/one">One again</a>
            </body></html>
        "#;

        let links = extract_post_links(&site(), html).expect("extract links");
        assert_eq!(
            links,
            vec![
                "https://blog.acme.test/posts/one",
                "https://cdn.acme.test/posts/two",
                "https://blog.acme.test/posts/one",
            ]
        );
    }

    #[test]
    fn no_match_yields_empty_list() {
        let links = extract_post_links(&site(), "<html><body><p>nothing</p></body></html>").expect("extract");
        assert!(links.is_empty());
    }

    #[test]
    fn invalid_selector_is_an_error() {
        let mut s = site();
        s.link_selector = "a[".to_string();
        assert!(extract_post_links(&s, "<p></p>").is_err());
        assert!(validate_selectors(&s).is_err());
        assert!(validate_selectors(&site()).is_ok());
    }

    #[test]
    fn extracts_title_and_concatenated_sanitized_body() {
        let html = r#"
            <html><body>
              <h1 class="title"> Hello world </h1>
              <div class="post-body" id="a"><p class="lead">First</p><script>x()</script></div>
              <aside>ignored</aside>
              <div class="post-body"><p style="color: red">Second</p></div>
            </body></html>
        "#;

        let post = extract_post(&site(), "https://blog.acme.test/posts/one", html)
            .expect("extract")
            .expect("post found");

        assert_eq!(post.original_link, "https://blog.acme.test/posts/one");
        assert_eq!(post.title, "Hello world");
        assert_eq!(post.html_content, r#"<div><p>First</p></div><div><p style="color: red">Second</p></div>"#);
    }

    #[test]
    fn missing_title_drops_post() {
        let html = r#"<html><body><div class="post-body"><p>x</p></div></body></html>"#;
        assert!(extract_post(&site(), "https://x", html).expect("extract").is_none());
    }

    #[test]
    fn missing_body_drops_post() {
        let html = r#"<html><body><h1 class="title">T</h1></body></html>"#;
        assert!(extract_post(&site(), "https://x", html).expect("extract").is_none());
    }
}
