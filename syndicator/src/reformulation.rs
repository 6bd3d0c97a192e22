//! Rewording of harvested posts and cover image generation.

use anyhow::Result;
use common::{OriginalPost, ReformulatedPost, SiteConfig};
use tracing::{debug, info, warn};

use crate::llm::{ImageRequest, LlmProvider, LlmRequest, LlmResponse};

fn title_prompt(site_name: &str, title: &str) -> String {
    format!(
        "Ton rôle est de reformuler le titre suivant en utilisant des mots différents mais en conservant le sens de la phrase. \
         Retire aussi toutes les mentions concernant {}. Voici le titre à reformuler : {}",
        site_name, title
    )
}

fn content_prompt(site_name: &str, html: &str) -> String {
    format!(
        "Ton rôle est de reformuler intégralement le texte présent dans l'HTML suivant, en utilisant des mots différents \
         mais en conservant le sens des phrases. Retire aussi toutes les mentions concernant {}. \
         Tu ne dois surtout pas changer la structure HTML ni le contenu CSS. Voici le texte à reformuler : {}",
        site_name, html
    )
}

fn thumbnail_prompt(title: &str) -> String {
    format!(
        "Génère une image de couverture pour un article de blog sur le sujet suivant : {}",
        title
    )
}

/// Removes the ```` ```html ```` wrapper the model sometimes puts around markup,
/// then every newline.
pub fn strip_code_fence(content: &str) -> String {
    let content = content.strip_prefix("```html\n").unwrap_or(content);
    let content = content.strip_suffix("```").unwrap_or(content);
    content.replace('\n', "")
}

fn log_usage(stage: &str, response: &LlmResponse) {
    debug!(
        stage,
        model = %response.model,
        prompt_tokens = response.usage.prompt_tokens,
        completion_tokens = response.usage.completion_tokens,
        total_tokens = response.usage.total_tokens,
        "generation usage"
    );
}

/// Reworded title, or `None` when the service returned nothing.
pub async fn reformulate_title(provider: &dyn LlmProvider, site_name: &str, title: &str) -> Result<Option<String>> {
    info!("reformulating the post title");
    let response = provider
        .generate(LlmRequest::from_prompt(title_prompt(site_name, title)))
        .await?;
    log_usage("title", &response);

    let title = response.content.trim();
    if title.is_empty() {
        return Ok(None);
    }
    debug!(title, "reformulated title");
    Ok(Some(title.to_string()))
}

/// Reworded body markup with any code fence removed, or `None` when the service returned nothing.
pub async fn reformulate_content(provider: &dyn LlmProvider, site_name: &str, html: &str) -> Result<Option<String>> {
    info!("reformulating the post content");
    let response = provider
        .generate(LlmRequest::from_prompt(content_prompt(site_name, html)))
        .await?;
    log_usage("content", &response);

    if response.content.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(strip_code_fence(&response.content)))
}

/// Post Transformer: title first, then body. Any missing half drops the post.
pub async fn reformulate_post(
    provider: &dyn LlmProvider,
    site: &SiteConfig,
    post: &OriginalPost,
) -> Result<Option<ReformulatedPost>> {
    let Some(title) = reformulate_title(provider, &site.name, &post.title).await? else {
        warn!(site = %site.id, link = %post.original_link, "empty reformulated title, dropping post");
        return Ok(None);
    };

    let Some(html_content) = reformulate_content(provider, &site.name, &post.html_content).await? else {
        warn!(site = %site.id, link = %post.original_link, "empty reformulated content, dropping post");
        return Ok(None);
    };

    Ok(Some(ReformulatedPost {
        title,
        html_content,
        thumbnail_url: None,
    }))
}

/// Thumbnail Generator: one cover image for the reworded title.
pub async fn generate_thumbnail(provider: &dyn LlmProvider, title: &str, size: &str) -> Result<Option<String>> {
    info!(title, "generating post thumbnail");
    let url = provider
        .generate_image(ImageRequest {
            prompt: thumbnail_prompt(title),
            size: size.to_string(),
        })
        .await?;
    debug!(?url, "thumbnail url");
    Ok(url)
}
