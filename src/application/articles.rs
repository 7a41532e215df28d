//! The article rendering pipeline: cache-first resolution of post and page
//! sources into rendered HTML.

use std::sync::Arc;

use tracing::debug;

use crate::{
    application::{
        error::AppError,
        render::Markdown,
        site::SiteContext,
        source::{ContentSource, RedirectStub},
    },
    cache::CacheStore,
    domain::{
        articles::{
            BODY_CLASS_KEY, DATE_KEY, POST_BODY_CLASS, RELATIVE_LINK_KEY, RenderedArticle,
            parse_declared_date,
        },
        metadata,
        source_path,
    },
};

/// What a path resolves to, from the route layer's point of view.
pub enum Resolution {
    Article(Arc<RenderedArticle>),
    Redirect(RedirectStub),
}

pub struct ArticleService {
    source: Arc<dyn ContentSource>,
    markdown: Arc<dyn Markdown>,
    site: Arc<SiteContext>,
    cache: Arc<CacheStore>,
}

impl ArticleService {
    pub fn new(
        source: Arc<dyn ContentSource>,
        markdown: Arc<dyn Markdown>,
        site: Arc<SiteContext>,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self {
            source,
            markdown,
            site,
            cache,
        }
    }

    /// Cache-first article lookup. A hit performs no I/O and no re-parse.
    /// `Err(AppError::NotFound)` when no source file exists for the key.
    ///
    /// The file read between miss and insert is an await point, so two
    /// requests missing the same key can both render; the later insert wins.
    pub async fn article(&self, path: &str) -> Result<Arc<RenderedArticle>, AppError> {
        let key = source_path::normalize_key(path);
        if let Some(cached) = self.cache.article(&key).await {
            return Ok(cached);
        }

        let raw = self
            .source
            .read_post(&format!("{key}.md"))
            .await?
            .ok_or(AppError::NotFound)?;

        let article = Arc::new(self.render(&key, &raw));
        self.cache.insert_article(&key, article.clone()).await;
        Ok(article)
    }

    /// Resolve a path for the route layer: a rendered article, a redirect
    /// stub, or NotFound. Stubs are re-read every time, never cached.
    pub async fn resolve(&self, path: &str) -> Result<Resolution, AppError> {
        match self.article(path).await {
            Ok(article) => Ok(Resolution::Article(article)),
            Err(AppError::NotFound) => {
                let key = source_path::normalize_key(path);
                match self.source.read_redirect(&key).await? {
                    Some(stub) => Ok(Resolution::Redirect(stub)),
                    None => Err(AppError::NotFound),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Raw Markdown passthrough for requests that name the `.md` file
    /// directly.
    pub async fn raw_source(&self, path: &str) -> Result<String, AppError> {
        self.source
            .read_post(path.trim_start_matches('/'))
            .await?
            .ok_or(AppError::NotFound)
    }

    fn render(&self, key: &str, raw: &str) -> RenderedArticle {
        let marker = self.site.marker.as_str();

        // Lines are partitioned by marker prefix, not by position; body lines
        // keep their original relative order.
        let (metadata_lines, body_lines): (Vec<&str>, Vec<&str>) =
            raw.lines().partition(|line| line.starts_with(marker));

        let parsed = metadata::parse_metadata_lines(metadata_lines, marker);
        if parsed.skipped > 0 {
            debug!(
                target = "brezza::articles",
                source = key,
                skipped = parsed.skipped,
                "ignored malformed metadata lines"
            );
        }

        let mut meta = metadata::merge_with_defaults(parsed.values, &self.site.site_metadata);
        meta.insert(
            RELATIVE_LINK_KEY.to_string(),
            source_path::relative_link(key),
        );
        if source_path::is_post_shaped(key) {
            meta.insert(BODY_CLASS_KEY.to_string(), POST_BODY_CLASS.to_string());
        }

        let declared_date = meta.get(DATE_KEY).and_then(|raw| parse_declared_date(raw));

        let body_markdown = body_lines.join("\n");
        let unwrapped_body =
            metadata::apply_replacements(&meta, &self.markdown.to_html(&body_markdown), marker);
        let header = metadata::apply_replacements(&meta, &self.site.header, marker);
        let post_header = self.site.post_header.render(&meta);

        RenderedArticle {
            source: key.to_string(),
            metadata: meta,
            declared_date,
            header,
            post_header,
            unwrapped_body,
            footer: self.site.footer.clone(),
        }
    }
}
