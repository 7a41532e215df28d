//! RSS 2.0 feed generation from the archive index.
//!
//! The rendered document is cached with its own freshness window on top of
//! the wholesale flush: feed readers poll hard, and the feed only changes
//! when content does.

use std::{sync::Arc, time::Duration};

use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc2822};

use crate::{
    application::{archive::ArchiveService, error::AppError, site::SiteContext},
    cache::CacheStore,
    config::FeedSettings,
    domain::articles::DayGroup,
};

pub struct SyndicationService {
    archive: Arc<ArchiveService>,
    site: Arc<SiteContext>,
    cache: Arc<CacheStore>,
    base_url: String,
    author: String,
    title_fallback: String,
    item_limit: usize,
    utc_offset: UtcOffset,
    max_age: Duration,
}

impl SyndicationService {
    pub fn new(
        archive: Arc<ArchiveService>,
        site: Arc<SiteContext>,
        cache: Arc<CacheStore>,
        feed: &FeedSettings,
        utc_offset: UtcOffset,
        max_age: Duration,
    ) -> Self {
        Self {
            archive,
            site,
            cache,
            base_url: feed.site_url.as_str().trim_end_matches('/').to_string(),
            author: feed.author.clone(),
            title_fallback: feed.title_fallback.clone(),
            item_limit: feed.rss_item_limit,
            utc_offset,
            max_age,
        }
    }

    /// The RSS document, rebuilt only when the cached copy has aged out.
    pub async fn rss_feed(&self) -> Result<Arc<String>, AppError> {
        if let Some(fresh) = self.cache.feed(self.max_age).await {
            return Ok(fresh);
        }
        let days = self.archive.posts_by_day().await?;
        let xml = self.build(&days);
        Ok(self.cache.store_feed(xml).await)
    }

    fn build(&self, days: &[DayGroup]) -> String {
        let title = self
            .site
            .site_title()
            .unwrap_or(&self.title_fallback)
            .to_string();

        let mut items = String::new();
        let mut emitted = 0;
        'days: for day in days {
            for article in &day.articles {
                if emitted == self.item_limit {
                    break 'days;
                }
                emitted += 1;

                // Declared dates carry no zone; they are interpreted at the
                // site's configured offset.
                let stamp = article
                    .declared_date
                    .unwrap_or_else(|| day.date.midnight())
                    .assume_offset(self.utc_offset);
                let pub_date = stamp
                    .format(&Rfc2822)
                    .unwrap_or_else(|_| stamp.to_string());
                let link = format!("{}{}", self.base_url, article.relative_link());

                items.push_str(&format!(
                    "    <item>\n      <title>{}</title>\n      <link>{}</link>\n      <guid>{}</guid>\n      <pubDate>{}</pubDate>\n      <description><![CDATA[{}]]></description>\n    </item>\n",
                    xml_escape(article.title()),
                    link,
                    link,
                    pub_date,
                    article.unwrapped_body,
                ));
            }
        }

        let now = OffsetDateTime::now_utc();
        let pub_date = now.format(&Rfc2822).unwrap_or_else(|_| now.to_string());

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n  <channel>\n    <title>{}</title>\n    <link>{}/</link>\n    <description>Posts to {}</description>\n    <language>en</language>\n    <managingEditor>{}</managingEditor>\n    <pubDate>{}</pubDate>\n    <ttl>60</ttl>\n{}  </channel>\n</rss>\n",
            xml_escape(&title),
            self.base_url,
            xml_escape(&title),
            xml_escape(&self.author),
            pub_date,
            items
        )
    }
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_the_xml_significant_characters() {
        assert_eq!(
            xml_escape("a & b <tag> \"quoted\" 'single'"),
            "a &amp; b &lt;tag&gt; &quot;quoted&quot; &apos;single&apos;"
        );
    }
}
