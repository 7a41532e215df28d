//! The all-posts index: every renderable post grouped by calendar day,
//! newest first, memoized as one cache value.

use std::{collections::BTreeMap, sync::Arc};

use metrics::counter;
use time::Date;
use tracing::debug;

use crate::{
    application::{articles::ArticleService, error::AppError, source::ContentSource},
    cache::CacheStore,
    domain::{articles::DayGroup, source_path},
};

pub struct ArchiveService {
    source: Arc<dyn ContentSource>,
    articles: Arc<ArticleService>,
    cache: Arc<CacheStore>,
}

impl ArchiveService {
    pub fn new(
        source: Arc<dyn ContentSource>,
        articles: Arc<ArticleService>,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self {
            source,
            articles,
            cache,
        }
    }

    /// All posts grouped by day, days descending, articles within a day
    /// descending by declared date. The first call after a flush renders
    /// every post, so the result is memoized until the next flush.
    pub async fn posts_by_day(&self) -> Result<Arc<Vec<DayGroup>>, AppError> {
        if let Some(cached) = self.cache.archive().await {
            return Ok(cached);
        }
        let built = self.build().await?;
        Ok(self.cache.store_archive(built).await)
    }

    async fn build(&self) -> Result<Vec<DayGroup>, AppError> {
        counter!("brezza_archive_rebuild_total").increment(1);

        let files = self.source.list_post_files().await?;
        let mut keys_by_day: BTreeMap<Date, Vec<String>> = BTreeMap::new();
        for file in files {
            if source_path::is_redirect_stub(&file) {
                continue;
            }
            let key = source_path::normalize_key(&file);
            if !source_path::is_post_shaped(&key) {
                continue;
            }
            // The day comes from the path segments, not from file content.
            let Some(day) = source_path::day_from_key(&key) else {
                continue;
            };
            keys_by_day.entry(day).or_default().push(key);
        }

        let mut days = Vec::with_capacity(keys_by_day.len());
        for (date, keys) in keys_by_day.into_iter().rev() {
            let mut articles = Vec::with_capacity(keys.len());
            for key in keys {
                articles.push(self.articles.article(&key).await?);
            }
            articles.sort_by(|a, b| b.declared_date.cmp(&a.declared_date));
            days.push(DayGroup { date, articles });
        }

        debug!(
            target = "brezza::archive",
            days = days.len(),
            "archive index built"
        );
        Ok(days)
    }
}
