//! Rendered content carriers: articles, day groups, and listing pages.

use std::sync::Arc;

use time::{
    Date, PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::domain::metadata::Metadata;

/// Metadata key for the declared publication date and time.
pub const DATE_KEY: &str = "Date";
/// Metadata key for the article title.
pub const TITLE_KEY: &str = "Title";
/// Derived key: the site-relative link to this article.
pub const RELATIVE_LINK_KEY: &str = "relativeLink";
/// Derived key: the `<body>` class, set for dated posts only.
pub const BODY_CLASS_KEY: &str = "BodyClass";
/// Body-class value marking a dated post.
pub const POST_BODY_CLASS: &str = "post";

const DATE_TIME_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const DATE_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");
const DATE_ONLY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a declared `Date` metadata value. Accepts `2020-01-14 10:30`,
/// with optional seconds, or a bare date (midnight). `None` when the value
/// fits none of these; the article still renders, it just sorts last within
/// its day.
pub fn parse_declared_date(raw: &str) -> Option<PrimitiveDateTime> {
    let trimmed = raw.trim();
    PrimitiveDateTime::parse(trimmed, DATE_TIME_SECONDS)
        .ok()
        .or_else(|| PrimitiveDateTime::parse(trimmed, DATE_TIME).ok())
        .or_else(|| Date::parse(trimmed, DATE_ONLY).ok().map(Date::midnight))
}

/// One fully rendered article or standalone page.
///
/// Metadata is immutable once the article is built; a cache hit never
/// re-parses. The page fragments are stored separately (the RSS feed wants
/// the bare body) and joined on demand.
#[derive(Debug, Clone)]
pub struct RenderedArticle {
    /// Normalized source key, e.g. `2020/1/14/some-post`.
    pub source: String,
    /// Merged metadata: file-local values over site defaults, plus the
    /// derived link and body-class keys.
    pub metadata: Metadata,
    /// Declared publication date, parsed once at render time.
    pub declared_date: Option<PrimitiveDateTime>,
    /// Site header with this article's substitutions applied.
    pub header: String,
    /// Rendered per-article header fragment.
    pub post_header: String,
    /// Body HTML without header or footer, as the feed serves it.
    pub unwrapped_body: String,
    /// Site footer.
    pub footer: String,
}

impl RenderedArticle {
    pub fn title(&self) -> &str {
        self.metadata.get(TITLE_KEY).map(String::as_str).unwrap_or("")
    }

    pub fn relative_link(&self) -> &str {
        self.metadata
            .get(RELATIVE_LINK_KEY)
            .map(String::as_str)
            .unwrap_or("/")
    }

    /// The complete page, joined on demand from the cached fragments.
    pub fn full_html(&self) -> String {
        let mut html = String::with_capacity(
            self.header.len()
                + self.post_header.len()
                + self.unwrapped_body.len()
                + self.footer.len(),
        );
        html.push_str(&self.header);
        html.push_str(&self.post_header);
        html.push_str(&self.unwrapped_body);
        html.push_str(&self.footer);
        html
    }
}

/// All renderable posts for one calendar day, newest declared date first.
#[derive(Debug, Clone)]
pub struct DayGroup {
    pub date: Date,
    pub articles: Vec<Arc<RenderedArticle>>,
}

/// One page of the paginated home feed: whole days, never split.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub days: Vec<DayGroup>,
}

impl Page {
    pub fn article_count(&self) -> usize {
        self.days.iter().map(|day| day.articles.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn declared_dates_parse_with_and_without_time() {
        assert_eq!(
            parse_declared_date("2020-01-14 10:30"),
            Some(datetime!(2020-01-14 10:30))
        );
        assert_eq!(
            parse_declared_date("2020-01-14 10:30:45"),
            Some(datetime!(2020-01-14 10:30:45))
        );
        assert_eq!(
            parse_declared_date(" 2020-01-14 "),
            Some(datetime!(2020-01-14 0:00))
        );
        assert_eq!(parse_declared_date("next tuesday"), None);
    }

    #[test]
    fn undated_articles_sort_after_dated_ones_descending() {
        let dated = Some(datetime!(2020-01-14 10:30));
        let undated: Option<PrimitiveDateTime> = None;
        let mut order = [undated, dated];
        order.sort_by(|a, b| b.cmp(a));
        assert_eq!(order, [dated, undated]);
    }
}
