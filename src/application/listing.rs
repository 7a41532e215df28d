//! Listing pages assembled from the archive index: the paginated home feed
//! and the year, month, and day indexes.
//!
//! There is no template language for these; like the original site they are
//! plain string assembly wrapped in the site header and footer, with the
//! listing title substituted into the header.

use std::sync::Arc;

use time::{Date, Month, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    application::{
        archive::ArchiveService, articles::ArticleService, error::AppError,
        pagination::paginate, site::SiteContext,
    },
    domain::{
        articles::{Page, RenderedArticle, TITLE_KEY},
        metadata::{self, Metadata},
    },
};

const DAY_HEADING: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:long] [day padding:none] [month repr:long] [year]");
const LISTING_HEADING: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:long], [month repr:long] [day padding:none]");

/// Outcome of a home-page request: rendered HTML, or a redirect when the
/// requested page number is out of range.
pub enum HomeView {
    Html(String),
    Redirect(String),
}

pub struct ListingService {
    archive: Arc<ArchiveService>,
    articles: Arc<ArticleService>,
    site: Arc<SiteContext>,
    per_page: usize,
}

impl ListingService {
    pub fn new(
        archive: Arc<ArchiveService>,
        articles: Arc<ArticleService>,
        site: Arc<SiteContext>,
        per_page: usize,
    ) -> Self {
        Self {
            archive,
            articles,
            site,
            per_page,
        }
    }

    /// Build one page of the home feed. Page numbers are 1-based; numbers
    /// past the end redirect to the last page, and an empty archive renders
    /// an empty first page rather than failing.
    pub async fn home_page(&self, page_number: usize) -> Result<HomeView, AppError> {
        if page_number == 0 {
            return Ok(HomeView::Redirect("/".to_string()));
        }

        // The index page supplies the home header's metadata.
        let index = self.articles.article("index").await?;
        let days = self.archive.posts_by_day().await?;
        let pages = paginate(&days, self.per_page);

        if pages.is_empty() {
            if page_number > 1 {
                return Ok(HomeView::Redirect("/".to_string()));
            }
            return Ok(HomeView::Html(self.assemble_home(&index, None, 0)));
        }

        if page_number > pages.len() {
            let target = if pages.len() > 1 {
                format!("/?p={}", pages.len())
            } else {
                "/".to_string()
            };
            return Ok(HomeView::Redirect(target));
        }

        let page = &pages[page_number - 1];
        Ok(HomeView::Html(self.assemble_home(&index, Some(page), pages.len())))
    }

    /// The year index: posts grouped under month headings, newest first.
    pub async fn year_listing(&self, year: i32) -> Result<String, AppError> {
        let days = self.archive.posts_by_day().await?;

        let mut body = format!("<h1>Posts for {year}</h1>");
        let mut current_month: Option<Month> = None;
        for day in days.iter().filter(|day| day.date.year() == year) {
            if current_month != Some(day.date.month()) {
                if current_month.is_some() {
                    body.push_str("</ul>");
                }
                current_month = Some(day.date.month());
                body.push_str(&format!(
                    "<h2><a href=\"/{year}/{}/\">{}</a></h2>\n<ul>",
                    day.date.month() as u8,
                    day.date.month()
                ));
            }
            for article in &day.articles {
                body.push_str(&format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    article.relative_link(),
                    article.title()
                ));
            }
        }
        if current_month.is_some() {
            body.push_str("</ul>");
        }

        Ok(self.wrap(&format!("Posts for {year}"), &body))
    }

    /// The month index: one heading per day that has posts, newest day first.
    pub async fn month_listing(&self, year: i32, month: Month) -> Result<String, AppError> {
        let days = self.archive.posts_by_day().await?;

        let mut body = String::new();
        for day in days
            .iter()
            .filter(|day| day.date.year() == year && day.date.month() == month)
        {
            body.push_str(&format!("<h1>{}</h1><ul>", heading(day.date)));
            for article in &day.articles {
                body.push_str(&format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    article.relative_link(),
                    article.title()
                ));
            }
            body.push_str("</ul>");
        }

        Ok(self.wrap(&format!("{month} {year}"), &body))
    }

    /// The day index: that day's posts, oldest first. NotFound when the day
    /// has no posts.
    pub async fn day_listing(&self, date: Date) -> Result<String, AppError> {
        let days = self.archive.posts_by_day().await?;
        let day = days
            .iter()
            .find(|day| day.date == date)
            .ok_or(AppError::NotFound)?;

        let mut body = format!("<h1>Posts from {}</h1><ul>", heading(date));
        for article in day.articles.iter().rev() {
            body.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>",
                article.relative_link(),
                article.title()
            ));
        }
        body.push_str("</ul>");

        Ok(self.wrap(&heading(date), &body))
    }

    fn assemble_home(
        &self,
        index: &RenderedArticle,
        page: Option<&Page>,
        total_pages: usize,
    ) -> String {
        let mut body = String::new();

        if let Some(page) = page {
            for day in &page.days {
                body.push_str(&format!(
                    "<h2 class=\"day\"><a href=\"/{}/{}/{}/\">{}</a></h2>\n",
                    day.date.year(),
                    day.date.month() as u8,
                    day.date.day(),
                    day.date
                        .format(DAY_HEADING)
                        .unwrap_or_else(|_| day.date.to_string())
                ));
                for article in &day.articles {
                    body.push_str("<article>\n");
                    body.push_str(&article.post_header);
                    body.push_str(&article.unwrapped_body);
                    body.push_str("</article>\n");
                }
            }

            let mut nav = String::new();
            if page.number > 1 {
                nav.push_str(&format!(
                    "<a class=\"newer\" href=\"/?p={}\">Newer</a>",
                    page.number - 1
                ));
            }
            if page.number < total_pages {
                nav.push_str(&format!(
                    "<a class=\"older\" href=\"/?p={}\">Older</a>",
                    page.number + 1
                ));
            }
            if !nav.is_empty() {
                body.push_str(&format!("<nav class=\"pagination\">{nav}</nav>\n"));
            }
        }

        // The home page shows the site title alone, not "page title - site
        // title", so the <title> contents get replaced wholesale.
        let site_title = index
            .metadata
            .get("SiteTitle")
            .map(String::as_str)
            .unwrap_or("");
        let header = override_title(&index.header, site_title);
        format!("{header}{body}{}", index.footer)
    }

    fn wrap(&self, title: &str, body: &str) -> String {
        let mut replacements = Metadata::new();
        replacements.insert(TITLE_KEY.to_string(), title.to_string());
        let header =
            metadata::apply_replacements(&replacements, &self.site.header, &self.site.marker);
        format!("{header}{body}{}", self.site.footer)
    }
}

fn heading(date: Date) -> String {
    date.format(LISTING_HEADING)
        .unwrap_or_else(|_| date.to_string())
}

fn override_title(header: &str, site_title: &str) -> String {
    let Some(open) = header.find("<title>") else {
        return header.to_string();
    };
    let start = open + "<title>".len();
    let Some(close) = header[start..].find("</title>") else {
        return header.to_string();
    };
    format!("{}{}{}", &header[..start], site_title, &header[start + close..])
}
