//! Day-preserving pagination over the archive index.

use crate::domain::articles::{DayGroup, Page};

/// Partition day groups (newest first) into pages of at least `per_page`
/// articles each.
///
/// Accumulation is greedy: a page closes as soon as its running article
/// count reaches the threshold, so a page can exceed `per_page` when the day
/// that crosses the line carries several posts, and the final page may be
/// under-full. A day is never split across two pages. Empty input yields no
/// pages at all.
pub fn paginate(days: &[DayGroup], per_page: usize) -> Vec<Page> {
    let mut pages = Vec::new();
    let mut current: Vec<DayGroup> = Vec::new();
    let mut count = 0;

    for day in days {
        count += day.articles.len();
        current.push(day.clone());
        if count >= per_page {
            pages.push(Page {
                number: pages.len() + 1,
                days: std::mem::take(&mut current),
            });
            count = 0;
        }
    }

    if !current.is_empty() {
        pages.push(Page {
            number: pages.len() + 1,
            days: current,
        });
    }

    pages
}
