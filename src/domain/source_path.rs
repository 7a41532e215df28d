//! Source keys and the dated post-path shape.
//!
//! Every piece of content is addressed by a key relative to the posts root:
//! `2020/1/14/some-post` for posts, `about` or `index` for standalone pages.
//! The filesystem layer strips the on-disk root before keys reach anything
//! else, so normalization here only concerns `./`, leading slashes, and the
//! `.md` suffix.

use time::{Date, Month};

/// Normalize a raw path into a cache key: drop a leading `./` or `/` and one
/// trailing `.md`. Idempotent.
pub fn normalize_key(path: &str) -> String {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let trimmed = trimmed.trim_start_matches('/');
    let trimmed = trimmed.strip_suffix(".md").unwrap_or(trimmed);
    trimmed.to_string()
}

/// Whether a normalized key has the dated post shape: `year/month/day/slug`
/// with a four-digit year, one-or-two-digit month and day, and a slug of
/// word characters and hyphens. Anything else is a standalone page.
pub fn is_post_shaped(key: &str) -> bool {
    let segments: Vec<&str> = key.split('/').collect();
    let [year, month, day, slug] = segments[..] else {
        return false;
    };

    year.len() == 4
        && is_digits(year)
        && (1..=2).contains(&month.len())
        && is_digits(month)
        && (1..=2).contains(&day.len())
        && is_digits(day)
        && !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The calendar day encoded in a post key's leading three segments. `None`
/// when the segments do not form a real date.
pub fn day_from_key(key: &str) -> Option<Date> {
    let mut segments = key.split('/');
    let year: i32 = segments.next()?.parse().ok()?;
    let month = Month::try_from(segments.next()?.parse::<u8>().ok()?).ok()?;
    let day: u8 = segments.next()?.parse().ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// The site-relative link for a key: `/2020/1/14/some-post`. Idempotent, and
/// never carries the `.md` suffix.
pub fn relative_link(path: &str) -> String {
    format!("/{}", normalize_key(path))
}

/// Whether a listed file is a redirect stub rather than renderable content.
pub fn is_redirect_stub(path: &str) -> bool {
    path.ends_with(".redirect")
}

fn is_digits(segment: &str) -> bool {
    segment.chars().all(|c| c.is_ascii_digit())
}
