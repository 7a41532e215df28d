//! Pipeline tests over a real on-disk posts tree: metadata precedence,
//! archive ordering, cache behavior, and pagination working together.

use std::{fs, path::Path, sync::Arc};

use brezza::{
    application::{
        archive::ArchiveService,
        articles::{ArticleService, Resolution},
        error::AppError,
        pagination::paginate,
        render::{ComrakMarkdown, Markdown},
        site::SiteContext,
        source::ContentSource,
    },
    cache::CacheStore,
    config::ContentSettings,
    domain::articles::{BODY_CLASS_KEY, POST_BODY_CLASS},
};
use brezza::infra::fs::FsContentSource;
use tempfile::TempDir;
use time::UtcOffset;

struct Fixture {
    root: TempDir,
    cache: Arc<CacheStore>,
    articles: Arc<ArticleService>,
    archive: Arc<ArchiveService>,
}

impl Fixture {
    fn posts_root(&self) -> std::path::PathBuf {
        self.root.path().join("posts")
    }
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
    fs::write(path, contents).expect("write file");
}

fn write_templates(root: &Path) {
    write(
        &root.join("templates/defaultTags.html"),
        "@@SiteTitle=Example Blog\n@@SiteAuthor=Jane\n",
    );
    write(
        &root.join("templates/header.html"),
        "<html><head><title>@@Title@@ \u{b7} @@SiteTitle@@</title></head><body class=\"@@BodyClass@@\">\n",
    );
    write(&root.join("templates/footer.html"), "</body></html>\n");
    write(
        &root.join("templates/postHeader.html"),
        "<header><h1>@@Title@@</h1><a href=\"@@relativeLink@@\">permalink</a></header>\n",
    );
}

fn write_post(root: &Path, relative: &str, title: &str, date: &str, body: &str) {
    write(
        &root.join("posts").join(relative),
        &format!("@@Title={title}\n@@Date={date}\n\n{body}\n"),
    );
}

async fn fixture_with_capacity(capacity: usize) -> Fixture {
    let root = TempDir::new().expect("temp dir");
    fs::create_dir_all(root.path().join("posts")).expect("posts dir");
    write_templates(root.path());

    let content = ContentSettings {
        posts_dir: root.path().join("posts"),
        templates_dir: root.path().join("templates"),
        metadata_marker: "@@".to_string(),
        utc_offset: UtcOffset::from_hms(-5, 0, 0).expect("offset"),
    };

    let source: Arc<dyn ContentSource> = Arc::new(FsContentSource::new(
        content.posts_dir.clone(),
        content.templates_dir.clone(),
    ));
    let site = Arc::new(
        SiteContext::load(source.as_ref(), &content)
            .await
            .expect("site context"),
    );
    let markdown: Arc<dyn Markdown> = Arc::new(ComrakMarkdown::new());
    let cache = Arc::new(CacheStore::new(capacity));
    let articles = Arc::new(ArticleService::new(
        source.clone(),
        markdown,
        site,
        cache.clone(),
    ));
    let archive = Arc::new(ArchiveService::new(source, articles.clone(), cache.clone()));

    Fixture {
        root,
        cache,
        articles,
        archive,
    }
}

async fn fixture() -> Fixture {
    fixture_with_capacity(50).await
}

#[tokio::test]
async fn file_metadata_overrides_site_defaults() {
    let fx = fixture().await;
    write(
        &fx.posts_root().join("2020/1/14/custom.md"),
        "@@Title=Custom\n@@SiteTitle=Overridden\n\nbody\n",
    );
    write_post(fx.root.path(), "2020/1/14/plain.md", "Plain", "2020-01-14 09:00", "body");

    let custom = fx.articles.article("2020/1/14/custom").await.expect("custom");
    let plain = fx.articles.article("2020/1/14/plain").await.expect("plain");

    assert_eq!(
        custom.metadata.get("SiteTitle").map(String::as_str),
        Some("Overridden")
    );
    assert_eq!(
        plain.metadata.get("SiteTitle").map(String::as_str),
        Some("Example Blog")
    );
}

#[tokio::test]
async fn posts_get_body_class_and_relative_link_pages_do_not() {
    let fx = fixture().await;
    write_post(fx.root.path(), "2020/1/14/hello.md", "Hello", "2020-01-14 09:00", "hi");
    write(&fx.posts_root().join("about.md"), "@@Title=About\n\nwho we are\n");

    let post = fx.articles.article("2020/1/14/hello").await.expect("post");
    let page = fx.articles.article("about").await.expect("page");

    assert_eq!(
        post.metadata.get(BODY_CLASS_KEY).map(String::as_str),
        Some(POST_BODY_CLASS)
    );
    assert!(post.header.contains("class=\"post\""));
    assert_eq!(
        post.metadata.get("relativeLink").map(String::as_str),
        Some("/2020/1/14/hello")
    );

    assert_eq!(page.metadata.get(BODY_CLASS_KEY), None);
    assert_eq!(
        page.metadata.get("relativeLink").map(String::as_str),
        Some("/about")
    );
}

#[tokio::test]
async fn metadata_lines_interleaved_with_body_are_extracted() {
    let fx = fixture().await;
    write(
        &fx.posts_root().join("2020/1/14/mixed.md"),
        "first paragraph\n@@Title=Mixed\nsecond paragraph\n@@Date=2020-01-14 08:00\nthird paragraph\n",
    );

    let article = fx.articles.article("2020/1/14/mixed").await.expect("mixed");

    assert_eq!(article.title(), "Mixed");
    let body = &article.unwrapped_body;
    assert!(body.contains("first paragraph"));
    assert!(body.contains("second paragraph"));
    assert!(body.contains("third paragraph"));
    assert!(!body.contains("@@Title"));
    // Body lines keep their original relative order.
    let first = body.find("first paragraph").expect("first");
    let second = body.find("second paragraph").expect("second");
    let third = body.find("third paragraph").expect("third");
    assert!(first < second && second < third);
}

#[tokio::test]
async fn placeholders_in_the_body_are_substituted() {
    let fx = fixture().await;
    write(
        &fx.posts_root().join("2020/1/14/tokens.md"),
        "@@Title=Tokens\n\nWritten for @@SiteTitle@@, and @@Unknown@@ stays.\n",
    );

    let article = fx.articles.article("2020/1/14/tokens").await.expect("tokens");

    assert!(article.unwrapped_body.contains("Written for Example Blog"));
    assert!(article.unwrapped_body.contains("@@Unknown@@ stays"));
}

#[tokio::test]
async fn cache_hit_never_rereads_the_source() {
    let fx = fixture().await;
    write_post(fx.root.path(), "2020/1/14/stable.md", "Before", "2020-01-14 09:00", "original");

    let first = fx.articles.article("2020/1/14/stable").await.expect("first render");
    assert!(first.unwrapped_body.contains("original"));

    // Change the file on disk; the cached render must keep serving.
    write_post(fx.root.path(), "2020/1/14/stable.md", "After", "2020-01-14 09:00", "rewritten");
    let second = fx.articles.article("2020/1/14/stable").await.expect("cached");
    assert!(second.unwrapped_body.contains("original"));

    // Only a flush picks up the new content.
    fx.cache.flush_all().await;
    let third = fx.articles.article("2020/1/14/stable").await.expect("fresh");
    assert!(third.unwrapped_body.contains("rewritten"));
}

#[tokio::test]
async fn capacity_one_cache_holds_only_the_latest_render() {
    let fx = fixture_with_capacity(1).await;
    write_post(fx.root.path(), "2020/1/14/x.md", "X", "2020-01-14 09:00", "x");
    write_post(fx.root.path(), "2020/1/14/y.md", "Y", "2020-01-14 10:00", "y");

    fx.articles.article("2020/1/14/x").await.expect("x renders");
    fx.articles.article("2020/1/14/y").await.expect("y renders");

    assert_eq!(fx.cache.entry_count().await, 1);
    assert!(fx.cache.article("2020/1/14/x").await.is_none());
    assert!(fx.cache.article("2020/1/14/y").await.is_some());
}

#[tokio::test]
async fn missing_post_is_not_found_and_never_cached() {
    let fx = fixture().await;

    let err = fx.articles.article("2020/1/14/ghost").await.expect_err("missing");
    assert!(matches!(err, AppError::NotFound));
    assert_eq!(fx.cache.entry_count().await, 0);
}

#[tokio::test]
async fn redirect_stub_resolves_without_being_cached() {
    let fx = fixture().await;
    write(&fx.posts_root().join("2020/1/14/moved.redirect"), "301\n/new-url\n");

    match fx.articles.resolve("2020/1/14/moved").await.expect("stub") {
        Resolution::Redirect(stub) => {
            assert_eq!(stub.status, 301);
            assert_eq!(stub.location, "/new-url");
        }
        Resolution::Article(_) => panic!("stub should not render"),
    }
    assert_eq!(fx.cache.entry_count().await, 0);
}

#[tokio::test]
async fn archive_groups_by_day_and_sorts_descending() {
    let fx = fixture().await;
    write_post(fx.root.path(), "2020/1/1/a.md", "A", "2020-01-01 10:00", "a");
    write_post(fx.root.path(), "2020/1/1/b.md", "B", "2020-01-01 14:00", "b");
    write_post(fx.root.path(), "2020/2/3/c.md", "C", "2020-02-03 08:00", "c");
    write_post(fx.root.path(), "2019/12/31/d.md", "D", "2019-12-31 23:00", "d");

    let days = fx.archive.posts_by_day().await.expect("archive");

    let dates: Vec<String> = days.iter().map(|day| day.date.to_string()).collect();
    assert_eq!(dates, vec!["2020-02-03", "2020-01-01", "2019-12-31"]);

    // Within a day, newest declared time first.
    let titles: Vec<&str> = days[1].articles.iter().map(|a| a.title()).collect();
    assert_eq!(titles, vec!["B", "A"]);
}

#[tokio::test]
async fn archive_skips_pages_stubs_and_malformed_paths() {
    let fx = fixture().await;
    write_post(fx.root.path(), "2020/1/14/real.md", "Real", "2020-01-14 09:00", "real");
    write(&fx.posts_root().join("about.md"), "@@Title=About\n\npage\n");
    write(&fx.posts_root().join("index.md"), "@@Title=Home\n");
    // A day populated only by a redirect stub contributes nothing.
    write(&fx.posts_root().join("2020/1/15/gone.redirect"), "302\n/elsewhere\n");

    let days = fx.archive.posts_by_day().await.expect("archive");

    assert_eq!(days.len(), 1);
    assert_eq!(days[0].articles.len(), 1);
    assert_eq!(days[0].articles[0].title(), "Real");
}

#[tokio::test]
async fn undated_posts_sort_after_dated_ones_within_their_day() {
    let fx = fixture().await;
    write_post(fx.root.path(), "2020/1/14/dated.md", "Dated", "2020-01-14 09:00", "a");
    write(
        &fx.posts_root().join("2020/1/14/undated.md"),
        "@@Title=Undated\n\nno date here\n",
    );

    let days = fx.archive.posts_by_day().await.expect("archive");
    let titles: Vec<&str> = days[0].articles.iter().map(|a| a.title()).collect();
    assert_eq!(titles, vec!["Dated", "Undated"]);
}

#[tokio::test]
async fn archive_is_memoized_until_flushed() {
    let fx = fixture().await;
    write_post(fx.root.path(), "2020/1/14/first.md", "First", "2020-01-14 09:00", "a");

    let before = fx.archive.posts_by_day().await.expect("archive");
    assert_eq!(before.len(), 1);

    write_post(fx.root.path(), "2020/1/15/second.md", "Second", "2020-01-15 09:00", "b");

    // Still the memoized value.
    let cached = fx.archive.posts_by_day().await.expect("cached archive");
    assert_eq!(cached.len(), 1);

    fx.cache.flush_all().await;
    let rebuilt = fx.archive.posts_by_day().await.expect("rebuilt archive");
    assert_eq!(rebuilt.len(), 2);
}

#[tokio::test]
async fn pagination_over_the_archive_respects_day_boundaries() {
    let fx = fixture().await;
    // Day one: 7 posts. Day two: 5 posts. Threshold 10 is crossed inside day
    // two, so one page holds all 12 articles.
    for n in 0..7 {
        write_post(
            fx.root.path(),
            &format!("2020/1/2/p{n}.md"),
            &format!("P{n}"),
            &format!("2020-01-02 0{n}:00"),
            "x",
        );
    }
    for n in 0..5 {
        write_post(
            fx.root.path(),
            &format!("2020/1/1/q{n}.md"),
            &format!("Q{n}"),
            &format!("2020-01-01 0{n}:00"),
            "x",
        );
    }

    let days = fx.archive.posts_by_day().await.expect("archive");
    let pages = paginate(&days, 10);

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].article_count(), 12);
    assert_eq!(pages[0].days.len(), 2);
}
