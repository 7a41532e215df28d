use std::{process, sync::Arc};

use brezza::{
    application::{
        archive::ArchiveService,
        articles::ArticleService,
        error::AppError,
        listing::ListingService,
        render::{ComrakMarkdown, Markdown},
        site::SiteContext,
        source::ContentSource,
        syndication::SyndicationService,
    },
    cache::{CacheStore, FlushTimer},
    config,
    infra::{
        fs::FsContentSource,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let app = build_application(&settings).await?;

    let flush_timer = FlushTimer::spawn(app.cache.clone(), settings.cache.flush_interval);
    let result = serve_http(&settings, app.http_state).await;
    flush_timer.abort();

    result
}

struct Application {
    cache: Arc<CacheStore>,
    http_state: HttpState,
}

async fn build_application(settings: &config::Settings) -> Result<Application, AppError> {
    let source: Arc<dyn ContentSource> = Arc::new(FsContentSource::new(
        settings.content.posts_dir.clone(),
        settings.content.templates_dir.clone(),
    ));
    let markdown: Arc<dyn Markdown> = Arc::new(ComrakMarkdown::new());

    let site = Arc::new(
        SiteContext::load(source.as_ref(), &settings.content)
            .await
            .map_err(AppError::from)?,
    );
    let cache = Arc::new(CacheStore::new(settings.cache.max_entries.get()));

    let articles = Arc::new(ArticleService::new(
        source.clone(),
        markdown,
        site.clone(),
        cache.clone(),
    ));
    let archive = Arc::new(ArchiveService::new(source, articles.clone(), cache.clone()));
    let listings = Arc::new(ListingService::new(
        archive.clone(),
        articles.clone(),
        site.clone(),
        settings.feed.posts_per_page.get(),
    ));
    let syndication = Arc::new(SyndicationService::new(
        archive,
        site,
        cache.clone(),
        &settings.feed,
        settings.content.utc_offset,
        settings.cache.rss_max_age,
    ));

    Ok(Application {
        cache: cache.clone(),
        http_state: HttpState {
            articles,
            listings,
            syndication,
            cache,
        },
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(brezza::infra::error::InfraError::Io(err)))?;

    info!(
        target = "brezza::server",
        addr = %settings.server.addr,
        "brezza listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
