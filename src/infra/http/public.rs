use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_TYPE, LOCATION},
    },
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use time::{Date, Month};

use super::middleware::log_responses;
use crate::{
    application::{
        articles::{ArticleService, Resolution},
        error::AppError,
        listing::{HomeView, ListingService},
        source::RedirectStub,
        syndication::SyndicationService,
    },
    cache::CacheStore,
};

#[derive(Clone)]
pub struct HttpState {
    pub articles: Arc<ArticleService>,
    pub listings: Arc<ListingService>,
    pub syndication: Arc<SyndicationService>,
    pub cache: Arc<CacheStore>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/rss", get(rss_feed))
        .route("/{slug}", get(page_or_year))
        .route("/{year}/{month}", get(month_listing))
        .route("/{year}/{month}/{day}", get(day_listing))
        .route("/{year}/{month}/{day}/{slug}", get(post))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HomeQuery {
    p: Option<String>,
}

async fn home(State(state): State<HttpState>, Query(query): Query<HomeQuery>) -> Response {
    let page = match query.p.as_deref() {
        None => 1,
        Some(raw) => match raw.parse::<usize>() {
            Ok(page) => page,
            Err(_) => return Redirect::to("/").into_response(),
        },
    };

    // Cached under the page's own synthetic key, so each home page is its
    // own cache entry. Redirects for out-of-range pages are never cached.
    let key = format!("/?p={page}");
    if let Some(cached) = state.cache.body(&key).await {
        return Html((*cached).clone()).into_response();
    }

    match state.listings.home_page(page).await {
        Ok(HomeView::Html(body)) => {
            let body = state.cache.insert_body(&key, body).await;
            Html((*body).clone()).into_response()
        }
        Ok(HomeView::Redirect(target)) => Redirect::to(&target).into_response(),
        Err(err) => error_response(&state, err).await,
    }
}

async fn rss_feed(State(state): State<HttpState>) -> Response {
    match state.syndication.rss_feed().await {
        Ok(xml) => (
            [(CONTENT_TYPE, "application/rss+xml; charset=UTF-8")],
            (*xml).clone(),
        )
            .into_response(),
        Err(err) => error_response(&state, err).await,
    }
}

/// A single non-numeric segment is a standalone page such as `/about`;
/// a numeric one is a year listing.
async fn page_or_year(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    if let Ok(year) = slug.parse::<i32>() {
        let key = format!("/{year}");
        let listings = state.listings.clone();
        return match state
            .cache
            .body_or_compute(&key, move || async move { listings.year_listing(year).await })
            .await
        {
            Ok(body) => Html((*body).clone()).into_response(),
            Err(err) => error_response(&state, err).await,
        };
    }

    serve_content(&state, &slug).await
}

async fn month_listing(
    State(state): State<HttpState>,
    Path((year, month)): Path<(String, String)>,
) -> Response {
    let (Ok(year), Ok(month_number)) = (year.parse::<i32>(), month.parse::<u8>()) else {
        return not_found(&state).await;
    };
    let Ok(month) = Month::try_from(month_number) else {
        return not_found(&state).await;
    };

    let key = format!("/{year}/{month_number}");
    let listings = state.listings.clone();
    match state
        .cache
        .body_or_compute(&key, move || async move {
            listings.month_listing(year, month).await
        })
        .await
    {
        Ok(body) => Html((*body).clone()).into_response(),
        Err(err) => error_response(&state, err).await,
    }
}

async fn day_listing(
    State(state): State<HttpState>,
    Path((year, month, day)): Path<(String, String, String)>,
) -> Response {
    let (Ok(year), Ok(month_number), Ok(day_number)) = (
        year.parse::<i32>(),
        month.parse::<u8>(),
        day.parse::<u8>(),
    ) else {
        return not_found(&state).await;
    };
    let Some(date) = Month::try_from(month_number)
        .ok()
        .and_then(|month| Date::from_calendar_date(year, month, day_number).ok())
    else {
        return not_found(&state).await;
    };

    let key = format!("/{year}/{month_number}/{day_number}");
    let listings = state.listings.clone();
    match state
        .cache
        .body_or_compute(&key, move || async move { listings.day_listing(date).await })
        .await
    {
        Ok(body) => Html((*body).clone()).into_response(),
        Err(err) => error_response(&state, err).await,
    }
}

async fn post(
    State(state): State<HttpState>,
    Path((year, month, day, slug)): Path<(String, String, String, String)>,
) -> Response {
    serve_content(&state, &format!("{year}/{month}/{day}/{slug}")).await
}

async fn serve_content(state: &HttpState, path: &str) -> Response {
    if path.ends_with(".md") {
        // Send the source file as requested.
        return match state.articles.raw_source(path).await {
            Ok(source) => (
                [(CONTENT_TYPE, "text/x-markdown; charset=UTF-8")],
                source,
            )
                .into_response(),
            Err(err) => error_response(state, err).await,
        };
    }

    match state.articles.resolve(path).await {
        Ok(Resolution::Article(article)) => Html(article.full_html()).into_response(),
        Ok(Resolution::Redirect(stub)) => redirect_response(&stub),
        Err(err) => error_response(state, err).await,
    }
}

async fn error_response(state: &HttpState, err: AppError) -> Response {
    match err {
        AppError::NotFound => not_found(state).await,
        other => other.into_response(),
    }
}

/// The 404 page is itself a renderable file; fall back to a plain response
/// when the site does not ship one.
async fn not_found(state: &HttpState) -> Response {
    match state.articles.article("404").await {
        Ok(article) => (StatusCode::NOT_FOUND, Html(article.full_html())).into_response(),
        Err(_) => AppError::NotFound.into_response(),
    }
}

fn redirect_response(stub: &RedirectStub) -> Response {
    let status = StatusCode::from_u16(stub.status)
        .ok()
        .filter(StatusCode::is_redirection)
        .unwrap_or(StatusCode::MOVED_PERMANENTLY);

    match HeaderValue::from_str(&stub.location) {
        Ok(location) => {
            let mut response = status.into_response();
            response.headers_mut().insert(LOCATION, location);
            response
        }
        Err(err) => AppError::unexpected(format!(
            "redirect target is not a valid header value: {err}"
        ))
        .into_response(),
    }
}
