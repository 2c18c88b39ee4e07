//! HTTP surface: contact relay, event tracking, SEO documents and locale
//! helpers.

use crate::config::Config;
use crate::contact::{ContactRelay, ContactSubmission};
use crate::error::{AppError, TRACKING_FAILURE};
use crate::i18n::{toggle, translate_code, Locale, NavigationState};
use crate::security::analytics_authorized;
use crate::sitemap::{
    build_feed, build_hreflang_links, build_sitemap, render_sitemap_xml, robots_txt,
    sitemap_for_locale, HrefLangLinks, PAGES,
};
use crate::tracking::{EventTracker, RequestContext, TrackRequest, TrackingReport};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub struct AppState {
    pub config: Config,
    pub tracker: EventTracker,
    pub relay: ContactRelay,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, tracker: EventTracker, relay: ContactRelay) -> Self {
        Self {
            config,
            tracker,
            relay,
        }
    }

    pub fn from_config(config: Config) -> Self {
        let tracker = EventTracker::from_config(&config);
        let relay = ContactRelay::from_config(&config);
        Self::new(config, tracker, relay)
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/contact", post(submit_contact))
        .route("/api/track", post(track_event).get(tracking_report))
        .route("/api/translations/:locale", get(translations))
        .route("/api/locale", get(locale_state))
        .route("/sitemap.xml", get(sitemap_xml))
        .route("/sitemap-ko.xml", get(sitemap_ko_xml))
        .route("/robots.txt", get(robots))
        .route("/feed.xml", get(feed_en))
        .route("/ko/feed.xml", get(feed_ko))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        warn!("Rejected request body: {}", rejection.body_text());
        AppError::Validation("Invalid request body".to_string())
    })
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

// ==================== Contact ====================

async fn submit_contact(
    State(state): State<SharedState>,
    body: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let submission = json_body(body)?;
    let outcome = state.relay.submit(submission).await?;
    Ok(Json(json!({ "message": outcome.message() })))
}

// ==================== Tracking ====================

/// Answers only 200 or 500. Payloads without a usable `type` are refused
/// (never stored) and reported as a generic failure.
async fn track_event(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Json<TrackRequest>, JsonRejection>,
) -> Response {
    let result = match json_body(body) {
        Ok(request) => {
            let context = RequestContext {
                user_agent: header_value(&headers, header::USER_AGENT),
                referrer: header_value(&headers, header::REFERER),
            };
            state.tracker.record(request, context).await.map(|_| ())
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(AppError::Validation(detail)) => {
            warn!("Tracking event refused: {}", detail);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": TRACKING_FAILURE })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    days: Option<String>,
}

async fn tracking_report(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Response {
    if !analytics_authorized(state.config.analytics_api_key.as_deref(), &headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response();
    }

    let report: Result<TrackingReport, AppError> =
        state.tracker.query(query.days.as_deref()).await;
    match report {
        Ok(report) => Json(report).into_response(),
        Err(e) => e.into_response(),
    }
}

// ==================== SEO ====================

fn xml_response(content_type: &'static str, body: String) -> Response {
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

async fn sitemap_xml(State(state): State<SharedState>) -> Response {
    let entries = build_sitemap(&state.config.base_url, PAGES, Utc::now());
    xml_response("application/xml", render_sitemap_xml(&entries))
}

async fn sitemap_ko_xml(State(state): State<SharedState>) -> Response {
    let entries = build_sitemap(&state.config.base_url, PAGES, Utc::now());
    xml_response(
        "application/xml",
        render_sitemap_xml(&sitemap_for_locale(&entries, Locale::KO)),
    )
}

async fn robots(State(state): State<SharedState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_txt(&state.config.base_url),
    )
        .into_response()
}

fn feed_response(state: &AppState, locale: Locale) -> Response {
    let channel = build_feed(&state.config.base_url, locale, Utc::now());
    xml_response("application/rss+xml; charset=utf-8", channel.to_string())
}

async fn feed_en(State(state): State<SharedState>) -> Response {
    feed_response(&state, Locale::EN)
}

async fn feed_ko(State(state): State<SharedState>) -> Response {
    feed_response(&state, Locale::KO)
}

// ==================== Locale ====================

async fn translations(Path(locale): Path<String>) -> Json<Value> {
    Json(translate_code(&locale).as_json().clone())
}

#[derive(Debug, Deserialize)]
struct LocaleQuery {
    path: Option<String>,
    hash: Option<String>,
    scroll: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleState {
    /// Native name of the target language, for the switch button
    label: &'static str,
    pathname: String,
    hash: Option<String>,
    scroll_y: u32,
    href: String,
}

#[derive(Debug, Serialize)]
struct LocaleResponse {
    locale: Locale,
    toggle: ToggleState,
    links: HrefLangLinks,
}

async fn locale_state(
    State(state): State<SharedState>,
    Query(query): Query<LocaleQuery>,
) -> Json<LocaleResponse> {
    let pathname = query
        .path
        .filter(|p| p.starts_with('/'))
        .unwrap_or_else(|| "/".to_string());

    let mut current = NavigationState::new(pathname).with_scroll(query.scroll.unwrap_or(0));
    if let Some(hash) = query.hash {
        current = current.with_hash(hash);
    }

    let locale = current.locale();
    let target = toggle(&current);

    Json(LocaleResponse {
        locale,
        links: build_hreflang_links(&state.config.base_url, locale, &current.pathname),
        toggle: ToggleState {
            label: target.locale().native_name(),
            href: target.href(),
            pathname: target.pathname,
            hash: target.hash,
            scroll_y: target.scroll_y,
        },
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
