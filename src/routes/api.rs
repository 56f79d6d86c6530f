use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{AppError, Result},
    scrape::{self, SearchOptions},
    state::AppState,
    torznab,
};

#[derive(Deserialize)]
pub struct ApiParams {
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

fn xml_response(xml: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        xml,
    )
        .into_response()
}

/// The service's own origin, as seen by the client. Used to build the
/// magnet-redirect links embedded in the feed.
fn host_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

/// GET /api — the Torznab endpoint: `t=caps`, `t=search`, `t=book`.
///
/// Search always answers with well-formed (possibly empty) RSS; upstream
/// failures were already collapsed to empty pages inside the pipeline.
pub async fn torznab_api(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ApiParams>,
) -> Response {
    match params.t.as_str() {
        "caps" => xml_response(torznab::build_caps()),
        "search" | "book" => {
            // Book-search clients split the query over q/author/title;
            // the site only has one free-text search box.
            let query = [&params.q, &params.author, &params.title]
                .iter()
                .filter(|s| !s.is_empty())
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            tracing::info!(
                "Search: query={query:?} offset={} limit={}",
                params.offset,
                params.limit
            );

            let listings = scrape::search(SearchOptions {
                query: &query,
                offset: params.offset,
                limit: params.limit,
                client: &state.client,
                config: &state.config,
            })
            .await;

            xml_response(torznab::build_rss(&listings, &host_url(&headers), params.offset))
        }
        other => {
            tracing::debug!("Unsupported t parameter: {other:?}");
            xml_response(torznab::error_xml(201, "Incorrect parameter"))
        }
    }
}

#[derive(Deserialize)]
pub struct DownloadParams {
    pub url: String,
}

/// GET /api/download?url=… — resolve a detail page to its magnet URI and
/// redirect. This is the one path that surfaces HTTP errors: a redirect
/// target either exists or it doesn't.
pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<Redirect> {
    if params.url.is_empty() {
        return Err(AppError::BadRequest("missing url parameter".to_string()));
    }

    match scrape::resolve_magnet(&state.client, &params.url).await {
        Some(magnet) => Ok(Redirect::temporary(&magnet)),
        None => Err(AppError::NotFound),
    }
}

/// GET / — liveness payload.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "AudiobookBay Torznab indexer is running",
        "api_endpoint": "/api",
    }))
}

/// GET /favicon.ico — indexer clients probe this; answer quietly.
pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}
