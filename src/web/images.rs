use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH,
    LAST_MODIFIED,
};
use axum::http::response::Builder;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use httpdate::{fmt_http_date, parse_http_date};
use tracing::debug;

use crate::constants::CARD_CACHE_CONTROL;
use crate::error::AppError;
use crate::web::AppState;

/// Cache headers derived from card file metadata.
#[derive(Clone, Debug)]
pub(crate) struct CardCacheHeaders {
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
    modified_at: Option<SystemTime>,
}

impl CardCacheHeaders {
    pub(crate) fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified_at = metadata.modified().ok();
        let etag = build_etag(metadata.len(), modified_at);
        let last_modified =
            modified_at.and_then(|modified| HeaderValue::from_str(&fmt_http_date(modified)).ok());
        Self {
            etag,
            last_modified,
            modified_at,
        }
    }
}

/// Applies card cache headers to a response builder.
pub(crate) fn apply_cache_headers(mut builder: Builder, cache: &CardCacheHeaders) -> Builder {
    builder = builder.header(CACHE_CONTROL, CARD_CACHE_CONTROL.as_str());
    if let Some(etag) = &cache.etag {
        builder = builder.header(ETAG, etag.clone());
    }
    if let Some(last_modified) = &cache.last_modified {
        builder = builder.header(LAST_MODIFIED, last_modified.clone());
    }
    builder
}

/// If-None-Match wins over If-Modified-Since when both are sent.
pub(crate) fn is_not_modified(headers: &HeaderMap, cache: &CardCacheHeaders) -> bool {
    if let Some(if_none_match) = headers.get(IF_NONE_MATCH) {
        if let Ok(value) = if_none_match.to_str() {
            let value = value.trim();
            if value == "*" {
                return true;
            }
            if let Some(etag) = cache.etag.as_ref().and_then(|value| value.to_str().ok())
                && value.split(',').any(|candidate| candidate.trim() == etag)
            {
                return true;
            }
        }
        return false;
    }

    // HTTP dates carry whole seconds only
    if let (Some(if_modified_since), Some(modified_at)) =
        (headers.get(IF_MODIFIED_SINCE), cache.modified_at.and_then(unix_secs))
        && let Ok(value) = if_modified_since.to_str()
        && let Ok(since) = parse_http_date(value)
        && let Some(since) = unix_secs(since)
        && modified_at <= since
    {
        return true;
    }

    false
}

fn unix_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|duration| duration.as_secs())
}

fn build_etag(size: u64, modified_at: Option<SystemTime>) -> Option<HeaderValue> {
    let suffix = modified_at.and_then(unix_secs).unwrap_or_default();
    HeaderValue::from_str(&format!("W/\"{}-{}\"", size, suffix)).ok()
}

async fn serve_card(
    state: &AppState,
    filename: &str,
    headers: &HeaderMap,
    attachment: bool,
) -> Result<Response, AppError> {
    let Some(path) = state.pipeline.store().card_path(filename) else {
        return Err(AppError::NotFound(filename.to_string()));
    };
    let metadata = tokio::fs::metadata(&path).await?;
    let cache = CardCacheHeaders::from_metadata(&metadata);

    if is_not_modified(headers, &cache) {
        debug!("304 for {}", filename);
        let builder = Response::builder().status(StatusCode::NOT_MODIFIED);
        let builder = apply_cache_headers(builder, &cache);
        return Ok(builder.body(Body::empty())?);
    }

    let bytes = tokio::fs::read(&path).await?;
    let content_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "image/jpeg",
    };
    let mut builder = apply_cache_headers(Response::builder().status(StatusCode::OK), &cache)
        .header(CONTENT_TYPE, content_type);
    if attachment {
        // card_path only admits [A-Za-z0-9_.-], so the name needs no quoting
        builder = builder.header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        );
    }
    Ok(builder.body(Body::from(bytes))?)
}

/// GET /card/{filename}
pub(crate) async fn card_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    serve_card(&state, &filename, &headers, false).await
}

/// GET /download/{filename}
pub(crate) async fn download_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    serve_card(&state, &filename, &headers, true).await
}
