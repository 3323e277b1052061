use askama::Template;
use askama_web::WebTemplate;
use axum::Json;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

use crate::constants::TRAIT_COUNT;
use crate::error::AppError;
use crate::storage::GalleryEntry;
use crate::styles::{PersonalityType, TypeFamily};
use crate::web::AppState;

pub(crate) struct TypeEntry {
    pub(crate) name: &'static str,
    pub(crate) icon: &'static str,
    pub(crate) description: &'static str,
}

pub(crate) struct TypeGroup {
    pub(crate) heading: &'static str,
    pub(crate) types: Vec<TypeEntry>,
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) fact_numbers: Vec<usize>,
    pub(crate) groups: Vec<TypeGroup>,
    pub(crate) providers_configured: bool,
}

pub(crate) struct GalleryCard {
    pub(crate) filename: String,
    pub(crate) size_kb: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "gallery.html")]
pub(crate) struct GalleryTemplate {
    pub(crate) cards: Vec<GalleryCard>,
}

/// One row of `/api/cards`.
#[derive(Debug, Serialize)]
pub(crate) struct ApiCard {
    filename: String,
    size: u64,
    url: String,
}

impl From<GalleryEntry> for ApiCard {
    fn from(entry: GalleryEntry) -> Self {
        let url = format!("/card/{}", entry.filename);
        Self {
            filename: entry.filename,
            size: entry.size,
            url,
        }
    }
}

fn type_groups() -> Vec<TypeGroup> {
    TypeFamily::ALL
        .iter()
        .map(|family| TypeGroup {
            heading: family.heading(),
            types: PersonalityType::ALL
                .iter()
                .filter(|ty| ty.family() == *family)
                .map(|ty| TypeEntry {
                    name: ty.name(),
                    icon: ty.style().icon,
                    description: ty.description(),
                })
                .collect(),
        })
        .collect()
}

/// handles the / GET
pub(crate) async fn index_handler(State(state): State<AppState>) -> Response {
    IndexTemplate {
        fact_numbers: (1..=TRAIT_COUNT).collect(),
        groups: type_groups(),
        providers_configured: !state.pipeline.providers_configured().is_empty(),
    }
    .into_response()
}

pub(crate) async fn gallery_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let cards = state
        .pipeline
        .store()
        .list_cards()
        .await?
        .into_iter()
        .map(|entry| GalleryCard {
            size_kb: format!("{:.1}", entry.size as f64 / 1024.0),
            filename: entry.filename,
        })
        .collect();
    Ok(GalleryTemplate { cards }.into_response())
}

pub(crate) async fn api_cards_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApiCard>>, AppError> {
    let cards = state.pipeline.store().list_cards().await?;
    Ok(Json(cards.into_iter().map(ApiCard::from).collect()))
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "providers_configured": state.pipeline.providers_configured(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}
