//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, info, warn};

use crate::content::ParseError;
use crate::providers::GenerationFailure;

/// Everything that can stop a card from being made.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    /// Both providers failed.
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
    /// Provider output could not be turned into card content.
    #[error("could not read card content: {0}")]
    Parse(#[from] ParseError),
    /// The uploaded (or template) bytes are not a decodable image.
    #[error("invalid image: {0}")]
    InvalidImage(String),
    /// Upload filename has an extension we don't take.
    #[error("unsupported file type: {0:?}")]
    UnsupportedFileType(String),
    /// Neither the type template nor the generic one could be loaded.
    #[error("no card template available for {0}")]
    TemplateMissing(String),
    /// Drawing or encoding went wrong.
    #[error("render failed: {0}")]
    Render(String),
    /// Rendering ran past its deadline.
    #[error("render timed out after {0} seconds")]
    RenderTimeout(u64),
    /// Reading or writing a file failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    /// Neither provider has credentials.
    #[error("no text providers are configured")]
    NoProvidersConfigured,
    /// The five facts were not all supplied.
    #[error("{0}")]
    InvalidTraits(String),
    /// Startup wiring failed, e.g. the HTTP client could not be built.
    #[error("setup failed: {0}")]
    Setup(String),
}

impl From<image::ImageError> for CardError {
    fn from(err: image::ImageError) -> Self {
        CardError::Render(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CardError {
    fn from(err: tokio::task::JoinError) -> Self {
        CardError::Render(format!("render task failed: {err}"))
    }
}

/// Errors at the web boundary, each mapped to a status and one JSON message.
#[derive(Debug)]
pub enum AppError {
    /// When you didn't do the right thing
    BadRequest(String),
    /// When a requested card is not found
    NotFound(String),
    /// A card could not be made
    Card(CardError),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl From<CardError> for AppError {
    fn from(err: CardError) -> Self {
        AppError::Card(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for AppError {
    fn from(err: axum::http::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    let body = Json(json!({ "success": false, "error": message.into() }));
    (status, body).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::BadRequest(message) => {
                info!("Bad request received: {}", message);
                json_error(StatusCode::BAD_REQUEST, message)
            }
            AppError::NotFound(what) => {
                info!("404 {what}");
                json_error(StatusCode::NOT_FOUND, "Card not found")
            }
            AppError::InternalServerError(message) => {
                error!("Internal server error: {}", message);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Card(err) => match err {
                CardError::InvalidTraits(message) => json_error(StatusCode::BAD_REQUEST, message),
                CardError::UnsupportedFileType(_) => json_error(
                    StatusCode::BAD_REQUEST,
                    "Invalid file type. Please upload PNG, JPG, JPEG, GIF, or BMP.",
                ),
                CardError::InvalidImage(reason) => {
                    info!("Rejected upload: {}", reason);
                    json_error(
                        StatusCode::BAD_REQUEST,
                        "The uploaded file could not be read as an image",
                    )
                }
                CardError::Parse(reason) => {
                    warn!("Unusable card content: {}", reason);
                    json_error(
                        StatusCode::BAD_REQUEST,
                        format!("Could not read the generated card content: {reason}"),
                    )
                }
                CardError::Generation(failure) => {
                    error!("Card generation failed: {}", failure);
                    json_error(
                        StatusCode::BAD_GATEWAY,
                        "Failed to generate card text. Please try again.",
                    )
                }
                CardError::NoProvidersConfigured => {
                    error!("Generate called with no providers configured");
                    json_error(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "No text generation service is configured",
                    )
                }
                other => {
                    error!("Card creation failed: {}", other);
                    json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to create card. Please try again.",
                    )
                }
            },
        }
    }
}
