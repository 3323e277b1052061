use axum::Json;
use axum::extract::{Multipart, State};
use axum::extract::multipart::MultipartError;
use serde::Serialize;
use tracing::info;

use crate::constants::TRAIT_COUNT;
use crate::content::{CardContent, TraitSet};
use crate::error::{AppError, CardError};
use crate::pipeline::CardUpload;
use crate::storage::allowed_extension;
use crate::web::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct GenerateResponse {
    success: bool,
    character_name: String,
    filename: String,
    descriptor: String,
    source_image: Option<String>,
    card_data: CardContent,
}

#[derive(Debug, Default)]
struct GenerateForm {
    image: Option<(String, Vec<u8>)>,
    traits: [String; TRAIT_COUNT],
    custom_descriptor: Option<String>,
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(format!("Could not read upload: {}", err.body_text()))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<GenerateForm, AppError> {
    let mut form = GenerateForm::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.image = Some((filename, bytes.to_vec()));
            }
            "custom_descriptor" => form.custom_descriptor = Some(field.text().await?),
            other => {
                let slot = other
                    .strip_prefix("trait")
                    .and_then(|index| index.parse::<usize>().ok())
                    .filter(|index| (1..=TRAIT_COUNT).contains(index));
                if let Some(index) = slot {
                    form.traits[index - 1] = field.text().await?;
                }
            }
        }
    }
    Ok(form)
}

/// POST /generate: multipart photo plus five traits in, card JSON out.
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerateResponse>, AppError> {
    let form = read_form(multipart).await?;

    let Some((original_filename, image_bytes)) = form.image else {
        return Err(AppError::BadRequest("No image file provided".to_string()));
    };
    if original_filename.trim().is_empty() {
        return Err(AppError::BadRequest("No image file selected".to_string()));
    }
    if allowed_extension(&original_filename).is_none() {
        return Err(CardError::UnsupportedFileType(original_filename).into());
    }
    let traits = TraitSet::new(form.traits)?;

    info!(
        "event=generate_request upload={:?} bytes={}",
        original_filename,
        image_bytes.len()
    );
    let outcome = state
        .pipeline
        .create_card(CardUpload {
            original_filename,
            image_bytes,
            traits,
            custom_descriptor: form.custom_descriptor,
        })
        .await?;

    Ok(Json(GenerateResponse {
        success: true,
        character_name: outcome.content.character_name.clone(),
        filename: outcome.filename,
        descriptor: outcome.descriptor,
        source_image: outcome.source_image,
        card_data: outcome.content,
    }))
}
