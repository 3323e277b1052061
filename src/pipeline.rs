//! From an uploaded photo and five facts to a stored card.

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::DynamicImage;
use tracing::{debug, info};

use crate::content::{CardContent, ContentGenerator, TraitSet};
use crate::error::CardError;
use crate::render::{CardRenderer, decode_source, encode_png};
use crate::storage::{CardStore, allowed_extension};

/// One card request as it arrives from the form or the command line.
#[derive(Clone, Debug)]
pub struct CardUpload {
    /// Name the client gave the photo; only its extension is trusted
    pub original_filename: String,
    /// Raw photo bytes
    pub image_bytes: Vec<u8>,
    /// The five facts
    pub traits: TraitSet,
    /// Optional theme hint
    pub custom_descriptor: Option<String>,
}

/// A card that made it to disk.
#[derive(Clone, Debug)]
pub struct CardOutcome {
    /// File name in the cards directory
    pub filename: String,
    /// File name of the stored photo, if the photo was stored
    pub source_image: Option<String>,
    /// What was printed on the card
    pub content: CardContent,
    /// The caller's descriptor, or the personality type name
    pub descriptor: String,
}

/// Generation, rendering and storage behind one call.
pub struct CardPipeline {
    generator: ContentGenerator,
    renderer: Arc<CardRenderer>,
    store: CardStore,
    render_timeout: Duration,
}

impl CardPipeline {
    /// Wires the pieces together.
    pub fn new(
        generator: ContentGenerator,
        renderer: CardRenderer,
        store: CardStore,
        render_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            renderer: Arc::new(renderer),
            store,
            render_timeout,
        }
    }

    /// Where cards and uploads live.
    pub fn store(&self) -> &CardStore {
        &self.store
    }

    /// The renderer, and through it the template directory.
    pub fn renderer(&self) -> &CardRenderer {
        &self.renderer
    }

    /// Names of the text providers that have credentials.
    pub fn providers_configured(&self) -> Vec<String> {
        self.generator.chain().configured_names()
    }

    /// Validates the upload, generates the text, renders and stores the card.
    /// Nothing is written to the cards directory unless every step succeeds.
    pub async fn create_card(&self, upload: CardUpload) -> Result<CardOutcome, CardError> {
        let started = Instant::now();
        if allowed_extension(&upload.original_filename).is_none() {
            return Err(CardError::UnsupportedFileType(upload.original_filename));
        }
        if !self.generator.chain().any_configured() {
            return Err(CardError::NoProvidersConfigured);
        }

        let CardUpload {
            original_filename,
            image_bytes,
            traits,
            custom_descriptor,
        } = upload;
        let custom_descriptor = custom_descriptor
            .map(|descriptor| descriptor.trim().to_string())
            .filter(|descriptor| !descriptor.is_empty());

        let image_bytes = Arc::new(image_bytes);
        let decode_bytes = image_bytes.clone();
        let source =
            tokio::task::spawn_blocking(move || decode_source(&decode_bytes)).await??;
        let source_image = self
            .store
            .save_upload(&original_filename, &image_bytes)
            .await?;

        let content = self
            .generator
            .build_content(&traits, custom_descriptor.as_deref())
            .await?;
        let filename = self.render_and_store(source, &content).await?;

        let descriptor =
            custom_descriptor.unwrap_or_else(|| content.custom_type.name().to_string());
        info!(
            "event=card_created filename={} type={} elapsed_ms={}",
            filename,
            content.custom_type,
            started.elapsed().as_millis()
        );
        Ok(CardOutcome {
            filename,
            source_image: Some(source_image),
            content,
            descriptor,
        })
    }

    /// Renders and stores a card from content that is already known, skipping
    /// the providers. Returns the card's file name.
    pub async fn render_from_content(
        &self,
        image_bytes: Vec<u8>,
        content: &CardContent,
    ) -> Result<String, CardError> {
        let source = tokio::task::spawn_blocking(move || decode_source(&image_bytes)).await??;
        self.render_and_store(source, content).await
    }

    async fn render_and_store(
        &self,
        source: DynamicImage,
        content: &CardContent,
    ) -> Result<String, CardError> {
        let style = content.custom_type.style();
        let renderer = self.renderer.clone();
        let render_content = content.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, CardError> {
            let card = renderer.render(&source, &render_content, style)?;
            encode_png(&card)
        });
        let bytes = tokio::time::timeout(self.render_timeout, task)
            .await
            .map_err(|_| CardError::RenderTimeout(self.render_timeout.as_secs()))???;

        let filename = self.store.unique_card_filename(&content.character_name);
        let path = self.store.write_card(&filename, &bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(filename)
    }
}
