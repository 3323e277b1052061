//! Config handling

use std::sync::Arc;
use std::time::Duration;

use tracing::log::LevelFilter;
use tracing::{info, warn};

use crate::cli::{ProviderOptions, StorageOptions};
use crate::content::ContentGenerator;
use crate::error::CardError;
use crate::pipeline::CardPipeline;
use crate::providers::gemini::GeminiProvider;
use crate::providers::openai::OpenAiProvider;
use crate::providers::{ProviderChain, http_client};
use crate::render::CardRenderer;
use crate::render::templates::TemplateStore;
use crate::storage::CardStore;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Builds the Gemini-then-OpenAI chain from the provider options.
pub fn build_provider_chain(options: &ProviderOptions) -> Result<ProviderChain, CardError> {
    let timeout = Duration::from_secs(options.provider_timeout_secs);
    let client = http_client(timeout)
        .map_err(|err| CardError::Setup(format!("http client: {err}")))?;

    let gemini = GeminiProvider::new(
        client.clone(),
        options.gemini_api_key.clone(),
        &options.gemini_model,
        options.gemini_base_url.clone(),
    );
    let openai = OpenAiProvider::new(
        client,
        options.openai_api_key.clone(),
        &options.openai_model,
        options.openai_base_url.clone(),
    );
    let chain = ProviderChain::new(Arc::new(gemini), Arc::new(openai), timeout);

    let configured = chain.configured_names();
    if configured.is_empty() {
        warn!("Neither GEMINI_API_KEY nor OPENAI_API_KEY is set, card generation is disabled");
    } else {
        info!("Text providers configured: {}", configured.join(", "));
    }
    Ok(chain)
}

/// Everything a request needs, wired from the command line.
pub fn build_pipeline(
    storage: &StorageOptions,
    providers: &ProviderOptions,
) -> Result<CardPipeline, CardError> {
    let chain = build_provider_chain(providers)?;
    Ok(CardPipeline::new(
        ContentGenerator::new(chain),
        CardRenderer::new(TemplateStore::new(&storage.templates_dir)),
        CardStore::new(&storage.cards_dir, &storage.uploads_dir),
        Duration::from_secs(storage.render_timeout_secs),
    ))
}

/// Creates the storage directories and any missing card templates.
pub async fn prepare_storage(pipeline: &CardPipeline) -> Result<(), CardError> {
    pipeline.store().ensure_dirs().await?;
    pipeline.renderer().templates().ensure_defaults().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliOptions;
    use clap::Parser;

    #[test]
    fn blank_key_is_not_configured() {
        let cli = CliOptions::try_parse_from([
            "cardsmith",
            "--gemini-api-key",
            "",
            "--openai-api-key",
            "sk-test",
        ])
        .expect("parse");
        let chain = build_provider_chain(&cli.providers).expect("chain");
        assert_eq!(chain.configured_names(), vec!["openai".to_string()]);
    }

    #[tokio::test]
    async fn prepare_storage_creates_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_string_lossy().to_string();
        let cli = CliOptions::try_parse_from([
            "cardsmith".to_string(),
            "--cards-dir".to_string(),
            format!("{root}/cards"),
            "--uploads-dir".to_string(),
            format!("{root}/uploads"),
            "--templates-dir".to_string(),
            format!("{root}/templates"),
        ])
        .expect("parse");

        let pipeline = build_pipeline(&cli.storage, &cli.providers).expect("pipeline");
        prepare_storage(&pipeline).await.expect("prepare");
        assert!(dir.path().join("cards").is_dir());
        assert!(dir.path().join("uploads").is_dir());
        assert!(dir.path().join("templates").join("generic.png").is_file());
    }
}
