//! Makes one card from the command line, e.g.
//! `make_card me.jpg "Loves karaoke" "Owns six cats" "Never on time" "Bakes at 3am" "Hates Mondays"`

use anyhow::Context;
use cardsmith::cli::MakeCardOptions;
use cardsmith::config::{build_pipeline, prepare_storage, setup_logging};
use cardsmith::content::{TraitSet, parse_card_content};
use cardsmith::pipeline::CardUpload;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let mut opts = MakeCardOptions::parse();
    setup_logging(opts.debug).map_err(|err| anyhow::anyhow!("logging: {err}"))?;
    cardsmith::styles::init();

    if let Some(output_dir) = opts.output_dir.take() {
        opts.storage.cards_dir = output_dir;
    }
    let traits = TraitSet::new(&opts.facts)?;
    let image_bytes = tokio::fs::read(&opts.image)
        .await
        .with_context(|| format!("Failed to read {}", opts.image.display()))?;

    let pipeline = build_pipeline(&opts.storage, &opts.providers)?;
    prepare_storage(&pipeline).await?;

    let (filename, content, descriptor) = match &opts.content_file {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let content = parse_card_content(&raw)?;
            let filename = pipeline.render_from_content(image_bytes, &content).await?;
            let descriptor = opts
                .descriptor
                .clone()
                .unwrap_or_else(|| content.custom_type.name().to_string());
            (filename, content, descriptor)
        }
        None => {
            let original_filename = opts
                .image
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();
            let outcome = pipeline
                .create_card(CardUpload {
                    original_filename,
                    image_bytes,
                    traits,
                    custom_descriptor: opts.descriptor.clone(),
                })
                .await?;
            (outcome.filename, outcome.content, outcome.descriptor)
        }
    };

    println!("Card:        {}", content.character_name);
    println!("Type:        {} ({})", content.custom_type, descriptor);
    for stat in &content.stats {
        println!("Stat:        {}", stat);
    }
    println!("Effect:      {}", content.effect_description);
    println!("Visuals:     {}", content.visual_effects.join(", "));
    for warning in &content.warnings {
        println!("Warning:     {}", warning);
    }
    println!(
        "Saved to:    {}",
        pipeline.store().cards_dir().join(filename).display()
    );
    Ok(())
}
