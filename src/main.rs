use anyhow::Context;
use clap::Parser;
use cardsmith::config::{build_pipeline, prepare_storage, setup_logging};
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    // a missing .env is normal
    let _ = dotenvy::dotenv();
    let cli = cardsmith::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        std::process::exit(1);
    }

    if let Err(err) = run(cli).await {
        error!("Application error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: cardsmith::cli::CliOptions) -> anyhow::Result<()> {
    let types = cardsmith::styles::init();
    tracing::debug!("Loaded {} personality styles", types);

    let pipeline =
        build_pipeline(&cli.storage, &cli.providers).context("Failed to configure providers")?;
    prepare_storage(&pipeline)
        .await
        .context("Failed to prepare storage directories")?;

    cardsmith::web::setup_server(&cli.listen_address, cli.port, pipeline).await
}
