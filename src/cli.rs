//! CLI parser
use clap::{Args, Parser};
use std::num::NonZeroU16;
use std::path::PathBuf;
use url::Url;

use crate::constants::{
    DEFAULT_CARDS_DIR, DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_RENDER_TIMEOUT_SECS,
    DEFAULT_TEMPLATES_DIR, DEFAULT_UPLOADS_DIR,
};
use crate::providers::gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::providers::openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "CARDSMITH_DEBUG")]
    /// Enable debug logging. Env: CARDSMITH_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "5000", env = "CARDSMITH_PORT")]
    /// http listener, defaults to `5000`.
    /// Env: CARDSMITH_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "CARDSMITH_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: CARDSMITH_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(flatten)]
    /// Where things are kept
    pub storage: StorageOptions,

    #[clap(flatten)]
    /// Text generation services
    pub providers: ProviderOptions,
}

/// Directories and render limits, shared by the server and `make_card`.
#[derive(Args, Debug, Clone)]
pub struct StorageOptions {
    #[clap(long, default_value = DEFAULT_CARDS_DIR, env = "CARDSMITH_CARDS_DIR")]
    /// Rendered cards. Env: CARDSMITH_CARDS_DIR
    pub cards_dir: PathBuf,
    #[clap(long, default_value = DEFAULT_UPLOADS_DIR, env = "CARDSMITH_UPLOADS_DIR")]
    /// Uploaded source photos. Env: CARDSMITH_UPLOADS_DIR
    pub uploads_dir: PathBuf,
    #[clap(long, default_value = DEFAULT_TEMPLATES_DIR, env = "CARDSMITH_TEMPLATES_DIR")]
    /// Per-type card backgrounds; missing ones are generated at startup.
    /// Env: CARDSMITH_TEMPLATES_DIR
    pub templates_dir: PathBuf,
    #[clap(
        long,
        default_value_t = DEFAULT_RENDER_TIMEOUT_SECS,
        env = "CARDSMITH_RENDER_TIMEOUT_SECS"
    )]
    /// Upper bound on drawing one card. Env: CARDSMITH_RENDER_TIMEOUT_SECS
    pub render_timeout_secs: u64,
}

/// Gemini is tried first, OpenAI second.
#[derive(Args, Debug, Clone)]
pub struct ProviderOptions {
    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    /// Env: GEMINI_API_KEY
    pub gemini_api_key: Option<String>,
    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    /// Env: OPENAI_API_KEY
    pub openai_api_key: Option<String>,
    #[clap(long, default_value = DEFAULT_GEMINI_MODEL, env = "GEMINI_MODEL")]
    /// Env: GEMINI_MODEL
    pub gemini_model: String,
    #[clap(long, default_value = DEFAULT_OPENAI_MODEL, env = "OPENAI_MODEL")]
    /// Env: OPENAI_MODEL
    pub openai_model: String,
    #[clap(long, default_value = DEFAULT_GEMINI_BASE_URL, env = "GEMINI_BASE_URL")]
    /// Env: GEMINI_BASE_URL
    pub gemini_base_url: Url,
    #[clap(long, default_value = DEFAULT_OPENAI_BASE_URL, env = "OPENAI_BASE_URL")]
    /// Env: OPENAI_BASE_URL
    pub openai_base_url: Url,
    #[clap(
        long,
        default_value_t = DEFAULT_PROVIDER_TIMEOUT_SECS,
        env = "CARDSMITH_PROVIDER_TIMEOUT_SECS"
    )]
    /// Per-attempt timeout. Env: CARDSMITH_PROVIDER_TIMEOUT_SECS
    pub provider_timeout_secs: u64,
}

#[derive(Parser, Debug)]
#[clap(name = "make_card", about = "Make one personality card from the command line")]
/// Options for the `make_card` binary
pub struct MakeCardOptions {
    /// Photo to put on the card
    pub image: PathBuf,
    #[clap(num_args = 5, value_names = ["FACT1", "FACT2", "FACT3", "FACT4", "FACT5"])]
    /// Exactly five facts about the person
    pub facts: Vec<String>,
    #[clap(long)]
    /// Optional theme hint
    pub descriptor: Option<String>,
    #[clap(long)]
    /// Card text from a file (JSON or `key: value` lines) instead of a provider
    pub content_file: Option<PathBuf>,
    #[clap(long)]
    /// Overrides the cards directory
    pub output_dir: Option<PathBuf>,
    #[clap(long, help = "Enable debug logging", env = "CARDSMITH_DEBUG")]
    /// Enable debug logging. Env: CARDSMITH_DEBUG
    pub debug: bool,

    #[clap(flatten)]
    /// Where things are kept
    pub storage: StorageOptions,

    #[clap(flatten)]
    /// Text generation services
    pub providers: ProviderOptions,
}
