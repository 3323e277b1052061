//! Card geometry, limits, defaults and timeouts.

use std::sync::LazyLock;

/// Width of every rendered card, in pixels.
pub const CARD_WIDTH: u32 = 600;

/// Height of every rendered card, in pixels.
pub const CARD_HEIGHT: u32 = 840;

/// Where rendered cards land unless configured otherwise.
pub const DEFAULT_CARDS_DIR: &str = "./generated_cards";

/// Where uploaded source photos land unless configured otherwise.
pub const DEFAULT_UPLOADS_DIR: &str = "./original_photos";

/// Where per-type card templates live unless configured otherwise.
pub const DEFAULT_TEMPLATES_DIR: &str = "./card_templates";

/// Largest accepted request body (multipart upload included).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Extensions accepted for uploaded photos.
pub const ALLOWED_UPLOAD_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// Number of facts a user must supply.
pub const TRAIT_COUNT: usize = 5;

/// Longest character name we render.
pub const MAX_NAME_CHARS: usize = 25;

/// Longest effect description we render.
pub const MAX_EFFECT_CHARS: usize = 280;

/// Lowest numeric stat value.
pub const STAT_MIN: u32 = 100;
/// Highest numeric stat value.
pub const STAT_MAX: u32 = 3000;
/// Numeric stats are rounded to a multiple of this.
pub const STAT_STEP: u32 = 100;

/// Longest text (non-numeric) stat value.
pub const MAX_STAT_TEXT_CHARS: usize = 8;

/// Longest stat label.
pub const MAX_STAT_LABEL_CHARS: usize = 16;

/// Default provider timeout, seconds.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Default render timeout, seconds.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 20;

/// Max age (in seconds) for card image cache entries.
pub const CARD_CACHE_MAX_AGE_SECONDS: u64 = 60 * 60 * 24;

/// Cache-Control value for card responses. Cards never change once written.
pub static CARD_CACHE_CONTROL: LazyLock<String> =
    LazyLock::new(|| format!("public, max-age={}, immutable", CARD_CACHE_MAX_AGE_SECONDS));
