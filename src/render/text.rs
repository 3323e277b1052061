//! Bundled fonts, measuring, wrapping and size fitting.

use std::sync::LazyLock;

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::error;

use crate::error::CardError;
use crate::styles::TypeFace;

const ELLIPSIS: &str = "...";

/// The four bundled DejaVu faces.
pub struct FontSet {
    sans: FontRef<'static>,
    sans_bold: FontRef<'static>,
    serif_bold: FontRef<'static>,
    mono_bold: FontRef<'static>,
}

impl FontSet {
    fn load() -> Result<Self, ab_glyph::InvalidFont> {
        Ok(Self {
            sans: FontRef::try_from_slice(include_bytes!("../../assets/fonts/DejaVuSans.ttf"))?,
            sans_bold: FontRef::try_from_slice(include_bytes!(
                "../../assets/fonts/DejaVuSans-Bold.ttf"
            ))?,
            serif_bold: FontRef::try_from_slice(include_bytes!(
                "../../assets/fonts/DejaVuSerif-Bold.ttf"
            ))?,
            mono_bold: FontRef::try_from_slice(include_bytes!(
                "../../assets/fonts/DejaVuSansMono-Bold.ttf"
            ))?,
        })
    }

    /// The font for a face.
    pub fn face(&self, face: TypeFace) -> &FontRef<'static> {
        match face {
            TypeFace::Sans => &self.sans,
            TypeFace::SansBold => &self.sans_bold,
            TypeFace::SerifBold => &self.serif_bold,
            TypeFace::MonoBold => &self.mono_bold,
        }
    }
}

static FONTS: LazyLock<Option<FontSet>> = LazyLock::new(|| match FontSet::load() {
    Ok(fonts) => Some(fonts),
    Err(err) => {
        error!("Bundled fonts failed to load: {}", err);
        None
    }
});

/// The bundled fonts, parsed once.
pub fn fonts() -> Result<&'static FontSet, CardError> {
    FONTS
        .as_ref()
        .ok_or_else(|| CardError::Render("bundled fonts are unusable".to_string()))
}

/// Advance width of `text` at `px`, kerning included.
pub fn measure(font: &impl Font, px: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(PxScale::from(px));
    let mut width = 0.0f32;
    let mut previous = None;
    for c in text.chars() {
        let glyph = scaled.glyph_id(c);
        if let Some(previous) = previous {
            width += scaled.kern(previous, glyph);
        }
        width += scaled.h_advance(glyph);
        previous = Some(glyph);
    }
    width
}

/// Distance between baselines of consecutive wrapped lines.
pub fn line_height(font: &impl Font, px: f32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(px));
    (scaled.height() + scaled.line_gap()).ceil()
}

/// Single line of text at the size it fits.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedLine {
    /// Possibly ellipsised
    pub text: String,
    /// Pixel size
    pub px: f32,
}

/// Wrapped text at the size it fits.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedBlock {
    /// Lines, top to bottom
    pub lines: Vec<String>,
    /// Pixel size
    pub px: f32,
    /// Line advance at `px`
    pub line_height: f32,
}

/// Shrinks `text` until it fits `max_width`; below `min_px` it is ellipsised.
pub fn fit_line(
    font: &impl Font,
    text: &str,
    max_width: f32,
    max_px: f32,
    min_px: f32,
) -> FittedLine {
    let mut px = max_px;
    while px >= min_px {
        if measure(font, px, text) <= max_width {
            return FittedLine {
                text: text.to_string(),
                px,
            };
        }
        px -= 1.0;
    }
    FittedLine {
        text: ellipsize(font, min_px, text, max_width),
        px: min_px,
    }
}

/// Returns `text` if it fits, otherwise the longest prefix that fits with
/// `...` appended.
pub fn ellipsize(font: &impl Font, px: f32, text: &str, max_width: f32) -> String {
    if measure(font, px, text) <= max_width {
        return text.to_string();
    }
    with_ellipsis(font, px, text, max_width)
}

fn with_ellipsis(font: &impl Font, px: f32, text: &str, max_width: f32) -> String {
    let chars: Vec<char> = text.chars().collect();
    for keep in (0..=chars.len()).rev() {
        let prefix: String = chars[..keep].iter().collect();
        let candidate = format!("{}{}", prefix.trim_end(), ELLIPSIS);
        if measure(font, px, &candidate) <= max_width {
            return candidate;
        }
    }
    String::new()
}

/// Greedy word wrap. Explicit newlines start a new line; a word wider than the
/// whole line is broken between characters.
pub fn wrap(font: &impl Font, px: f32, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(font, px, &candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure(font, px, word) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    let mut next = current.clone();
                    next.push(c);
                    if !current.is_empty() && measure(font, px, &next) > max_width {
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    } else {
                        current = next;
                    }
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Largest size in `min_px..=max_px` at which the wrapped text fits the box.
/// At `min_px` whatever does not fit is dropped and the last kept line ends
/// in `...`.
pub fn fit_block(
    font: &impl Font,
    text: &str,
    max_width: f32,
    max_height: f32,
    max_px: f32,
    min_px: f32,
) -> FittedBlock {
    let mut px = max_px;
    while px >= min_px {
        let lines = wrap(font, px, text, max_width);
        let height = line_height(font, px);
        if lines.len() as f32 * height <= max_height {
            return FittedBlock {
                lines,
                px,
                line_height: height,
            };
        }
        px -= 1.0;
    }

    let height = line_height(font, min_px);
    let capacity = (max_height / height).floor().max(0.0) as usize;
    let mut lines = wrap(font, min_px, text, max_width);
    if lines.len() > capacity {
        lines.truncate(capacity);
        if let Some(last) = lines.last_mut() {
            *last = with_ellipsis(font, min_px, last, max_width);
        }
    }
    FittedBlock {
        lines,
        px: min_px,
        line_height: height,
    }
}

/// Draws one line with its top-left corner at (`x`, `y`).
pub fn draw_line(
    canvas: &mut RgbaImage,
    font: &impl Font,
    px: f32,
    x: i32,
    y: i32,
    color: Rgba<u8>,
    text: &str,
) {
    if text.is_empty() {
        return;
    }
    draw_text_mut(canvas, color, x, y, PxScale::from(px), font, text);
}
