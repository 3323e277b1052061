//! Card composition: template, photo window, header, stats and ability text,
//! then the style's effect passes.

pub mod effects;
pub mod templates;
pub mod text;

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::debug;

use crate::constants::{CARD_HEIGHT, CARD_WIDTH};
use crate::content::CardContent;
use crate::error::CardError;
use crate::styles::{StyleDescriptor, TypeFace};
use effects::mix;
use templates::TemplateStore;
use text::{draw_line, fit_block, fit_line, fonts, line_height, measure};

/// Axis-aligned box on the card, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Region {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Region {
    const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    const fn inset(self, by: u32) -> Self {
        Self::new(
            self.x + by,
            self.y + by,
            self.width - 2 * by,
            self.height - 2 * by,
        )
    }
}

const HEADER: Region = Region::new(20, 30, 560, 80);
const PHOTO_FRAME: Region = Region::new(30, 130, 540, 320);
const PHOTO_INSET: u32 = 8;
const STATS_PANEL: Region = Region::new(20, 475, 560, 140);
const ABILITY_PANEL: Region = Region::new(20, 640, 560, 180);
const ABILITY_TEXT: Region = Region::new(40, 655, 520, 150);

const PANEL_RADIUS: u32 = 14;
const TEXT_LEFT: u32 = 40;
const TEXT_WIDTH: f32 = 520.0;
const BADGE_HEIGHT: u32 = 36;
const BADGE_PX: f32 = 18.0;
const STAT_ROW_OFFSET: u32 = 18;
const STAT_ROW_PITCH: u32 = 62;
const STAT_BAR_OFFSET: u32 = 32;
const STAT_BAR_HEIGHT: u32 = 14;

/// Composites cards over the templates in a [TemplateStore]. Writes no files.
#[derive(Clone, Debug)]
pub struct CardRenderer {
    templates: TemplateStore,
}

impl CardRenderer {
    /// Renderer over the given templates.
    pub fn new(templates: TemplateStore) -> Self {
        Self { templates }
    }

    /// The template store this renderer reads.
    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Renders one 600x840 card. Same inputs, same pixels.
    pub fn render(
        &self,
        source: &DynamicImage,
        content: &CardContent,
        style: &StyleDescriptor,
    ) -> Result<RgbaImage, CardError> {
        let fonts = fonts()?;
        let mut card = self.templates.load(style.personality_type)?;
        let palette = &style.palette;
        debug!(
            "Rendering {:?} as {}",
            content.character_name, style.personality_type
        );

        // header
        let (primary, secondary) = (palette.primary, palette.secondary);
        fill_rounded(&mut card, HEADER, PANEL_RADIUS, primary, secondary, false);
        let badge_font = fonts.face(TypeFace::SansBold);
        let badge_text = format!("{} {}", style.icon, content.custom_type);
        let badge_width =
            (measure(badge_font, BADGE_PX, &badge_text).ceil() as u32 + 24).min(220);
        let badge = Region::new(
            HEADER.x + HEADER.width - 16 - badge_width,
            HEADER.y + (HEADER.height - BADGE_HEIGHT) / 2,
            badge_width,
            BADGE_HEIGHT,
        );
        fill_rounded(&mut card, badge, BADGE_HEIGHT / 2, palette.accent, palette.accent, false);
        let badge_line = fit_line(
            badge_font,
            &badge_text,
            (badge_width - 24) as f32,
            BADGE_PX,
            10.0,
        );
        draw_line(
            &mut card,
            badge_font,
            badge_line.px,
            (badge.x + 12) as i32,
            centred(badge, line_height(badge_font, badge_line.px)),
            palette.background,
            &badge_line.text,
        );

        let title_font = fonts.face(style.title_face);
        let name_left = HEADER.x + 16;
        let name_width = (badge.x - 12 - name_left) as f32;
        let name = fit_line(title_font, &content.character_name, name_width - 2.0, 34.0, 14.0);
        let name_y = centred(HEADER, line_height(title_font, name.px));
        draw_line(
            &mut card,
            title_font,
            name.px,
            name_left as i32 + 2,
            name_y + 2,
            palette.background,
            &name.text,
        );
        draw_line(
            &mut card,
            title_font,
            name.px,
            name_left as i32,
            name_y,
            palette.text,
            &name.text,
        );

        // photo window
        fill_rounded(&mut card, PHOTO_FRAME, 12, palette.accent, palette.accent, false);
        let mat = mix(palette.secondary, palette.background, 0.5);
        fill_rounded(&mut card, PHOTO_FRAME.inset(3), 10, mat, mat, false);
        let window = PHOTO_FRAME.inset(PHOTO_INSET);
        let photo = source
            .resize_to_fill(window.width, window.height, FilterType::Lanczos3)
            .to_rgba8();
        paste_rounded(&mut card, &photo, window, 8);

        // stats
        fill_rounded(&mut card, STATS_PANEL, PANEL_RADIUS, primary, secondary, false);
        let stat_font = fonts.face(style.stat_face);
        for (index, stat) in content.stats.iter().enumerate() {
            let row_y = STATS_PANEL.y + STAT_ROW_OFFSET + index as u32 * STAT_ROW_PITCH;
            let line = fit_line(stat_font, &stat.to_string(), TEXT_WIDTH, 24.0, 12.0);
            draw_line(
                &mut card,
                stat_font,
                line.px,
                TEXT_LEFT as i32,
                row_y as i32,
                palette.text,
                &line.text,
            );

            let track = Region::new(
                TEXT_LEFT,
                row_y + STAT_BAR_OFFSET,
                TEXT_WIDTH as u32,
                STAT_BAR_HEIGHT,
            );
            let round = STAT_BAR_HEIGHT / 2;
            let (track_color, bar_color) = (palette.background, palette.accent);
            fill_rounded(&mut card, track, round, track_color, track_color, false);
            let filled = (TEXT_WIDTH * stat.fill_ratio().clamp(0.0, 1.0)).round() as u32;
            if filled > 0 {
                let bar = Region::new(track.x, track.y, filled, track.height);
                fill_rounded(&mut card, bar, round, bar_color, bar_color, false);
            }
        }

        // ability
        let parchment_top = mix(palette.primary, palette.background, 0.65);
        let parchment_bottom = mix(palette.secondary, palette.background, 0.65);
        fill_rounded(
            &mut card,
            ABILITY_PANEL,
            PANEL_RADIUS,
            parchment_top,
            parchment_bottom,
            true,
        );
        if !content.effect_description.is_empty() {
            let body_font = fonts.face(TypeFace::Sans);
            let block = fit_block(
                body_font,
                &content.effect_description,
                ABILITY_TEXT.width as f32,
                ABILITY_TEXT.height as f32,
                22.0,
                12.0,
            );
            for (index, line) in block.lines.iter().enumerate() {
                let y = ABILITY_TEXT.y as f32 + index as f32 * block.line_height;
                draw_line(
                    &mut card,
                    body_font,
                    block.px,
                    ABILITY_TEXT.x as i32,
                    y as i32,
                    palette.text,
                    line,
                );
            }
        }

        effects::apply(&mut card, style);
        Ok(card)
    }
}

/// Top y that vertically centres a line of `height` in `region`.
fn centred(region: Region, height: f32) -> i32 {
    region.y as i32 + ((region.height as f32 - height) / 2.0).round() as i32
}

fn inside_rounded(x: u32, y: u32, width: u32, height: u32, radius: u32) -> bool {
    let radius = radius.min(width / 2).min(height / 2) as i64;
    let (x, y, width, height) = (x as i64, y as i64, width as i64, height as i64);
    let cx = if x < radius {
        radius
    } else if x >= width - radius {
        width - radius - 1
    } else {
        return true;
    };
    let cy = if y < radius {
        radius
    } else if y >= height - radius {
        height - radius - 1
    } else {
        return true;
    };
    (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius
}

/// Rounded rectangle with a linear gradient, left to right or top to bottom.
fn fill_rounded(
    card: &mut RgbaImage,
    region: Region,
    radius: u32,
    from: Rgba<u8>,
    to: Rgba<u8>,
    vertical: bool,
) {
    for dy in 0..region.height {
        for dx in 0..region.width {
            if !inside_rounded(dx, dy, region.width, region.height, radius) {
                continue;
            }
            let (x, y) = (region.x + dx, region.y + dy);
            if x >= card.width() || y >= card.height() {
                continue;
            }
            let t = if vertical {
                dy as f32 / region.height.max(2).saturating_sub(1) as f32
            } else {
                dx as f32 / region.width.max(2).saturating_sub(1) as f32
            };
            card.put_pixel(x, y, mix(from, to, t));
        }
    }
}

/// Copies `photo` into `region` through a rounded mask, honouring its alpha.
fn paste_rounded(card: &mut RgbaImage, photo: &RgbaImage, region: Region, radius: u32) {
    for (dx, dy, pixel) in photo.enumerate_pixels() {
        if dx >= region.width
            || dy >= region.height
            || !inside_rounded(dx, dy, region.width, region.height, radius)
        {
            continue;
        }
        let (x, y) = (region.x + dx, region.y + dy);
        let under = *card.get_pixel(x, y);
        card.put_pixel(x, y, mix(under, *pixel, pixel[3] as f32 / 255.0));
    }
}

/// Decodes uploaded bytes, sniffing the format from the content.
pub fn decode_source(bytes: &[u8]) -> Result<DynamicImage, CardError> {
    if bytes.len() < 4 {
        return Err(CardError::InvalidImage("image is too short".to_string()));
    }
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| CardError::InvalidImage(format!("failed to guess image format: {err}")))?;
    if reader.format().is_none() {
        return Err(CardError::InvalidImage("unrecognised image format".to_string()));
    }
    let image = reader
        .decode()
        .map_err(|err| CardError::InvalidImage(format!("failed to decode image: {err}")))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(CardError::InvalidImage("image has no pixels".to_string()));
    }
    Ok(image)
}

/// PNG bytes for a rendered card.
pub fn encode_png(card: &RgbaImage) -> Result<Vec<u8>, CardError> {
    if card.dimensions() != (CARD_WIDTH, CARD_HEIGHT) {
        return Err(CardError::Render(format!(
            "card is {}x{}, expected {}x{}",
            card.width(),
            card.height(),
            CARD_WIDTH,
            CARD_HEIGHT
        )));
    }
    let mut bytes = Vec::new();
    card.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Stat, StatValue};
    use crate::styles::{PersonalityType, hex};
    use templates::generate_template;

    fn content(ty: PersonalityType, name: &str, effect: &str) -> CardContent {
        CardContent {
            character_name: name.to_string(),
            custom_type: ty,
            stats: [
                Stat {
                    label: "Chaos".to_string(),
                    value: StatValue::Number(2400),
                },
                Stat {
                    label: "Luck".to_string(),
                    value: StatValue::Text("???".to_string()),
                },
            ],
            effect_description: effect.to_string(),
            visual_effects: vec!["glitch".to_string()],
            warnings: Vec::new(),
        }
    }

    fn photo() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(500, 500, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
        }))
    }

    fn renderer_with(types: &[PersonalityType]) -> (tempfile::TempDir, CardRenderer) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TemplateStore::new(dir.path());
        for ty in types {
            generate_template(ty.style())
                .save(store.path_for(*ty))
                .expect("write template");
        }
        (dir, CardRenderer::new(store))
    }

    #[test]
    fn glitch_card_has_size_and_signature_border() {
        let (_dir, renderer) = renderer_with(&[PersonalityType::Glitch]);
        let style = PersonalityType::Glitch.style();
        let card = renderer
            .render(
                &photo(),
                &content(PersonalityType::Glitch, "Buffer Betty", "Reboots twice."),
                style,
            )
            .expect("render");

        assert_eq!(card.dimensions(), (600, 840));
        assert_eq!(*card.get_pixel(2, 420), hex(0x00E5FF));
        assert_eq!(*card.get_pixel(597, 10), hex(0x00E5FF));
    }

    #[test]
    fn rendering_is_deterministic() {
        let (_dir, renderer) = renderer_with(&[PersonalityType::Main]);
        let style = PersonalityType::Main.style();
        let card = content(
            PersonalityType::Main,
            "WWWWWWWWWWWWWWWWWWWWWWWWW",
            &"The spotlight follows this card everywhere it goes. ".repeat(6),
        );
        let first = renderer.render(&photo(), &card, style).expect("first");
        let second = renderer.render(&photo(), &card, style).expect("second");
        assert!(first == second);
        assert_eq!(
            encode_png(&first).expect("encode"),
            encode_png(&second).expect("encode")
        );
    }

    #[test]
    fn missing_template_fails_cleanly() {
        let (_dir, renderer) = renderer_with(&[]);
        let err = renderer
            .render(
                &photo(),
                &content(PersonalityType::Ping, "Pinger", ""),
                PersonalityType::Ping.style(),
            )
            .expect_err("no template");
        assert!(matches!(err, CardError::TemplateMissing(_)));
    }

    #[test]
    fn encode_png_writes_png_magic() {
        let card = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, hex(0xFFFFFF));
        let bytes = encode_png(&card).expect("encode");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert!(encode_png(&RgbaImage::new(10, 10)).is_err());
    }

    #[test]
    fn decode_rejects_junk() {
        assert!(matches!(decode_source(&[]), Err(CardError::InvalidImage(_))));
        assert!(matches!(
            decode_source(b"This is not an image at all."),
            Err(CardError::InvalidImage(_))
        ));
        assert!(matches!(
            decode_source(&[0xFF, 0xD8, 0x00, 0xFF, 0xD9]),
            Err(CardError::InvalidImage(_))
        ));
    }

    #[test]
    fn decode_accepts_png_bytes() {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(4, 3, hex(0x336699))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode");
        let image = decode_source(&bytes).expect("decode");
        assert_eq!((image.width(), image.height()), (4, 3));
    }

    #[test]
    fn rounded_mask_cuts_corners() {
        assert!(!inside_rounded(0, 0, 100, 50, 10));
        assert!(inside_rounded(10, 10, 100, 50, 10));
        assert!(inside_rounded(50, 0, 100, 50, 10));
        assert!(!inside_rounded(99, 49, 100, 50, 10));
    }
}
