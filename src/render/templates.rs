//! Per-type card backgrounds on disk, plus the generator that fills in any
//! that are missing.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use tracing::{debug, info, warn};

use super::effects::mix;
use crate::constants::{CARD_HEIGHT, CARD_WIDTH};
use crate::error::CardError;
use crate::styles::{Pattern, PersonalityType, StyleDescriptor};

/// Name of the fallback template.
pub const GENERIC_TEMPLATE: &str = "generic.png";

const PATTERN_STRENGTH: f32 = 0.22;
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Directory of `<type>.png` templates.
#[derive(Clone, Debug)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// Store rooted at `dir`. Nothing is read until a card is rendered.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The template directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the template for `ty` lives.
    pub fn path_for(&self, ty: PersonalityType) -> PathBuf {
        self.dir.join(format!("{}.png", ty.slug()))
    }

    /// Loads the type's template, else the generic one, sized to the card.
    /// Blocking; call from the blocking pool.
    pub fn load(&self, ty: PersonalityType) -> Result<RgbaImage, CardError> {
        for path in [self.path_for(ty), self.dir.join(GENERIC_TEMPLATE)] {
            if !path.is_file() {
                continue;
            }
            let image = match image::open(&path) {
                Ok(image) => image.to_rgba8(),
                Err(err) => {
                    warn!("Skipping undecodable template {}: {}", path.display(), err);
                    continue;
                }
            };
            debug!("Using template {}", path.display());
            if image.dimensions() != (CARD_WIDTH, CARD_HEIGHT) {
                warn!(
                    "Template {} is {}x{}, resizing to {}x{}",
                    path.display(),
                    image.width(),
                    image.height(),
                    CARD_WIDTH,
                    CARD_HEIGHT
                );
                return Ok(image::imageops::resize(
                    &image,
                    CARD_WIDTH,
                    CARD_HEIGHT,
                    FilterType::Triangle,
                ));
            }
            return Ok(image);
        }
        Err(CardError::TemplateMissing(ty.name().to_string()))
    }

    /// Writes a generated template for every type without one, and a generic
    /// one. Existing files are never touched. Returns how many were written.
    pub async fn ensure_defaults(&self) -> Result<usize, CardError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let dir = self.dir.clone();
        let written = tokio::task::spawn_blocking(move || -> Result<usize, CardError> {
            let mut targets: Vec<(PathBuf, &StyleDescriptor)> = PersonalityType::ALL
                .iter()
                .map(|ty| (dir.join(format!("{}.png", ty.slug())), ty.style()))
                .collect();
            targets.push((dir.join(GENERIC_TEMPLATE), PersonalityType::DEFAULT.style()));

            let mut written = 0;
            for (path, style) in targets {
                if path.exists() {
                    continue;
                }
                let mut bytes = Vec::new();
                generate_template(style)
                    .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
                match std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                {
                    Ok(mut file) => {
                        file.write_all(&bytes)?;
                        written += 1;
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {}
                    Err(err) => return Err(err.into()),
                }
            }
            Ok(written)
        })
        .await??;

        if written > 0 {
            info!("Generated {} card templates in {}", written, self.dir.display());
        }
        Ok(written)
    }
}

/// A 600x840 background: vertical gradient from the background colour to the
/// secondary colour with the style's pattern laid over it.
pub fn generate_template(style: &StyleDescriptor) -> RgbaImage {
    let palette = &style.palette;
    let bokeh = bokeh_circles();
    RgbaImage::from_fn(CARD_WIDTH, CARD_HEIGHT, |x, y| {
        let t = y as f32 / (CARD_HEIGHT - 1) as f32;
        let base = mix(palette.background, palette.secondary, t * 0.85);
        match style.pattern {
            Pattern::Fade => mix(base, WHITE, 0.6 * t * t),
            Pattern::Bokeh => {
                let cover = bokeh_coverage(&bokeh, x, y);
                mix(base, palette.accent, PATTERN_STRENGTH * cover)
            }
            pattern => {
                let cover = coverage(pattern, x, y);
                mix(base, palette.accent, PATTERN_STRENGTH * cover)
            }
        }
    })
}

/// How much of the pattern covers a pixel, 0 to 1.
fn coverage(pattern: Pattern, x: u32, y: u32) -> f32 {
    let (xi, yi) = (x as i32, y as i32);
    let hit = |on: bool| if on { 1.0 } else { 0.0 };
    match pattern {
        Pattern::Dots => {
            let dx = xi % 28 - 14;
            let dy = yi % 28 - 14;
            hit(dx * dx + dy * dy <= 16)
        }
        Pattern::Grid => hit(x % 32 < 2 || y % 32 < 2),
        Pattern::Scanlines => hit(y % 6 < 2) * 0.7,
        Pattern::Diagonals => hit((x + CARD_HEIGHT - y) % 40 < 10),
        Pattern::Slashes => hit((3 * x + y) % 64 < 10),
        Pattern::Diamonds => {
            let dx = (xi % 48 - 24).abs();
            let dy = (yi % 48 - 24).abs();
            hit((14..=17).contains(&(dx + dy)))
        }
        Pattern::Stars => {
            let row = yi / 56;
            let dx = (xi + (row % 2) * 28) % 56 - 28;
            let dy = yi % 56 - 28;
            hit((dx.abs() <= 1 && dy.abs() <= 7) || (dy.abs() <= 1 && dx.abs() <= 7))
        }
        Pattern::Sparks => {
            let dx = (xi % 64 - 32).abs();
            let dy = (yi % 64 - 32).abs();
            hit((dx - dy).abs() <= 1 && dx <= 8 || (dx == 0 && dy <= 10) || (dy == 0 && dx <= 10))
        }
        Pattern::Chevrons => {
            let lateral = (xi % 80 - 40).abs() / 2;
            hit((yi + lateral) % 40 < 5)
        }
        Pattern::Arrows => {
            let tip = 30 - (yi % 60 - 30).abs();
            hit((xi % 60 - tip).abs() < 4)
        }
        Pattern::Mist => {
            let wave = (y as f32 / 37.0 + (x as f32 / 90.0).sin() * 1.5).sin();
            wave.max(0.0).powi(2) * 0.8
        }
        Pattern::Bokeh | Pattern::Fade => 0.0,
    }
}

/// Fixed scatter of soft circles: (x, y, radius).
fn bokeh_circles() -> Vec<(f32, f32, f32)> {
    let mut state: u32 = 0x2545_F491;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };
    (0..18)
        .map(|_| {
            let x = (next() % CARD_WIDTH) as f32;
            let y = (next() % CARD_HEIGHT) as f32;
            let radius = 24.0 + (next() % 48) as f32;
            (x, y, radius)
        })
        .collect()
}

fn bokeh_coverage(circles: &[(f32, f32, f32)], x: u32, y: u32) -> f32 {
    circles
        .iter()
        .map(|(cx, cy, radius)| {
            let distance = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            if distance < *radius {
                0.6 * (1.0 - distance / radius)
            } else {
                0.0
            }
        })
        .sum::<f32>()
        .min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::hex;

    #[test]
    fn generated_template_is_card_sized_and_stable() {
        let style = PersonalityType::Mood.style();
        let first = generate_template(style);
        assert_eq!(first.dimensions(), (CARD_WIDTH, CARD_HEIGHT));
        assert_eq!(first, generate_template(style));
        assert_ne!(first, generate_template(PersonalityType::Debug.style()));
    }

    #[test]
    fn missing_templates_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TemplateStore::new(dir.path());
        let err = store.load(PersonalityType::Sus).expect_err("no templates");
        assert!(matches!(err, CardError::TemplateMissing(name) if name == "Sus"));
    }

    #[test]
    fn falls_back_to_generic_and_resizes() {
        let dir = tempfile::tempdir().expect("tempdir");
        RgbaImage::from_pixel(60, 84, hex(0x123456))
            .save(dir.path().join(GENERIC_TEMPLATE))
            .expect("write generic");

        let store = TemplateStore::new(dir.path());
        let template = store.load(PersonalityType::Cap).expect("generic template");
        assert_eq!(template.dimensions(), (CARD_WIDTH, CARD_HEIGHT));
        assert_eq!(*template.get_pixel(300, 420), hex(0x123456));
    }

    #[test]
    fn undecodable_template_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("cap.png"), b"not a png").expect("write junk");
        let store = TemplateStore::new(dir.path());
        assert!(matches!(
            store.load(PersonalityType::Cap),
            Err(CardError::TemplateMissing(_))
        ));
    }

    #[tokio::test]
    async fn ensure_defaults_never_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TemplateStore::new(dir.path());
        let custom = dir.path().join("ghost.png");
        std::fs::write(&custom, b"hand made").expect("write custom");

        let written = store.ensure_defaults().await.expect("ensure defaults");
        assert_eq!(written, 20);
        assert_eq!(std::fs::read(&custom).expect("read custom"), b"hand made");
        assert!(store.path_for(PersonalityType::Glitch).is_file());
        assert!(dir.path().join(GENERIC_TEMPLATE).is_file());

        assert_eq!(store.ensure_defaults().await.expect("second run"), 0);
    }
}
