//! Whole-card passes applied after composition, and the outer frame.
//!
//! Every pass is a pure function of pixel position and colour, so the same
//! input always renders the same card.

use image::{Rgba, RgbaImage};

use crate::styles::{EffectFlag, StyleDescriptor};

/// Width of the accent frame.
pub const FRAME_WIDTH: u32 = 6;
/// Width of the primary ring inside the frame.
pub const INNER_RING_WIDTH: u32 = 2;

const TINT_STRENGTH: f32 = 0.12;
const SCANLINE_PERIOD: u32 = 4;
const SCANLINE_DARKEN: f32 = 0.18;
const SHIFT_BAND_HEIGHT: u32 = 24;
const SHIFT_PX: u32 = 4;
const VIGNETTE_STRENGTH: f32 = 0.35;
const GLOW_DEPTH: u32 = 16;
const GLOW_STRENGTH: f32 = 0.55;

/// Linear mix of two colours; `t = 0` is `from`, `t = 1` is `to`. Result is opaque.
pub fn mix(from: Rgba<u8>, to: Rgba<u8>, t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Rgba([
        channel(from[0], to[0]),
        channel(from[1], to[1]),
        channel(from[2], to[2]),
        255,
    ])
}

/// Scales the colour channels by `factor`.
pub fn darken(pixel: Rgba<u8>, factor: f32) -> Rgba<u8> {
    let keep = (1.0 - factor).clamp(0.0, 1.0);
    Rgba([
        (pixel[0] as f32 * keep).round() as u8,
        (pixel[1] as f32 * keep).round() as u8,
        (pixel[2] as f32 * keep).round() as u8,
        pixel[3],
    ])
}

/// Runs the style's passes in the fixed order, then draws the frame.
pub fn apply(card: &mut RgbaImage, style: &StyleDescriptor) {
    for flag in EffectFlag::ORDER {
        if !style.has_effect(flag) {
            continue;
        }
        match flag {
            EffectFlag::OverlayTint => overlay_tint(card, style.palette.accent),
            EffectFlag::Scanlines => scanlines(card),
            EffectFlag::ChromaticShift => chromatic_shift(card),
            EffectFlag::Vignette => vignette(card),
            EffectFlag::BorderGlow => border_glow(card, style.palette.accent),
        }
    }
    frame(card, style);
}

fn overlay_tint(card: &mut RgbaImage, accent: Rgba<u8>) {
    for pixel in card.pixels_mut() {
        *pixel = mix(*pixel, accent, TINT_STRENGTH);
    }
}

fn scanlines(card: &mut RgbaImage) {
    for (_, y, pixel) in card.enumerate_pixels_mut() {
        if y % SCANLINE_PERIOD == 0 {
            *pixel = darken(*pixel, SCANLINE_DARKEN);
        }
    }
}

/// Every fifth band of rows gets its red channel pushed right.
fn chromatic_shift(card: &mut RgbaImage) {
    let (width, height) = card.dimensions();
    for y in 0..height {
        if (y / SHIFT_BAND_HEIGHT) % 5 != 2 {
            continue;
        }
        for x in (SHIFT_PX..width).rev() {
            let red = card.get_pixel(x - SHIFT_PX, y)[0];
            card.get_pixel_mut(x, y)[0] = red;
        }
    }
}

fn vignette(card: &mut RgbaImage) {
    let (width, height) = card.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    for (x, y, pixel) in card.enumerate_pixels_mut() {
        let dx = (x as f32 - cx) / cx;
        let dy = (y as f32 - cy) / cy;
        let distance = (dx * dx + dy * dy).sqrt() / std::f32::consts::SQRT_2;
        let falloff = ((distance - 0.55) / 0.45).max(0.0);
        if falloff > 0.0 {
            *pixel = darken(*pixel, VIGNETTE_STRENGTH * falloff * falloff);
        }
    }
}

fn border_glow(card: &mut RgbaImage, accent: Rgba<u8>) {
    let (width, height) = card.dimensions();
    for (x, y, pixel) in card.enumerate_pixels_mut() {
        let edge = x.min(y).min(width - 1 - x).min(height - 1 - y);
        if edge < FRAME_WIDTH || edge >= FRAME_WIDTH + GLOW_DEPTH {
            continue;
        }
        let depth = (edge - FRAME_WIDTH) as f32 / GLOW_DEPTH as f32;
        *pixel = mix(*pixel, accent, GLOW_STRENGTH * (1.0 - depth));
    }
}

/// Accent border with a thin primary ring inside it. Drawn last.
pub fn frame(card: &mut RgbaImage, style: &StyleDescriptor) {
    let (width, height) = card.dimensions();
    for (x, y, pixel) in card.enumerate_pixels_mut() {
        let edge = x.min(y).min(width - 1 - x).min(height - 1 - y);
        if edge < FRAME_WIDTH {
            *pixel = style.palette.accent;
        } else if edge < FRAME_WIDTH + INNER_RING_WIDTH {
            *pixel = style.palette.primary;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::PersonalityType;

    fn grey() -> RgbaImage {
        RgbaImage::from_pixel(120, 160, Rgba([128, 128, 128, 255]))
    }

    #[test]
    fn mix_endpoints() {
        let a = Rgba([0, 0, 0, 255]);
        let b = Rgba([200, 100, 50, 255]);
        assert_eq!(mix(a, b, 0.0), a);
        assert_eq!(mix(a, b, 1.0), b);
        assert_eq!(mix(a, b, 0.5), Rgba([100, 50, 25, 255]));
    }

    #[test]
    fn frame_paints_signature_edge() {
        let style = PersonalityType::Glitch.style();
        let mut card = grey();
        apply(&mut card, style);

        assert_eq!(*card.get_pixel(2, 80), style.palette.accent);
        assert_eq!(*card.get_pixel(119, 0), style.palette.accent);
        assert_eq!(*card.get_pixel(7, 80), style.palette.primary);
    }

    #[test]
    fn scanlines_darken_every_fourth_row() {
        let mut card = grey();
        scanlines(&mut card);
        assert!(card.get_pixel(50, 40)[0] < 128);
        assert_eq!(card.get_pixel(50, 41)[0], 128);
    }

    #[test]
    fn vignette_leaves_centre_alone() {
        let mut card = grey();
        vignette(&mut card);
        assert_eq!(card.get_pixel(60, 80)[0], 128);
        assert!(card.get_pixel(0, 0)[0] < 128);
    }

    #[test]
    fn passes_are_deterministic() {
        let style = PersonalityType::Send.style();
        let mut first = grey();
        let mut second = grey();
        apply(&mut first, style);
        apply(&mut second, style);
        assert_eq!(first, second);
    }
}
