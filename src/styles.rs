//! The twenty personality types and the visual style bound to each.
//!
//! The catalog is built once, on first use, and is read-only afterwards, so it
//! can be shared by every request without locking.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use image::Rgba;
use serde::{Serialize, Serializer};

/// One of the twenty fixed personality tags a card can be classified as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PersonalityType {
    /// The collective atmosphere of the room.
    Mood,
    /// Simply their distinct, inexplicable vibe.
    Vibe,
    /// Every opinion comes with a sharp kick.
    Spicy,
    /// The group's source of energy.
    Juice,
    /// Runs preset social scripts.
    Npc,
    /// Brief random moments of social instability.
    Glitch,
    /// Half a beat behind the conversation.
    Lag,
    /// Rapid low-effort check-ins.
    Ping,
    /// Hunts for the root cause of everyone else's problems.
    Debug,
    /// Nothing personal gets through.
    Firewall,
    /// Main character energy.
    Main,
    /// Everything is a status display.
    Flex,
    /// Obscure references only insiders get.
    Iykyk,
    /// Persistent secondhand embarrassment.
    Cringe,
    /// Returns fire immediately.
    Clapback,
    /// Vaguely questionable at all times.
    Sus,
    /// Prone to obvious exaggeration.
    Cap,
    /// Will try anything for the chaos of it.
    Send,
    /// Vanishes without notice.
    Ghost,
    /// Chronically eager to please.
    Simp,
}

/// Grouping used when presenting the types to a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeFamily {
    /// Mood, Vibe, Spicy, Juice
    VibeAndAtmosphere,
    /// NPC, Glitch, Lag, Ping, Debug, Firewall
    DigitalAndLogic,
    /// Main, Flex, IYKYK, Cringe
    EgoAndStatus,
    /// Clapback, Sus, Cap, Send
    ActionAndConflict,
    /// Ghost, Simp
    MovementAndAvoidance,
}

impl TypeFamily {
    /// Every family, in prompt order.
    pub const ALL: [TypeFamily; 5] = [
        TypeFamily::VibeAndAtmosphere,
        TypeFamily::DigitalAndLogic,
        TypeFamily::EgoAndStatus,
        TypeFamily::ActionAndConflict,
        TypeFamily::MovementAndAvoidance,
    ];

    /// Heading shown above the family's types in the prompt.
    pub fn heading(self) -> &'static str {
        match self {
            TypeFamily::VibeAndAtmosphere => "VIBE & ATMOSPHERE",
            TypeFamily::DigitalAndLogic => "DIGITAL & LOGIC",
            TypeFamily::EgoAndStatus => "EGO & STATUS",
            TypeFamily::ActionAndConflict => "ACTION & CONFLICT",
            TypeFamily::MovementAndAvoidance => "MOVEMENT & AVOIDANCE",
        }
    }
}

/// Returned when a string names none of the twenty types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown personality type {0:?}")]
pub struct UnknownPersonalityType(pub String);

impl PersonalityType {
    /// All twenty types, in catalog order.
    pub const ALL: [PersonalityType; 20] = [
        PersonalityType::Mood,
        PersonalityType::Vibe,
        PersonalityType::Spicy,
        PersonalityType::Juice,
        PersonalityType::Npc,
        PersonalityType::Glitch,
        PersonalityType::Lag,
        PersonalityType::Ping,
        PersonalityType::Debug,
        PersonalityType::Firewall,
        PersonalityType::Main,
        PersonalityType::Flex,
        PersonalityType::Iykyk,
        PersonalityType::Cringe,
        PersonalityType::Clapback,
        PersonalityType::Sus,
        PersonalityType::Cap,
        PersonalityType::Send,
        PersonalityType::Ghost,
        PersonalityType::Simp,
    ];

    /// Substituted when a provider names a type we don't know.
    pub const DEFAULT: PersonalityType = PersonalityType::Vibe;

    /// Display name, exactly as the provider is asked to spell it.
    pub fn name(self) -> &'static str {
        match self {
            PersonalityType::Mood => "Mood",
            PersonalityType::Vibe => "Vibe",
            PersonalityType::Spicy => "Spicy",
            PersonalityType::Juice => "Juice",
            PersonalityType::Npc => "NPC",
            PersonalityType::Glitch => "Glitch",
            PersonalityType::Lag => "Lag",
            PersonalityType::Ping => "Ping",
            PersonalityType::Debug => "Debug",
            PersonalityType::Firewall => "Firewall",
            PersonalityType::Main => "Main",
            PersonalityType::Flex => "Flex",
            PersonalityType::Iykyk => "IYKYK",
            PersonalityType::Cringe => "Cringe",
            PersonalityType::Clapback => "Clapback",
            PersonalityType::Sus => "Sus",
            PersonalityType::Cap => "Cap",
            PersonalityType::Send => "Send",
            PersonalityType::Ghost => "Ghost",
            PersonalityType::Simp => "Simp",
        }
    }

    /// Lowercase name, used for template filenames.
    pub fn slug(self) -> String {
        self.name().to_ascii_lowercase()
    }

    /// One-line description handed to the provider.
    pub fn description(self) -> &'static str {
        match self {
            PersonalityType::Mood => {
                "Not someone who has a mood, but the collective atmosphere of the room"
            }
            PersonalityType::Vibe => {
                "Skips every specific descriptor; they are simply their own inexplicable vibe"
            }
            PersonalityType::Spicy => "Delivers every opinion with a sharp, slightly aggressive kick",
            PersonalityType::Juice => "The source of energy, motivation or charisma for a group",
            PersonalityType::Npc => "Follows preset social scripts; seems to lack independent thought",
            PersonalityType::Glitch => "Has brief, random, illogical moments of social instability",
            PersonalityType::Lag => "Perpetually half a beat behind the joke or conversation",
            PersonalityType::Ping => "Sends rapid, sporadic, low-effort conversational check-ins",
            PersonalityType::Debug => {
                "Hyper-analytical, always hunting the source of a problem in other people's plans"
            }
            PersonalityType::Firewall => {
                "Impenetrable emotional defences; nothing personal gets through"
            }
            PersonalityType::Main => "The one whose life everyone else's seems to revolve around",
            PersonalityType::Flex => "Every action is designed to show off status or skill",
            PersonalityType::Iykyk => {
                "Personality built on obscure references and exclusionary shared knowledge"
            }
            PersonalityType::Cringe => "Social output causes persistent secondhand embarrassment",
            PersonalityType::Clapback => {
                "Exists to immediately and aggressively return fire in any verbal exchange"
            }
            PersonalityType::Sus => "Constantly acting in a vaguely inconsistent or questionable way",
            PersonalityType::Cap => "Fundamentally prone to dishonesty and obvious exaggeration",
            PersonalityType::Send => "Will try anything reckless or weird for the sheer chaos of it",
            PersonalityType::Ghost => "Defined by sudden, unannounced disappearance from commitments",
            PersonalityType::Simp => "Chronically eager to please a specific person or group",
        }
    }

    /// Family this type is listed under.
    pub fn family(self) -> TypeFamily {
        use PersonalityType::*;
        match self {
            Mood | Vibe | Spicy | Juice => TypeFamily::VibeAndAtmosphere,
            Npc | Glitch | Lag | Ping | Debug | Firewall => TypeFamily::DigitalAndLogic,
            Main | Flex | Iykyk | Cringe => TypeFamily::EgoAndStatus,
            Clapback | Sus | Cap | Send => TypeFamily::ActionAndConflict,
            Ghost | Simp => TypeFamily::MovementAndAvoidance,
        }
    }

    /// The style bound to this type.
    pub fn style(self) -> &'static StyleDescriptor {
        &CATALOG[self as usize]
    }
}

impl fmt::Display for PersonalityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PersonalityType {
    type Err = UnknownPersonalityType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let cleaned = value
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '.')
            .trim();
        PersonalityType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(cleaned))
            .ok_or_else(|| UnknownPersonalityType(value.to_string()))
    }
}

impl Serialize for PersonalityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Ordered colour set for a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    /// Panel gradients start here.
    pub primary: Rgba<u8>,
    /// Panel gradients end here.
    pub secondary: Rgba<u8>,
    /// Border, badge and stat bars. The type's signature colour.
    pub accent: Rgba<u8>,
    /// Body text.
    pub text: Rgba<u8>,
    /// Card background and badge text.
    pub background: Rgba<u8>,
}

impl Palette {
    /// The palette as an ordered list.
    pub fn colors(&self) -> [Rgba<u8>; 5] {
        [
            self.primary,
            self.secondary,
            self.accent,
            self.text,
            self.background,
        ]
    }
}

/// Post-composition passes applied over the whole card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectFlag {
    /// Blend the whole card slightly towards the accent colour.
    OverlayTint,
    /// Darken every fourth row.
    Scanlines,
    /// Offset the red channel in fixed horizontal bands.
    ChromaticShift,
    /// Darken towards the corners.
    Vignette,
    /// Accent-coloured glow just inside the frame.
    BorderGlow,
}

impl EffectFlag {
    /// The order passes are applied in, whatever order a style lists them.
    pub const ORDER: [EffectFlag; 5] = [
        EffectFlag::OverlayTint,
        EffectFlag::Scanlines,
        EffectFlag::ChromaticShift,
        EffectFlag::Vignette,
        EffectFlag::BorderGlow,
    ];
}

/// Texture drawn into generated templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// Soft overlapping circles.
    Bokeh,
    /// Regular dot grid.
    Dots,
    /// Small plus-shaped stars.
    Stars,
    /// Thin square grid.
    Grid,
    /// Fine horizontal lines.
    Scanlines,
    /// Diagonal stripes.
    Diagonals,
    /// Repeating diamonds.
    Diamonds,
    /// Four-ray sparks.
    Sparks,
    /// Steep reverse-diagonal slashes.
    Slashes,
    /// Stacked chevrons.
    Chevrons,
    /// Right-pointing arrowheads.
    Arrows,
    /// Horizontal haze bands.
    Mist,
    /// Fade towards white at the bottom.
    Fade,
}

/// Which bundled face a text role uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeFace {
    /// DejaVu Sans
    Sans,
    /// DejaVu Sans Bold
    SansBold,
    /// DejaVu Serif Bold
    SerifBold,
    /// DejaVu Sans Mono Bold
    MonoBold,
}

/// Palette, effects, texture, faces and icon bound to a personality type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleDescriptor {
    /// The type this style belongs to.
    pub personality_type: PersonalityType,
    /// Card colours.
    pub palette: Palette,
    /// Post-composition passes.
    pub effects: &'static [EffectFlag],
    /// Template texture.
    pub pattern: Pattern,
    /// Face used for the character name.
    pub title_face: TypeFace,
    /// Face used for the stat lines.
    pub stat_face: TypeFace,
    /// Short symbol shown in the type badge.
    pub icon: &'static str,
}

impl StyleDescriptor {
    /// Whether this style asks for the given pass.
    pub fn has_effect(&self, flag: EffectFlag) -> bool {
        self.effects.contains(&flag)
    }
}

/// `0xRRGGBB` into an opaque pixel.
pub const fn hex(rgb: u32) -> Rgba<u8> {
    Rgba([(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255])
}

const fn palette(primary: u32, secondary: u32, accent: u32, text: u32, background: u32) -> Palette {
    Palette {
        primary: hex(primary),
        secondary: hex(secondary),
        accent: hex(accent),
        text: hex(text),
        background: hex(background),
    }
}

fn describe(personality_type: PersonalityType) -> StyleDescriptor {
    use EffectFlag::*;
    use PersonalityType as P;

    let (palette, effects, pattern, title_face, stat_face, icon): (
        Palette,
        &'static [EffectFlag],
        Pattern,
        TypeFace,
        TypeFace,
        &'static str,
    ) = match personality_type {
        // pinks
        P::Mood => (
            palette(0xFFB6C1, 0xFFC0CB, 0xFF69B4, 0x8B008B, 0xFFF0F5),
            &[OverlayTint, Vignette],
            Pattern::Bokeh,
            TypeFace::SansBold,
            TypeFace::SansBold,
            "☁",
        ),
        P::Vibe => (
            palette(0xFFB6C1, 0xFFC0CB, 0xDB7093, 0x8B008B, 0xFFF0F5),
            &[BorderGlow],
            Pattern::Dots,
            TypeFace::SansBold,
            TypeFace::SansBold,
            "∿",
        ),
        P::Simp => (
            palette(0xFFB6C1, 0xFFC0CB, 0xFF1493, 0x8B008B, 0xFFF0F5),
            &[BorderGlow, OverlayTint],
            Pattern::Fade,
            TypeFace::SansBold,
            TypeFace::SansBold,
            "♥",
        ),
        // golds
        P::Juice => (
            palette(0xFFD700, 0xFFA500, 0xFF8C00, 0x8B4513, 0xFFFACD),
            &[BorderGlow],
            Pattern::Bokeh,
            TypeFace::SansBold,
            TypeFace::SansBold,
            "⚡",
        ),
        P::Cap => (
            palette(0xFFD700, 0xFFA500, 0xDAA520, 0x8B4513, 0xFFFACD),
            &[OverlayTint],
            Pattern::Arrows,
            TypeFace::SansBold,
            TypeFace::SansBold,
            "✗",
        ),
        P::Send => (
            palette(0xFFD700, 0xFFA500, 0xFF7F50, 0x8B4513, 0xFFFACD),
            &[ChromaticShift, BorderGlow],
            Pattern::Slashes,
            TypeFace::SansBold,
            TypeFace::SansBold,
            "➤",
        ),
        // plums
        P::Main => (
            palette(0xDDA0DD, 0xDA70D6, 0x9370DB, 0x4B0082, 0xF8F8FF),
            &[BorderGlow, Vignette],
            Pattern::Diamonds,
            TypeFace::SerifBold,
            TypeFace::SerifBold,
            "★",
        ),
        P::Flex => (
            palette(0xDDA0DD, 0xDA70D6, 0xC71585, 0x4B0082, 0xF8F8FF),
            &[BorderGlow],
            Pattern::Sparks,
            TypeFace::SerifBold,
            TypeFace::SerifBold,
            "♛",
        ),
        // purples
        P::Npc => (
            palette(0x9370DB, 0xBA55D3, 0x8A2BE2, 0x4B0082, 0xF0E6FF),
            &[OverlayTint],
            Pattern::Grid,
            TypeFace::SerifBold,
            TypeFace::SansBold,
            "☺",
        ),
        P::Glitch => (
            palette(0x9370DB, 0xBA55D3, 0x00E5FF, 0x4B0082, 0xF0E6FF),
            &[ChromaticShift, Scanlines],
            Pattern::Scanlines,
            TypeFace::SerifBold,
            TypeFace::MonoBold,
            "▚",
        ),
        P::Ghost => (
            palette(0x9370DB, 0xBA55D3, 0x6A5ACD, 0x4B0082, 0xF0E6FF),
            &[Vignette, OverlayTint],
            Pattern::Mist,
            TypeFace::SerifBold,
            TypeFace::SansBold,
            "◌",
        ),
        P::Cringe => (
            palette(0x9370DB, 0xBA55D3, 0x9932CC, 0x4B0082, 0xF0E6FF),
            &[OverlayTint],
            Pattern::Sparks,
            TypeFace::SerifBold,
            TypeFace::SansBold,
            "☹",
        ),
        // blues
        P::Lag => (
            palette(0x87CEEB, 0xB0E0E6, 0x4169E1, 0x191970, 0xF0F8FF),
            &[ChromaticShift],
            Pattern::Diagonals,
            TypeFace::SansBold,
            TypeFace::MonoBold,
            "⟳",
        ),
        P::Ping => (
            palette(0x87CEEB, 0xB0E0E6, 0x1E90FF, 0x191970, 0xF0F8FF),
            &[BorderGlow],
            Pattern::Grid,
            TypeFace::SansBold,
            TypeFace::MonoBold,
            "◉",
        ),
        P::Firewall => (
            palette(0x87CEEB, 0xB0E0E6, 0x0000CD, 0x191970, 0xF0F8FF),
            &[BorderGlow, Vignette],
            Pattern::Diagonals,
            TypeFace::SansBold,
            TypeFace::MonoBold,
            "▣",
        ),
        // steels
        P::Debug => (
            palette(0x4682B4, 0x87CEEB, 0x191970, 0x2F4F4F, 0xF0F8FF),
            &[Scanlines],
            Pattern::Scanlines,
            TypeFace::SerifBold,
            TypeFace::MonoBold,
            "⚙",
        ),
        P::Sus => (
            palette(0x4682B4, 0x87CEEB, 0x2E8B57, 0x2F4F4F, 0xF0F8FF),
            &[Vignette],
            Pattern::Chevrons,
            TypeFace::SerifBold,
            TypeFace::MonoBold,
            "◐",
        ),
        P::Iykyk => (
            palette(0x4682B4, 0x87CEEB, 0x008080, 0x2F4F4F, 0xF0F8FF),
            &[Vignette],
            Pattern::Diamonds,
            TypeFace::SerifBold,
            TypeFace::MonoBold,
            "◈",
        ),
        // reds
        P::Spicy => (
            palette(0xFF4500, 0xFF6347, 0xDC143C, 0x8B0000, 0xFFF5EE),
            &[BorderGlow, OverlayTint],
            Pattern::Stars,
            TypeFace::SansBold,
            TypeFace::MonoBold,
            "♨",
        ),
        P::Clapback => (
            palette(0xB22222, 0xDC143C, 0x8B0000, 0x2F0000, 0xFFE4E1),
            &[OverlayTint, BorderGlow],
            Pattern::Slashes,
            TypeFace::SansBold,
            TypeFace::SansBold,
            "↯",
        ),
    };

    StyleDescriptor {
        personality_type,
        palette,
        effects,
        pattern,
        title_face,
        stat_face,
        icon,
    }
}

static CATALOG: LazyLock<[StyleDescriptor; 20]> =
    LazyLock::new(|| PersonalityType::ALL.map(describe));

/// Forces the catalog to build; called once at startup.
pub fn init() -> usize {
    CATALOG.len()
}
