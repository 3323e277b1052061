//! Card text: the five facts going in, the prompt, and the tolerant parser
//! that turns provider output into [CardContent].

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::{
    MAX_EFFECT_CHARS, MAX_NAME_CHARS, MAX_STAT_LABEL_CHARS, MAX_STAT_TEXT_CHARS, STAT_MAX,
    STAT_MIN, STAT_STEP, TRAIT_COUNT,
};
use crate::error::CardError;
use crate::providers::{CardPrompt, GenerationFailure, ProviderChain};
use crate::styles::{PersonalityType, TypeFamily};

/// Five non-empty facts about the person on the card, in the order given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraitSet([String; TRAIT_COUNT]);

impl TraitSet {
    /// Trims each fact. Fails naming the first missing or blank one (1-based).
    pub fn new<I, S>(traits: I) -> Result<Self, CardError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let collected: Vec<String> = traits
            .into_iter()
            .map(|value| value.as_ref().trim().to_string())
            .collect();

        if collected.len() > TRAIT_COUNT {
            return Err(CardError::InvalidTraits(format!(
                "Exactly {TRAIT_COUNT} traits are required"
            )));
        }
        if let Some(index) = collected.iter().position(String::is_empty) {
            return Err(CardError::InvalidTraits(format!(
                "Trait {} is required",
                index + 1
            )));
        }
        if collected.len() < TRAIT_COUNT {
            return Err(CardError::InvalidTraits(format!(
                "Trait {} is required",
                collected.len() + 1
            )));
        }
        let traits: [String; TRAIT_COUNT] = collected.try_into().map_err(|_| {
            CardError::InvalidTraits(format!("Exactly {TRAIT_COUNT} traits are required"))
        })?;
        Ok(Self(traits))
    }

    /// The facts, in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Why provider text could not be read as card content.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Nothing but whitespace.
    #[error("response was empty")]
    Empty,
    /// A required field was absent or blank.
    #[error("response is missing {0}")]
    MissingField(&'static str),
}

/// A stat value as the provider gave it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    /// Numeric stat
    Number(i64),
    /// Short text stat such as `"MAX"` or `"???"`
    Text(String),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Number(value) => write!(f, "{value}"),
            StatValue::Text(value) => f.write_str(value),
        }
    }
}

impl StatValue {
    fn from_text(raw: &str) -> Option<Self> {
        let cleaned = raw.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == ',');
        if cleaned.is_empty() {
            return None;
        }
        let digits: String = cleaned.chars().filter(|c| *c != ',' && *c != '_').collect();
        if let Ok(number) = digits.parse::<f64>()
            && number.is_finite()
        {
            return Some(StatValue::Number(number.round() as i64));
        }
        Some(StatValue::Text(cleaned.to_string()))
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number
                .as_f64()
                .map(|value| StatValue::Number(value.round() as i64)),
            Value::String(text) => Self::from_text(text),
            _ => None,
        }
    }
}

/// A stat straight from the provider, before clamping.
#[derive(Clone, Debug, PartialEq)]
pub struct RawStat {
    /// Stat name
    pub label: String,
    /// Stat value
    pub value: StatValue,
}

/// Provider output that passed the schema check: a name, a type and at least
/// one complete stat. Nothing is sanitised yet.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuredText {
    /// Card name
    pub name: String,
    /// Type as written, possibly not one of the twenty
    pub personality_type: String,
    /// One or two stats
    pub stats: Vec<RawStat>,
    /// Ability text, may be empty
    pub effect_description: String,
    /// Suggested visual effect keywords
    pub visual_effects: Option<Vec<String>>,
}

const NAME_KEYS: &[&str] = &["card_name", "name", "character_name"];
const TYPE_KEYS: &[&str] = &["custom_type", "type", "personality_type"];
const EFFECT_KEYS: &[&str] = &["effect_description", "effect", "ability"];
const VISUAL_KEYS: &[&str] = &["visual_effects", "effects"];

#[allow(clippy::expect_used)]
static KEY_VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s>*•\-]*([A-Za-z][A-Za-z0-9 _\-]{0,40}?)[\s*_`]*[:=]\s*(.*)$")
        .expect("key/value pattern is valid")
});

fn normalise_key(key: &str) -> String {
    key.trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
        .trim_matches('_')
        .to_string()
}

fn clean_value(value: &str) -> String {
    value
        .trim()
        .trim_end_matches(',')
        .trim_matches(|c: char| c == '*' || c == '`' || c == '_')
        .trim()
        .trim_matches('"')
        .trim()
        .to_string()
}

/// Flat string map of whatever fields the text carried.
enum Fields {
    Json(serde_json::Map<String, Value>),
    Lines(HashMap<String, String>),
}

impl Fields {
    fn read(raw: &str) -> Self {
        if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}'))
            && start < end
        {
            match serde_json::from_str::<Value>(&raw[start..=end]) {
                Ok(Value::Object(map)) => {
                    let normalised = map
                        .into_iter()
                        .map(|(key, value)| (normalise_key(&key), value))
                        .collect();
                    return Fields::Json(normalised);
                }
                Ok(_) => debug!("Braced section was JSON but not an object"),
                Err(err) => debug!("Braced section was not valid JSON, reading lines: {}", err),
            }
        }

        let mut lines = HashMap::new();
        for line in raw.lines() {
            if let Some(captures) = KEY_VALUE_LINE.captures(line) {
                let key = normalise_key(&captures[1]);
                let value = clean_value(&captures[2]);
                if !key.is_empty() && !value.is_empty() {
                    lines.entry(key).or_insert(value);
                }
            }
        }
        Fields::Lines(lines)
    }

    fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| {
            let value = match self {
                Fields::Json(map) => match map.get(*key)? {
                    Value::String(text) => text.trim().to_string(),
                    Value::Number(number) => number.to_string(),
                    _ => return None,
                },
                Fields::Lines(map) => map.get(*key)?.clone(),
            };
            (!value.is_empty()).then_some(value)
        })
    }

    fn stat_value(&self, key: &str) -> Option<StatValue> {
        match self {
            Fields::Json(map) => StatValue::from_json(map.get(key)?),
            Fields::Lines(map) => StatValue::from_text(map.get(key)?),
        }
    }

    fn stat(&self, index: u8) -> Option<RawStat> {
        let label = self.text(&[format!("stat{index}_name").as_str()])?;
        let value = self.stat_value(&format!("stat{index}_value"))?;
        Some(RawStat { label, value })
    }

    fn list(&self, keys: &[&str]) -> Option<Vec<String>> {
        keys.iter().find_map(|key| {
            let items: Vec<String> = match self {
                Fields::Json(map) => match map.get(*key)? {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|item| item.trim().to_string())
                        .collect(),
                    Value::String(text) => split_list(text),
                    _ => return None,
                },
                Fields::Lines(map) => split_list(map.get(*key)?),
            };
            Some(items.into_iter().filter(|item| !item.is_empty()).collect())
        })
    }
}

fn split_list(text: &str) -> Vec<String> {
    text.trim_matches(|c: char| c == '[' || c == ']')
        .split(',')
        .map(|item| clean_value(item).trim_matches('\'').to_string())
        .collect()
}

impl StructuredText {
    /// Reads JSON (first `{` to last `}`) or `key: value` lines. Pure.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        if raw.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        let fields = Fields::read(raw);

        let name = fields
            .text(NAME_KEYS)
            .ok_or(ParseError::MissingField("card_name"))?;
        let personality_type = fields
            .text(TYPE_KEYS)
            .ok_or(ParseError::MissingField("custom_type"))?;
        let stats: Vec<RawStat> = [fields.stat(1), fields.stat(2)]
            .into_iter()
            .flatten()
            .collect();
        if stats.is_empty() {
            return Err(ParseError::MissingField("stat1_name/stat1_value"));
        }

        Ok(Self {
            name,
            personality_type,
            stats,
            effect_description: fields.text(EFFECT_KEYS).unwrap_or_default(),
            visual_effects: fields.list(VISUAL_KEYS),
        })
    }
}

/// A bounded, display-ready stat.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stat {
    /// Stat name
    pub label: String,
    /// Clamped number or short text
    pub value: StatValue,
}

impl Stat {
    /// Clamps numbers into range and rounds them to the step; shortens text.
    pub fn bounded(raw: &RawStat) -> Self {
        let label = shorten_to_chars(&sanitize_line(&raw.label), MAX_STAT_LABEL_CHARS);
        let label = if label.trim().is_empty() {
            "Stat".to_string()
        } else {
            label
        };
        let value = match &raw.value {
            StatValue::Number(number) => StatValue::Number(clamp_stat(*number)),
            StatValue::Text(text) => {
                let cleaned: String = sanitize_line(text)
                    .chars()
                    .take(MAX_STAT_TEXT_CHARS)
                    .collect();
                if cleaned.is_empty() {
                    StatValue::Number(i64::from(STAT_MIN))
                } else {
                    StatValue::Text(cleaned)
                }
            }
        };
        Self { label, value }
    }

    /// Fraction of the bar to fill. Text values fill half.
    pub fn fill_ratio(&self) -> f32 {
        match self.value {
            StatValue::Number(value) => value as f32 / STAT_MAX as f32,
            StatValue::Text(_) => 0.5,
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

fn clamp_stat(value: i64) -> i64 {
    let step = i64::from(STAT_STEP);
    // bounds are multiples of the step, so rounding after the clamp stays in range
    let value = value.clamp(i64::from(STAT_MIN), i64::from(STAT_MAX));
    ((value + step / 2).div_euclid(step)) * step
}

/// Everything printed on a card, already sanitised and bounded.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardContent {
    /// At most 25 characters
    pub character_name: String,
    /// Always one of the twenty
    pub custom_type: PersonalityType,
    /// Exactly two
    pub stats: [Stat; 2],
    /// At most 280 characters
    pub effect_description: String,
    /// At most three keywords
    pub visual_effects: Vec<String>,
    /// Leniency notes, e.g. an unknown type that was replaced
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CardContent {
    /// Applies every bound and default. Never fails; an unknown type becomes
    /// the default type with a warning.
    pub fn from_structured(structured: StructuredText) -> Self {
        let mut warnings = Vec::new();

        let custom_type = match structured.personality_type.parse::<PersonalityType>() {
            Ok(ty) => ty,
            Err(err) => {
                warn!("{}, using {}", err, PersonalityType::DEFAULT);
                warnings.push(format!(
                    "Unknown personality type {:?} replaced with {}",
                    structured.personality_type,
                    PersonalityType::DEFAULT
                ));
                PersonalityType::DEFAULT
            }
        };

        let mut name: String = sanitize_line(&structured.name)
            .chars()
            .take(MAX_NAME_CHARS)
            .collect();
        name = name.trim_end().to_string();
        if name.is_empty() {
            name = "Unknown Card".to_string();
        }

        let mut stats = structured.stats.iter().map(Stat::bounded);
        let first = stats.next().unwrap_or_else(|| Stat {
            label: "Power".to_string(),
            value: StatValue::Number(1000),
        });
        let second = stats.next().unwrap_or_else(|| Stat {
            label: "Defense".to_string(),
            value: StatValue::Number(1000),
        });

        let effect_description = shorten_to_chars(
            sanitize_ascii(&structured.effect_description).trim(),
            MAX_EFFECT_CHARS,
        );

        let visual_effects = match structured.visual_effects {
            Some(effects) => effects
                .iter()
                .map(|effect| sanitize_line(effect).to_ascii_lowercase())
                .filter(|effect| !effect.is_empty())
                .take(3)
                .collect(),
            None => vec!["sparkles".to_string(), "glow".to_string()],
        };

        Self {
            character_name: name,
            custom_type,
            stats: [first, second],
            effect_description,
            visual_effects,
            warnings,
        }
    }
}

/// Parses raw provider text straight into card content.
pub fn parse_card_content(raw: &str) -> Result<CardContent, CardError> {
    Ok(CardContent::from_structured(StructuredText::parse(raw)?))
}

/// Keeps ASCII letters, digits, space, newline and `. , ! ? ' -`.
pub fn sanitize_ascii(text: &str) -> String {
    text.chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, ' ' | '.' | ',' | '!' | '?' | '\'' | '-' | '\n')
        })
        .collect()
}

/// [sanitize_ascii] for text drawn on a single line: newlines and runs of
/// spaces become one space.
pub fn sanitize_line(text: &str) -> String {
    sanitize_ascii(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cuts to `max_chars`, ending in `...` when something was removed.
pub fn shorten_to_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

/// The prompt for a card. The descriptor, when given, is a theme hint.
pub fn build_prompt(traits: &TraitSet, custom_descriptor: Option<&str>) -> CardPrompt {
    let mut instructions = String::from(
        "You are a creative personality card designer who makes hilarious, entertaining \
         trading cards. Based on the five things about this character, reply with a single \
         JSON object and nothing else:\n\n\
         {\n\
         \x20 \"card_name\": \"funny name built from the traits, max 25 characters\",\n\
         \x20 \"custom_type\": \"exactly one of the 20 personality types below\",\n\
         \x20 \"stat1_name\": \"creative stat name, e.g. Chaos, Rizz, Drama, Vibe Strength\",\n\
         \x20 \"stat1_value\": 100 to 3000 in steps of 100,\n\
         \x20 \"stat2_name\": \"a different stat that complements the first\",\n\
         \x20 \"stat2_value\": 100 to 3000 in steps of 100,\n\
         \x20 \"effect_description\": \"trading-card effect text with a meme twist\",\n\
         \x20 \"visual_effects\": [\"two or three of sparkles, flames, lightning, glitch, \
         shadows, stars, neon, smoke, bubbles\"]\n\
         }\n\n\
         If you cannot produce JSON, write one `key: value` line per field instead.\n\n\
         20 PERSONALITY TYPES (choose the ONE that fits best):\n",
    );

    for family in TypeFamily::ALL {
        instructions.push('\n');
        instructions.push_str(family.heading());
        instructions.push_str(":\n");
        for ty in PersonalityType::ALL.iter().filter(|ty| ty.family() == family) {
            instructions.push_str(&format!("- \"{}\": {}\n", ty.name(), ty.description()));
        }
    }

    instructions.push_str(&format!(
        "\nRULES:\n\
         1. card_name is at most {MAX_NAME_CHARS} characters including spaces. Use the person's \
         name if one is mentioned, never a generic name or a filename.\n\
         2. Pick the type that matches the dominant trait.\n\
         3. Invent two unique stat names for this personality, not ATK/DEF.\n\
         4. Stat values are between {STAT_MIN} and {STAT_MAX} in steps of {STAT_STEP} and \
         reflect how strong the trait is.\n\
         5. effect_description reads like a trading-card effect (\"When this card is \
         activated...\"), 3-4 complete sentences, referencing EACH of the five things. \
         Hard limit of {MAX_EFFECT_CHARS} characters including spaces. Use only letters, \
         numbers, spaces and . , ! ? ' -\n\
         6. Suggest 2-3 visual effects that suit the personality.\n\n\
         Examples:\n\
         - always the life of the party -> Juice, Charisma 2400, Energy 2100\n\
         - always ghosting plans -> Ghost, Vanish Speed 2800, Commitment 200\n\
         - excessive flexing -> Flex, Clout 2700, Humility 100\n"
    ));

    let mut user = String::from("Here are five things about this character:\n\n");
    for (index, fact) in traits.as_slice().iter().enumerate() {
        user.push_str(&format!("{}. {}\n", index + 1, fact));
    }
    if let Some(descriptor) = custom_descriptor.map(str::trim).filter(|d| !d.is_empty()) {
        user.push_str(&format!("\nTheme hint for the card: {descriptor}\n"));
    }

    CardPrompt { instructions, user }
}

/// Turns five facts into card content via the provider chain.
#[derive(Clone)]
pub struct ContentGenerator {
    chain: ProviderChain,
}

impl ContentGenerator {
    /// Wraps a provider chain.
    pub fn new(chain: ProviderChain) -> Self {
        Self { chain }
    }

    /// The underlying chain.
    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    /// Prompt, provider chain, then bounds and defaults.
    pub async fn build_content(
        &self,
        traits: &TraitSet,
        custom_descriptor: Option<&str>,
    ) -> Result<CardContent, GenerationFailure> {
        let prompt = build_prompt(traits, custom_descriptor);
        let structured = self.chain.generate(&prompt).await?;
        Ok(CardContent::from_structured(structured))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::tests::{GLITCH_JSON, MockProvider};
    use std::time::Duration;

    fn traits() -> TraitSet {
        TraitSet::new([
            "Collects rubber ducks",
            "Talks to plants",
            "Never replies to texts",
            "Owns 40 hoodies",
            "Cries at commercials",
        ])
        .expect("valid traits")
    }

    #[test]
    fn trait_set_names_the_missing_trait() {
        let err = TraitSet::new(["a", "b", "  ", "d", "e"]).expect_err("blank trait");
        assert_eq!(err.to_string(), "Trait 3 is required");

        let err = TraitSet::new(["a", "b"]).expect_err("too few");
        assert_eq!(err.to_string(), "Trait 3 is required");

        let err = TraitSet::new(["a", "b", "c", "d", "e", "f"]).expect_err("too many");
        assert_eq!(err.to_string(), "Exactly 5 traits are required");

        let err = TraitSet::new(["a", "b", "c", "d", "e", " "]).expect_err("blank sixth");
        assert_eq!(err.to_string(), "Exactly 5 traits are required");

        let ok = TraitSet::new([" a ", "b", "c", "d", "e"]).expect("valid");
        assert_eq!(ok.as_slice()[0], "a");
    }

    #[test]
    fn parses_json_wrapped_in_prose_and_fences() {
        let raw = format!("Sure! Here you go:\n```json\n{GLITCH_JSON}\n```\nEnjoy.");
        let parsed = StructuredText::parse(&raw).expect("parse");
        assert_eq!(parsed.name, "Buffer Betty");
        assert_eq!(parsed.personality_type, "Glitch");
        assert_eq!(parsed.stats.len(), 2);
        assert_eq!(parsed.stats[0].value, StatValue::Number(2400));
        assert_eq!(
            parsed.visual_effects,
            Some(vec!["glitch".to_string(), "neon".to_string()])
        );
    }

    #[test]
    fn parses_key_value_lines_with_aliases_and_markdown() {
        let raw = "**Name:** Sir Naps-a-Lot\n\
                   - Type: ghost\n\
                   * Stat1 Name: Nap Speed\n\
                   * stat1-value: 2,800\n\
                   Ability: When this card is summoned, all plans are cancelled.\n\
                   Effects: smoke, shadows";
        let parsed = StructuredText::parse(raw).expect("parse");
        assert_eq!(parsed.name, "Sir Naps-a-Lot");
        assert_eq!(parsed.personality_type, "ghost");
        assert_eq!(
            parsed.stats,
            vec![RawStat {
                label: "Nap Speed".to_string(),
                value: StatValue::Number(2800)
            }]
        );
        assert!(parsed.effect_description.starts_with("When this card"));
        assert_eq!(
            parsed.visual_effects,
            Some(vec!["smoke".to_string(), "shadows".to_string()])
        );
    }

    #[test]
    fn missing_fields_are_named() {
        assert_eq!(StructuredText::parse("   "), Err(ParseError::Empty));
        assert_eq!(
            StructuredText::parse(r#"{"custom_type": "Sus"}"#),
            Err(ParseError::MissingField("card_name"))
        );
        assert_eq!(
            StructuredText::parse(r#"{"card_name": "X", "stat1_name": "A", "stat1_value": 5}"#),
            Err(ParseError::MissingField("custom_type"))
        );
        assert_eq!(
            StructuredText::parse(r#"{"card_name": "X", "custom_type": "Sus", "stat1_name": "A"}"#),
            Err(ParseError::MissingField("stat1_name/stat1_value"))
        );
    }

    #[test]
    fn parse_is_idempotent() {
        assert_eq!(
            StructuredText::parse(GLITCH_JSON),
            StructuredText::parse(GLITCH_JSON)
        );
    }

    #[test]
    fn stats_are_clamped_and_rounded() {
        let stat = |value| {
            Stat::bounded(&RawStat {
                label: "Chaos".to_string(),
                value,
            })
        };
        assert_eq!(stat(StatValue::Number(9999)).value, StatValue::Number(3000));
        assert_eq!(stat(StatValue::Number(-50)).value, StatValue::Number(100));
        assert_eq!(stat(StatValue::Number(1249)).value, StatValue::Number(1200));
        assert_eq!(stat(StatValue::Number(1250)).value, StatValue::Number(1300));
        assert_eq!(stat(StatValue::Number(i64::MAX)).value, StatValue::Number(3000));
        assert_eq!(stat(StatValue::Number(i64::MIN)).value, StatValue::Number(100));
        assert_eq!(
            stat(StatValue::Text("INFINITE!!".to_string())).value,
            StatValue::Text("INFINITE".to_string())
        );
        assert_eq!(stat(StatValue::Number(2400)).to_string(), "Chaos: 2400");
        assert_eq!(stat(StatValue::Text("???".to_string())).fill_ratio(), 0.5);
    }

    #[test]
    fn extreme_stats_and_multiline_names_from_json() {
        let raw = r#"{"card_name": "Foo\nBar", "custom_type": "Lag",
            "stat1_name": "Load\nTime", "stat1_value": 1e30,
            "stat2_name": "Patience", "stat2_value": -1e30}"#;
        let content = parse_card_content(raw).expect("parse");
        assert_eq!(content.character_name, "Foo Bar");
        assert_eq!(content.stats[0].to_string(), "Load Time: 3000");
        assert_eq!(content.stats[1].to_string(), "Patience: 100");
    }

    #[test]
    fn content_bounds_and_defaults() {
        let structured = StructuredText {
            name: "Captain Überlong Name That Keeps Going".to_string(),
            personality_type: "Wizard".to_string(),
            stats: vec![RawStat {
                label: "Rizz".to_string(),
                value: StatValue::Number(5000),
            }],
            effect_description: "x".repeat(400),
            visual_effects: Some(vec![
                "Sparkles".into(),
                "glow".into(),
                "neon".into(),
                "smoke".into(),
            ]),
        };
        let content = CardContent::from_structured(structured);

        assert_eq!(content.character_name, "Captain berlong Name That");
        assert!(content.character_name.chars().count() <= MAX_NAME_CHARS);
        assert_eq!(content.custom_type, PersonalityType::Vibe);
        assert_eq!(content.warnings.len(), 1);
        assert_eq!(content.stats[0].to_string(), "Rizz: 3000");
        assert_eq!(content.stats[1].to_string(), "Defense: 1000");
        assert_eq!(content.effect_description.chars().count(), MAX_EFFECT_CHARS);
        assert!(content.effect_description.ends_with("..."));
        assert_eq!(content.visual_effects, vec!["sparkles", "glow", "neon"]);
    }

    #[test]
    fn sanitizes_and_shortens() {
        assert_eq!(sanitize_ascii("Hey… it’s “fine” 🔥!"), "Hey its fine !");
        assert_eq!(sanitize_line("  Foo\nBar   Baz\n"), "Foo Bar Baz");
        assert_eq!(shorten_to_chars("abcdef", 10), "abcdef");
        assert_eq!(shorten_to_chars("abc def ghi", 8), "abc d...");
        assert_eq!(shorten_to_chars("abcdef", 3), "abc");
    }

    #[test]
    fn parse_card_content_surfaces_parse_errors() {
        let err = parse_card_content("no fields at all").expect_err("should fail");
        assert!(matches!(err, CardError::Parse(ParseError::MissingField("card_name"))));
        let content = parse_card_content(GLITCH_JSON).expect("parse");
        assert_eq!(content.custom_type, PersonalityType::Glitch);
    }

    #[test]
    fn prompt_lists_traits_types_and_hint() {
        let prompt = build_prompt(&traits(), Some("  space pirate "));
        for ty in PersonalityType::ALL {
            assert!(prompt.instructions.contains(&format!("\"{}\"", ty.name())));
        }
        assert!(prompt.instructions.contains("DIGITAL & LOGIC:"));
        assert!(prompt.user.contains("3. Never replies to texts"));
        assert!(prompt.user.contains("Theme hint for the card: space pirate"));

        let plain = build_prompt(&traits(), Some("   "));
        assert!(!plain.user.contains("Theme hint"));
    }

    #[tokio::test]
    async fn generator_runs_the_chain() {
        let primary = MockProvider::failing("gemini", "down");
        let secondary = MockProvider::ok("openai", GLITCH_JSON);
        let generator = ContentGenerator::new(ProviderChain::new(
            primary,
            secondary.clone(),
            Duration::from_secs(5),
        ));

        let content = generator
            .build_content(&traits(), None)
            .await
            .expect("content");
        assert_eq!(content.character_name, "Buffer Betty");
        assert_eq!(content.stats[1].to_string(), "Uptime: 300");
        assert!(content.warnings.is_empty());
        assert_eq!(secondary.call_count(), 1);
    }
}
