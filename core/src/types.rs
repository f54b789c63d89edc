//! Wire records for the catalog API.
//!
//! # Design
//! Field names reuse the upstream snake_case keys where they already read as
//! Rust; kebab-case keys, the reserved word `type`, and the listing `url`
//! (exposed as `canonical_url`) are mapped per field with `#[serde(rename)]`.
//! Unknown fields are ignored (serde's default), so upstream additions never
//! break parsing. The records also serialize back to the same wire shape,
//! which the FFI bridge relies on when handing payloads to C hosts as JSON.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Location of the per-id sprite used for listing thumbnails.
pub const SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Upper bound of a single base stat.
pub const MAX_BASE_STAT: u32 = 255;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One page of the paginated listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingPage {
    pub count: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<ListingEntry>,
}

/// Lightweight reference returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    #[serde(rename = "url")]
    pub canonical_url: String,
}

impl ListingEntry {
    pub fn new(name: impl Into<String>, canonical_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            canonical_url: canonical_url.into(),
        }
    }

    /// Numeric identity taken from the trailing segment of the canonical URL,
    /// e.g. `https://pokeapi.co/api/v2/pokemon/25/` -> 25.
    pub fn id(&self) -> Result<u32, IdentityError> {
        let trimmed = self.canonical_url.trim_end_matches('/');
        let segment = trimmed
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && trimmed.contains('/'))
            .ok_or_else(|| IdentityError::MissingSegment {
                url: self.canonical_url.clone(),
            })?;
        match segment.parse::<u32>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(IdentityError::InvalidId {
                url: self.canonical_url.clone(),
                segment: segment.to_string(),
            }),
        }
    }

    /// Default sprite location for this entry, built from its derived id.
    pub fn sprite_url(&self) -> Result<String, IdentityError> {
        Ok(format!("{SPRITE_BASE_URL}/{}.png", self.id()?))
    }
}

/// `true` when a page holds fewer entries than requested, meaning the
/// listing is exhausted. The cursor always advances by the full page size, so
/// the offset alone cannot tell.
pub fn is_last_page(entries: &[ListingEntry], page_size: u32) -> bool {
    entries.len() < page_size as usize
}

/// Orderings offered by list screens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    NumberAscending,
    NumberDescending,
    NameAscending,
    NameDescending,
}

/// Sort entries in place. Entries whose id cannot be derived sort last under
/// the numeric orderings.
pub fn sort_entries(entries: &mut [ListingEntry], option: SortOption) {
    fn by_id(a: &ListingEntry, b: &ListingEntry) -> Ordering {
        match (a.id(), b.id()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => Ordering::Equal,
        }
    }
    match option {
        SortOption::NumberAscending => entries.sort_by(by_id),
        SortOption::NumberDescending => entries.sort_by(|a, b| match (a.id(), b.id()) {
            (Ok(x), Ok(y)) => y.cmp(&x),
            _ => by_id(a, b),
        }),
        SortOption::NameAscending => entries.sort_by(|a, b| a.name.cmp(&b.name)),
        SortOption::NameDescending => entries.sort_by(|a, b| b.name.cmp(&a.name)),
    }
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

/// How a detail record is addressed: by numeric id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DetailKey {
    Id(u32),
    Name(String),
}

impl DetailKey {
    /// Path segment for the detail endpoint. Names are lowercased because the
    /// upstream catalog is case-sensitive.
    pub fn path_segment(&self) -> String {
        match self {
            DetailKey::Id(id) => id.to_string(),
            DetailKey::Name(name) => name.trim().to_lowercase(),
        }
    }
}

impl From<u32> for DetailKey {
    fn from(id: u32) -> Self {
        DetailKey::Id(id)
    }
}

impl From<&str> for DetailKey {
    fn from(name: &str) -> Self {
        DetailKey::Name(name.to_string())
    }
}

impl From<String> for DetailKey {
    fn from(name: String) -> Self {
        DetailKey::Name(name)
    }
}

impl fmt::Display for DetailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailKey::Id(id) => write!(f, "#{id}"),
            DetailKey::Name(name) => write!(f, "{name}"),
        }
    }
}

/// `name` + `url` pair used throughout the upstream schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

/// Full record for one catalog entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    /// Tenths of a metre.
    pub height: u32,
    /// Tenths of a kilogram.
    pub weight: u32,
    #[serde(default)]
    pub base_experience: Option<u32>,
    pub sprites: Sprites,
    pub types: Vec<TypeSlot>,
    pub stats: Vec<StatSlot>,
    pub abilities: Vec<AbilitySlot>,
}

impl Pokemon {
    /// `#001`-style label.
    pub fn formatted_id(&self) -> String {
        format!("#{:03}", self.id)
    }

    pub fn height_meters(&self) -> f64 {
        f64::from(self.height) / 10.0
    }

    pub fn weight_kilograms(&self) -> f64 {
        f64::from(self.weight) / 10.0
    }

    /// Higher-resolution artwork when the source supplied it, otherwise the
    /// default sprite.
    pub fn artwork_url(&self) -> Option<&str> {
        self.sprites
            .other
            .as_ref()
            .and_then(|o| o.official_artwork.as_ref())
            .and_then(|a| a.front_default.as_deref())
            .or(self.sprites.front_default.as_deref())
    }

    pub fn total_base_stats(&self) -> u32 {
        self.stats.iter().map(|s| s.base_stat).sum()
    }

    /// Type names ordered by slot.
    pub fn type_names(&self) -> Vec<&str> {
        let mut slots: Vec<&TypeSlot> = self.types.iter().collect();
        slots.sort_by_key(|t| t.slot);
        slots.into_iter().map(|t| t.kind.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub front_shiny: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<OfficialArtwork>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfficialArtwork {
    #[serde(default)]
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeSlot {
    /// 1-based.
    pub slot: u32,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatSlot {
    pub base_stat: u32,
    #[serde(default)]
    pub effort: u32,
    pub stat: NamedResource,
}

impl StatSlot {
    /// Fraction of `MAX_BASE_STAT`, clamped to 1.0.
    pub fn percentage(&self) -> f64 {
        (f64::from(self.base_stat) / f64::from(MAX_BASE_STAT)).min(1.0)
    }

    /// Short label used by stat bars.
    pub fn label(&self) -> String {
        match self.stat.name.as_str() {
            "hp" => "HP".to_string(),
            "special-attack" => "Sp. Atk".to_string(),
            "special-defense" => "Sp. Def".to_string(),
            other => display_name(other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbilitySlot {
    pub is_hidden: bool,
    pub slot: u32,
    pub ability: NamedResource,
}

/// `"special-attack"` -> `"Special Attack"`.
pub fn display_name(raw: &str) -> String {
    raw.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Auxiliary lookups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbilityDetail {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
    #[serde(default)]
    pub pokemon: Vec<AbilityHolder>,
}

impl AbilityDetail {
    /// Short English effect text, falling back to the long form.
    pub fn english_effect(&self) -> Option<&str> {
        self.effect_entries
            .iter()
            .find(|e| e.language.name == "en")
            .map(|e| {
                if e.short_effect.is_empty() {
                    e.effect.as_str()
                } else {
                    e.short_effect.as_str()
                }
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectEntry {
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub short_effect: String,
    pub language: NamedResource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbilityHolder {
    pub is_hidden: bool,
    pub slot: u32,
    pub pokemon: NamedResource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeDetail {
    pub id: u32,
    pub name: String,
    pub damage_relations: DamageRelations,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DamageRelations {
    #[serde(default)]
    pub double_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub double_damage_to: Vec<NamedResource>,
    #[serde(default)]
    pub half_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub half_damage_to: Vec<NamedResource>,
    #[serde(default)]
    pub no_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub no_damage_to: Vec<NamedResource>,
}
