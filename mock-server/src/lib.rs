use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

/// Fixture catalog: `(name, primary type)`. Ids are 1-based positions.
pub const CATALOG: &[(&str, &str)] = &[
    ("bulbasaur", "grass"),
    ("ivysaur", "grass"),
    ("venusaur", "grass"),
    ("charmander", "fire"),
    ("charmeleon", "fire"),
    ("charizard", "fire"),
    ("squirtle", "water"),
    ("wartortle", "water"),
    ("blastoise", "water"),
    ("caterpie", "bug"),
    ("metapod", "bug"),
    ("butterfree", "bug"),
    ("weedle", "bug"),
    ("kakuna", "bug"),
    ("beedrill", "bug"),
    ("pidgey", "normal"),
    ("pidgeotto", "normal"),
    ("pidgeot", "normal"),
    ("rattata", "normal"),
    ("raticate", "normal"),
    ("spearow", "normal"),
    ("fearow", "normal"),
    ("ekans", "poison"),
    ("arbok", "poison"),
    ("pikachu", "electric"),
    ("raichu", "electric"),
    ("sandshrew", "ground"),
    ("sandslash", "ground"),
    ("nidoran-f", "poison"),
    ("nidorina", "poison"),
];

/// `(type, signature ability, short effect)`.
const ABILITIES: &[(&str, &str, &str)] = &[
    ("grass", "overgrow", "Strengthens grass moves to inflict 1.5x damage at 1/3 max HP or less."),
    ("fire", "blaze", "Strengthens fire moves to inflict 1.5x damage at 1/3 max HP or less."),
    ("water", "torrent", "Strengthens water moves to inflict 1.5x damage at 1/3 max HP or less."),
    ("bug", "shield-dust", "Protects against incoming moves' extra effects."),
    ("normal", "keen-eye", "Prevents accuracy from being lowered."),
    ("poison", "intimidate", "Lowers opponents' Attack one stage upon entering battle."),
    ("electric", "static", "Has a 30% chance of paralyzing attacking Pokemon on contact."),
    ("ground", "sand-veil", "Increases evasion to 1.25x during a sandstorm."),
];

/// `(type, double_damage_from, half_damage_from, no_damage_from)`.
type Matchup = (
    &'static str,
    &'static [&'static str],
    &'static [&'static str],
    &'static [&'static str],
);

const MATCHUPS: &[Matchup] = &[
    ("grass", &["fire", "bug", "poison"], &["water", "electric", "ground", "grass"], &[]),
    ("fire", &["water", "ground"], &["fire", "grass", "bug"], &[]),
    ("water", &["grass", "electric"], &["fire", "water"], &[]),
    ("bug", &["fire"], &["grass", "ground"], &[]),
    ("normal", &[], &[], &[]),
    ("poison", &["ground"], &["grass", "bug", "poison"], &[]),
    ("electric", &["ground"], &["electric"], &[]),
    ("ground", &["water", "grass"], &["poison"], &["electric"]),
];

const STAT_NAMES: [&str; 6] = [
    "hp",
    "attack",
    "defense",
    "special-attack",
    "special-defense",
    "speed",
];

const API_PREFIX: &str = "/api/v2";
const DEFAULT_LIMIT: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListingPage {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<NamedResource>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    pub height: u32,
    pub weight: u32,
    pub base_experience: Option<u32>,
    pub sprites: Sprites,
    pub types: Vec<TypeSlot>,
    pub stats: Vec<StatSlot>,
    pub abilities: Vec<AbilitySlot>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sprites {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
    pub other: OtherSprites,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork")]
    pub official_artwork: Artwork,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artwork {
    pub front_default: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeSlot {
    pub slot: u32,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatSlot {
    pub base_stat: u32,
    pub effort: u32,
    pub stat: NamedResource,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub is_hidden: bool,
    pub slot: u32,
    pub ability: NamedResource,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ability {
    pub id: u32,
    pub name: String,
    pub effect_entries: Vec<EffectEntry>,
    pub pokemon: Vec<AbilityHolder>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EffectEntry {
    pub effect: String,
    pub short_effect: String,
    pub language: NamedResource,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbilityHolder {
    pub is_hidden: bool,
    pub slot: u32,
    pub pokemon: NamedResource,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Type {
    pub id: u32,
    pub name: String,
    pub damage_relations: DamageRelations,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DamageRelations {
    pub double_damage_from: Vec<NamedResource>,
    pub double_damage_to: Vec<NamedResource>,
    pub half_damage_from: Vec<NamedResource>,
    pub half_damage_to: Vec<NamedResource>,
    pub no_damage_from: Vec<NamedResource>,
    pub no_damage_to: Vec<NamedResource>,
}

#[derive(Deserialize)]
pub struct Paging {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Shared server state: a request counter and an optional artificial delay.
#[derive(Clone, Default)]
pub struct MockState {
    hits: Arc<AtomicUsize>,
    latency: Duration,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Requests served so far, across every clone of this state.
    pub fn request_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    async fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

pub fn app() -> Router {
    router(MockState::new())
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/v2/pokemon", get(list_pokemon))
        .route("/api/v2/pokemon/{id_or_name}", get(get_pokemon))
        .route("/api/v2/ability/{name}", get(get_ability))
        .route("/api/v2/type/{name}", get(get_type))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, MockState::new()).await
}

pub async fn serve(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

async fn list_pokemon(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(paging): Query<Paging>,
) -> Json<ListingPage> {
    state.hit().await;
    let base = api_base(&headers);
    let limit = paging.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = paging.offset.unwrap_or(0);
    debug!(limit, offset, "list pokemon");

    let results = CATALOG
        .iter()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(i, (name, _))| resource(&base, "pokemon", i + 1, name))
        .collect();
    let next = (offset + limit < CATALOG.len())
        .then(|| format!("{base}/pokemon?offset={}&limit={limit}", offset + limit));
    let previous = (offset > 0).then(|| {
        format!(
            "{base}/pokemon?offset={}&limit={limit}",
            offset.saturating_sub(limit)
        )
    });

    Json(ListingPage {
        count: CATALOG.len(),
        next,
        previous,
        results,
    })
}

async fn get_pokemon(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id_or_name): Path<String>,
) -> Result<Json<Pokemon>, StatusCode> {
    state.hit().await;
    let index = match id_or_name.parse::<usize>() {
        Ok(id) => id.checked_sub(1).filter(|i| *i < CATALOG.len()),
        Err(_) => CATALOG.iter().position(|(name, _)| *name == id_or_name),
    }
    .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(pokemon(&api_base(&headers), index)))
}

async fn get_ability(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Ability>, StatusCode> {
    state.hit().await;
    let base = api_base(&headers);
    let position = ABILITIES
        .iter()
        .position(|(_, ability, _)| *ability == name)
        .ok_or(StatusCode::NOT_FOUND)?;
    let (kind, ability, short_effect) = ABILITIES[position];

    let pokemon = CATALOG
        .iter()
        .enumerate()
        .filter(|(_, (_, t))| *t == kind)
        .map(|(i, (holder, _))| AbilityHolder {
            is_hidden: false,
            slot: 1,
            pokemon: resource(&base, "pokemon", i + 1, holder),
        })
        .collect();

    Ok(Json(Ability {
        id: position as u32 + 1,
        name: ability.to_string(),
        effect_entries: vec![EffectEntry {
            effect: format!("{short_effect} This effect is always active."),
            short_effect: short_effect.to_string(),
            language: NamedResource {
                name: "en".to_string(),
                url: format!("{base}/language/9/"),
            },
        }],
        pokemon,
    }))
}

async fn get_type(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Type>, StatusCode> {
    state.hit().await;
    let base = api_base(&headers);
    let position = MATCHUPS
        .iter()
        .position(|(kind, ..)| *kind == name)
        .ok_or(StatusCode::NOT_FOUND)?;
    let (kind, double_from, half_from, none_from) = MATCHUPS[position];

    // The "to" side is the inverse of every other type's "from" lists.
    let attacked_by = |pick: fn(&Matchup) -> &'static [&'static str]| {
        MATCHUPS
            .iter()
            .filter(|m| pick(m).contains(&kind))
            .map(|m| type_resource(&base, m.0))
            .collect::<Vec<_>>()
    };

    Ok(Json(Type {
        id: position as u32 + 1,
        name: kind.to_string(),
        damage_relations: DamageRelations {
            double_damage_from: double_from.iter().map(|t| type_resource(&base, t)).collect(),
            double_damage_to: attacked_by(|m| m.1),
            half_damage_from: half_from.iter().map(|t| type_resource(&base, t)).collect(),
            half_damage_to: attacked_by(|m| m.2),
            no_damage_from: none_from.iter().map(|t| type_resource(&base, t)).collect(),
            no_damage_to: attacked_by(|m| m.3),
        },
    }))
}

fn pokemon(base: &str, index: usize) -> Pokemon {
    let id = index + 1;
    let (name, kind) = CATALOG[index];
    let ability = ABILITIES
        .iter()
        .find(|(t, ..)| *t == kind)
        .map(|(_, ability, _)| *ability)
        .unwrap_or("run-away");
    let stats = STAT_NAMES
        .iter()
        .enumerate()
        .map(|(k, stat)| StatSlot {
            base_stat: 30 + ((id * 7 + k * 11) % 70) as u32,
            effort: u32::from(k == 0),
            stat: NamedResource {
                name: stat.to_string(),
                url: format!("{base}/stat/{}/", k + 1),
            },
        })
        .collect();
    let sprite = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

    Pokemon {
        id: id as u32,
        name: name.to_string(),
        height: 3 + (id % 17) as u32,
        weight: 20 + (id * 37 % 900) as u32,
        base_experience: Some(50 + (id * 13 % 200) as u32),
        sprites: Sprites {
            front_default: Some(format!("{sprite}/{id}.png")),
            front_shiny: Some(format!("{sprite}/shiny/{id}.png")),
            other: OtherSprites {
                official_artwork: Artwork {
                    front_default: Some(format!("{sprite}/other/official-artwork/{id}.png")),
                },
            },
        },
        types: vec![TypeSlot {
            slot: 1,
            kind: type_resource(base, kind),
        }],
        stats,
        abilities: vec![AbilitySlot {
            is_hidden: false,
            slot: 1,
            ability: NamedResource {
                name: ability.to_string(),
                url: format!("{base}/ability/{ability}/"),
            },
        }],
    }
}

fn resource(base: &str, kind: &str, id: usize, name: &str) -> NamedResource {
    NamedResource {
        name: name.to_string(),
        url: format!("{base}/{kind}/{id}/"),
    }
}

fn type_resource(base: &str, name: &str) -> NamedResource {
    let id = MATCHUPS
        .iter()
        .position(|(kind, ..)| *kind == name)
        .map_or(0, |i| i + 1);
    resource(base, "type", id, name)
}

/// Absolute API root as seen by the caller, taken from the `Host` header.
fn api_base(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}{API_PREFIX}")
}
