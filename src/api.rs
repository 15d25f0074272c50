use async_trait::async_trait;
use serde::Deserialize;

use crate::state::{
    EvolutionNode, Pokemon, PokemonDetail, PokemonSpecies, PokemonStat, TypeSlot,
};

pub const API_BASE: &str = "https://pokeapi.co/api/v2";
pub const LIST_URL: &str = "https://stoplight.io/mocks/appwise-be/pokemon/57519009/pokemon";

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("response parse error: {0}")]
    Parse(String),
}

/// Remote data source seam. The store only sees this trait, so tests
/// drive it with an in-memory double. Futures are deliberately not
/// `Send`: everything runs on one logical thread of control.
#[async_trait(?Send)]
pub trait PokedexApi {
    async fn fetch_pokemon_list(&self) -> Result<Vec<Pokemon>, ApiError>;
    async fn fetch_pokemon_detail(&self, id: u16) -> Result<PokemonDetail, ApiError>;
    async fn fetch_pokemon_detail_by_name(&self, name: &str)
        -> Result<PokemonDetail, ApiError>;
    async fn fetch_species(&self, url: &str) -> Result<PokemonSpecies, ApiError>;
    async fn fetch_evolution_chain(&self, url: &str) -> Result<EvolutionNode, ApiError>;
}

#[derive(Clone, Debug, Deserialize)]
struct NamedResource {
    name: String,
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct TypeName {
    name: String,
}

#[derive(Clone, Debug, Deserialize)]
struct TypeSlotResponse {
    slot: u8,
    #[serde(rename = "type")]
    type_info: TypeName,
}

#[derive(Clone, Debug, Deserialize)]
struct ListSprites {
    front_default: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct ListEntryResponse {
    id: u16,
    name: String,
    sprites: ListSprites,
    types: Vec<TypeSlotResponse>,
}

#[derive(Clone, Debug, Deserialize)]
struct AbilitySlotResponse {
    ability: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct StatSlotResponse {
    base_stat: u16,
    stat: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct MoveSlotResponse {
    #[serde(rename = "move")]
    move_info: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonResponse {
    id: u16,
    name: String,
    height: u16,
    weight: u16,
    base_experience: Option<u16>,
    abilities: Vec<AbilitySlotResponse>,
    stats: Vec<StatSlotResponse>,
    moves: Vec<MoveSlotResponse>,
    types: Vec<TypeSlotResponse>,
    species: NamedResource,
    sprites: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct FlavorTextEntry {
    flavor_text: String,
    language: TypeName,
}

#[derive(Clone, Debug, Deserialize)]
struct GenusEntry {
    genus: String,
    language: TypeName,
}

#[derive(Clone, Debug, Deserialize)]
struct ApiResource {
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct SpeciesResponse {
    name: String,
    flavor_text_entries: Vec<FlavorTextEntry>,
    genera: Vec<GenusEntry>,
    evolution_chain: Option<ApiResource>,
    gender_rate: i8,
}

#[derive(Clone, Debug, Deserialize)]
struct EvolutionChainResponse {
    chain: ChainLinkResponse,
}

#[derive(Clone, Debug, Deserialize)]
struct ChainLinkResponse {
    species: NamedResource,
    evolves_to: Vec<ChainLinkResponse>,
}

/// reqwest-backed implementation against the live endpoints.
pub struct RemoteApi {
    client: reqwest::Client,
    api_base: String,
    list_url: String,
}

impl RemoteApi {
    pub fn new() -> Self {
        Self::with_endpoints(API_BASE.to_string(), LIST_URL.to_string())
    }

    pub fn with_endpoints(api_base: String, list_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            list_url,
        }
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ApiError::Request(err.to_string()))?
            .error_for_status()
            .map_err(|err| ApiError::Request(err.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::Request(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::Parse(err.to_string()))
    }
}

impl Default for RemoteApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl PokedexApi for RemoteApi {
    async fn fetch_pokemon_list(&self) -> Result<Vec<Pokemon>, ApiError> {
        let response: Vec<ListEntryResponse> = self.fetch_json(&self.list_url).await?;
        Ok(response.into_iter().map(convert_list_entry).collect())
    }

    async fn fetch_pokemon_detail(&self, id: u16) -> Result<PokemonDetail, ApiError> {
        let url = format!("{}/pokemon/{id}", self.api_base);
        let response: PokemonResponse = self.fetch_json(&url).await?;
        Ok(convert_detail(response))
    }

    async fn fetch_pokemon_detail_by_name(
        &self,
        name: &str,
    ) -> Result<PokemonDetail, ApiError> {
        let url = format!("{}/pokemon/{name}", self.api_base);
        let response: PokemonResponse = self.fetch_json(&url).await?;
        Ok(convert_detail(response))
    }

    async fn fetch_species(&self, url: &str) -> Result<PokemonSpecies, ApiError> {
        let response: SpeciesResponse = self.fetch_json(url).await?;
        Ok(convert_species(response))
    }

    async fn fetch_evolution_chain(&self, url: &str) -> Result<EvolutionNode, ApiError> {
        let response: EvolutionChainResponse = self.fetch_json(url).await?;
        Ok(convert_chain(response.chain))
    }
}

fn convert_list_entry(entry: ListEntryResponse) -> Pokemon {
    Pokemon {
        id: entry.id,
        name: entry.name,
        sprite: entry.sprites.front_default.unwrap_or_default(),
        types: convert_type_slots(entry.types),
    }
}

fn convert_detail(response: PokemonResponse) -> PokemonDetail {
    let sprite_front_default = pointer_string(&response.sprites, "/front_default");
    let sprite_artwork =
        pointer_string(&response.sprites, "/other/official-artwork/front_default");

    PokemonDetail {
        id: response.id,
        name: response.name,
        height: response.height,
        weight: response.weight,
        base_experience: response.base_experience.unwrap_or_default(),
        abilities: response
            .abilities
            .into_iter()
            .map(|slot| slot.ability.name)
            .collect(),
        stats: response
            .stats
            .into_iter()
            .map(|slot| PokemonStat {
                name: slot.stat.name,
                value: slot.base_stat,
            })
            .collect(),
        moves: response
            .moves
            .into_iter()
            .map(|slot| slot.move_info.name)
            .collect(),
        types: convert_type_slots(response.types),
        species_name: response.species.name,
        species_url: response.species.url,
        sprite_front_default,
        sprite_artwork,
    }
}

fn convert_species(response: SpeciesResponse) -> PokemonSpecies {
    let flavor_text = response
        .flavor_text_entries
        .iter()
        .find(|entry| entry.language.name == "en")
        .map(|entry| sanitize_text(&entry.flavor_text));
    let genus = response
        .genera
        .iter()
        .find(|entry| entry.language.name == "en")
        .map(|entry| entry.genus.clone());

    PokemonSpecies {
        name: response.name,
        flavor_text,
        genus,
        evolution_chain_url: response.evolution_chain.map(|chain| chain.url),
        gender_rate: response.gender_rate,
    }
}

fn convert_chain(link: ChainLinkResponse) -> EvolutionNode {
    EvolutionNode {
        species_name: link.species.name,
        evolves_to: link.evolves_to.into_iter().map(convert_chain).collect(),
    }
}

fn convert_type_slots(slots: Vec<TypeSlotResponse>) -> Vec<TypeSlot> {
    slots
        .into_iter()
        .map(|slot| TypeSlot {
            slot: slot.slot,
            name: slot.type_info.name,
        })
        .collect()
}

fn sanitize_text(text: &str) -> String {
    text.replace('\n', " ").replace('\u{000C}', " ")
}

fn pointer_string(value: &serde_json::Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}
