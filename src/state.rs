use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One slot of a Pokémon's type listing, kept in slot order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeSlot {
    pub slot: u8,
    pub name: String,
}

/// A list entry. Immutable once fetched; the full list is loaded once
/// per session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u16,
    pub name: String,
    pub sprite: String,
    pub types: Vec<TypeSlot>,
}

impl Pokemon {
    /// Zero-padded 3-digit dex number, e.g. "004".
    pub fn number(&self) -> String {
        format!("{:03}", self.id)
    }

    fn matches_query(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(query)
            || self.id.to_string().contains(query)
            || self.number().contains(query)
            || self
                .types
                .iter()
                .any(|slot| slot.name.to_lowercase().contains(query))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PokemonStat {
    pub name: String,
    pub value: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PokemonDetail {
    pub id: u16,
    pub name: String,
    pub height: u16,
    pub weight: u16,
    pub base_experience: u16,
    pub abilities: Vec<String>,
    pub stats: Vec<PokemonStat>,
    pub moves: Vec<String>,
    pub types: Vec<TypeSlot>,
    pub species_name: String,
    pub species_url: String,
    pub sprite_front_default: Option<String>,
    pub sprite_artwork: Option<String>,
}

impl PokemonDetail {
    /// Official artwork when present, else the default front sprite,
    /// else empty.
    pub fn best_sprite(&self) -> String {
        self.sprite_artwork
            .clone()
            .or_else(|| self.sprite_front_default.clone())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PokemonSpecies {
    pub name: String,
    pub flavor_text: Option<String>,
    pub genus: Option<String>,
    pub evolution_chain_url: Option<String>,
    pub gender_rate: i8,
}

/// One node of the evolution tree. Chains can branch (Eevee), so every
/// node carries an ordered list of children.
#[derive(Clone, Debug, PartialEq)]
pub struct EvolutionNode {
    pub species_name: String,
    pub evolves_to: Vec<EvolutionNode>,
}

/// One flattened evolution stage, ready for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedEvolution {
    pub id: u16,
    pub name: String,
    pub types: Vec<TypeSlot>,
    pub sprite: String,
    pub number: String,
}

impl ParsedEvolution {
    pub fn from_detail(detail: &PokemonDetail) -> Self {
        Self {
            id: detail.id,
            name: detail.name.clone(),
            types: detail.types.clone(),
            sprite: detail.best_sprite(),
            number: format!("{:03}", detail.id),
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    AlphabeticalAsc,
    AlphabeticalDesc,
    NumericalAsc,
    NumericalDesc,
}

/// Search query, selected type names, and sort order for the list view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub query: String,
    pub selected_types: Vec<String>,
    pub sort: SortMode,
}

impl FilterState {
    /// Search, then type filter, then sort. The order is fixed: sort is
    /// always last.
    ///
    /// A query matches on name, decimal id, zero-padded 3-digit id, or
    /// any type name, all case-folded. The type filter keeps entries
    /// with at least one selected type.
    pub fn apply(&self, list: &[Pokemon]) -> Vec<Pokemon> {
        let mut result: Vec<Pokemon> = list.to_vec();

        let query = self.query.trim().to_lowercase();
        if !query.is_empty() {
            result.retain(|pokemon| pokemon.matches_query(&query));
        }

        if !self.selected_types.is_empty() {
            result.retain(|pokemon| {
                pokemon
                    .types
                    .iter()
                    .any(|slot| self.selected_types.iter().any(|name| name == &slot.name))
            });
        }

        match self.sort {
            SortMode::AlphabeticalAsc => result.sort_by(|a, b| a.name.cmp(&b.name)),
            SortMode::AlphabeticalDesc => result.sort_by(|a, b| b.name.cmp(&a.name)),
            SortMode::NumericalAsc => result.sort_by_key(|pokemon| pokemon.id),
            SortMode::NumericalDesc => result.sort_by(|a, b| b.id.cmp(&a.id)),
        }

        result
    }
}

/// Sorted set of type names appearing anywhere in the list.
pub fn available_types(list: &[Pokemon]) -> Vec<String> {
    let mut types = BTreeSet::new();
    for pokemon in list {
        for slot in &pokemon.types {
            types.insert(slot.name.clone());
        }
    }
    types.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail_with_sprites(
        artwork: Option<&str>,
        front_default: Option<&str>,
    ) -> PokemonDetail {
        PokemonDetail {
            id: 4,
            name: "charmander".to_string(),
            height: 6,
            weight: 85,
            base_experience: 62,
            abilities: Vec::new(),
            stats: Vec::new(),
            moves: Vec::new(),
            types: Vec::new(),
            species_name: "charmander".to_string(),
            species_url: "https://pokeapi.co/api/v2/pokemon-species/4/".to_string(),
            sprite_front_default: front_default.map(str::to_string),
            sprite_artwork: artwork.map(str::to_string),
        }
    }

    #[test]
    fn best_sprite_prefers_artwork() {
        let detail = detail_with_sprites(Some("artwork.png"), Some("front.png"));
        assert_eq!(detail.best_sprite(), "artwork.png");
    }

    #[test]
    fn best_sprite_falls_back_to_front_default() {
        let detail = detail_with_sprites(None, Some("front.png"));
        assert_eq!(detail.best_sprite(), "front.png");
    }

    #[test]
    fn best_sprite_empty_when_none() {
        let detail = detail_with_sprites(None, None);
        assert_eq!(detail.best_sprite(), "");
    }

    #[test]
    fn parsed_evolution_pads_number() {
        let parsed = ParsedEvolution::from_detail(&detail_with_sprites(None, None));
        assert_eq!(parsed.number, "004");
    }
}
