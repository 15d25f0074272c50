#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;

use pokedex::api::{ApiError, PokedexApi};
use pokedex::persist::SelectionStore;
use pokedex::state::{
    EvolutionNode, Pokemon, PokemonDetail, PokemonSpecies, TypeSlot,
};

/// In-memory API double. Every fetch yields on a short timer so
/// overlapping callers really overlap, and counts its calls so tests can
/// assert the dedup invariant.
pub struct FakeApi {
    pub list: RefCell<Vec<Pokemon>>,
    pub details: RefCell<Vec<PokemonDetail>>,
    pub species: RefCell<HashMap<String, PokemonSpecies>>,
    pub chains: RefCell<HashMap<String, EvolutionNode>>,
    pub failing_names: RefCell<HashSet<String>>,
    pub fail_list: Cell<bool>,
    pub delay: Duration,
    pub list_calls: Cell<usize>,
    pub detail_calls: Cell<usize>,
    pub name_calls: Cell<usize>,
    pub species_calls: Cell<usize>,
    pub chain_calls: Cell<usize>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            list: RefCell::new(Vec::new()),
            details: RefCell::new(Vec::new()),
            species: RefCell::new(HashMap::new()),
            chains: RefCell::new(HashMap::new()),
            failing_names: RefCell::new(HashSet::new()),
            fail_list: Cell::new(false),
            delay: Duration::from_millis(10),
            list_calls: Cell::new(0),
            detail_calls: Cell::new(0),
            name_calls: Cell::new(0),
            species_calls: Cell::new(0),
            chain_calls: Cell::new(0),
        }
    }

    pub fn set_list(&self, list: Vec<Pokemon>) {
        *self.list.borrow_mut() = list;
    }

    pub fn insert_detail(&self, detail: PokemonDetail) {
        self.details.borrow_mut().push(detail);
    }

    pub fn insert_species(&self, url: &str, species: PokemonSpecies) {
        self.species.borrow_mut().insert(url.to_string(), species);
    }

    pub fn insert_chain(&self, url: &str, root: EvolutionNode) {
        self.chains.borrow_mut().insert(url.to_string(), root);
    }

    pub fn fail_name(&self, name: &str) {
        self.failing_names.borrow_mut().insert(name.to_string());
    }
}

#[async_trait(?Send)]
impl PokedexApi for FakeApi {
    async fn fetch_pokemon_list(&self) -> Result<Vec<Pokemon>, ApiError> {
        self.list_calls.set(self.list_calls.get() + 1);
        tokio::time::sleep(self.delay).await;
        if self.fail_list.get() {
            return Err(ApiError::Request("list unavailable".to_string()));
        }
        Ok(self.list.borrow().clone())
    }

    async fn fetch_pokemon_detail(&self, id: u16) -> Result<PokemonDetail, ApiError> {
        self.detail_calls.set(self.detail_calls.get() + 1);
        tokio::time::sleep(self.delay).await;
        self.details
            .borrow()
            .iter()
            .find(|detail| detail.id == id)
            .cloned()
            .ok_or_else(|| ApiError::Request(format!("no pokemon {id}")))
    }

    async fn fetch_pokemon_detail_by_name(
        &self,
        name: &str,
    ) -> Result<PokemonDetail, ApiError> {
        self.name_calls.set(self.name_calls.get() + 1);
        tokio::time::sleep(self.delay).await;
        if self.failing_names.borrow().contains(name) {
            return Err(ApiError::Request(format!("{name} unavailable")));
        }
        self.details
            .borrow()
            .iter()
            .find(|detail| detail.name == name)
            .cloned()
            .ok_or_else(|| ApiError::Request(format!("no pokemon {name}")))
    }

    async fn fetch_species(&self, url: &str) -> Result<PokemonSpecies, ApiError> {
        self.species_calls.set(self.species_calls.get() + 1);
        tokio::time::sleep(self.delay).await;
        self.species
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| ApiError::Request(format!("no species at {url}")))
    }

    async fn fetch_evolution_chain(&self, url: &str) -> Result<EvolutionNode, ApiError> {
        self.chain_calls.set(self.chain_calls.get() + 1);
        tokio::time::sleep(self.delay).await;
        self.chains
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| ApiError::Request(format!("no chain at {url}")))
    }
}

/// Key-value double with inspectable entries and switchable write
/// failures.
#[derive(Default)]
pub struct MemoryStore {
    pub entries: RefCell<HashMap<String, String>>,
    pub fail_saves: Cell<bool>,
}

impl MemoryStore {
    pub fn preloaded(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn entry(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl SelectionStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) -> Result<(), String> {
        if self.fail_saves.get() {
            return Err("storage unavailable".to_string());
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub fn pokemon(id: u16, name: &str, types: &[&str]) -> Pokemon {
    Pokemon {
        id,
        name: name.to_string(),
        sprite: format!("https://sprites.test/{id}.png"),
        types: type_slots(types),
    }
}

pub fn detail(id: u16, name: &str, types: &[&str]) -> PokemonDetail {
    PokemonDetail {
        id,
        name: name.to_string(),
        height: 7,
        weight: 69,
        base_experience: 64,
        abilities: vec!["overgrow".to_string()],
        stats: Vec::new(),
        moves: Vec::new(),
        types: type_slots(types),
        species_name: name.to_string(),
        species_url: species_url(id),
        sprite_front_default: Some(format!("https://sprites.test/{id}.png")),
        sprite_artwork: None,
    }
}

pub fn species(name: &str, chain_url: Option<&str>) -> PokemonSpecies {
    PokemonSpecies {
        name: name.to_string(),
        flavor_text: None,
        genus: None,
        evolution_chain_url: chain_url.map(str::to_string),
        gender_rate: 4,
    }
}

pub fn chain(name: &str, evolves_to: Vec<EvolutionNode>) -> EvolutionNode {
    EvolutionNode {
        species_name: name.to_string(),
        evolves_to,
    }
}

pub fn species_url(id: u16) -> String {
    format!("https://api.test/pokemon-species/{id}/")
}

fn type_slots(types: &[&str]) -> Vec<TypeSlot> {
    types
        .iter()
        .enumerate()
        .map(|(index, name)| TypeSlot {
            slot: index as u8 + 1,
            name: (*name).to_string(),
        })
        .collect()
}
