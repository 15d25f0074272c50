use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use tracing::warn;

use crate::api::PokedexApi;
use crate::persist::SelectionStore;
use crate::state::{
    available_types, FilterState, ParsedEvolution, Pokemon, PokemonDetail, PokemonSpecies,
    SortMode,
};

pub const FAVORITES_KEY: &str = "pokemon-favorites";
pub const TEAM_KEY: &str = "pokemon-team";
pub const TEAM_LIMIT: usize = 6;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("team is full (6)")]
    TeamFull,
}

/// Session-scoped data store. Owns every cache, the filter state, and
/// both selection collections; nothing outside this type mutates them.
///
/// All fetches run on one logical thread of control. A caller that finds
/// a fetch for its id already in flight does not start a second request;
/// it re-checks the loading set every 100ms until the original fetch
/// clears it, then reads whatever landed in the cache. Failed fetches
/// are never cached, so a later call retries naturally.
pub struct PokedexStore {
    api: Rc<dyn PokedexApi>,
    selections: Rc<dyn SelectionStore>,

    all_pokemon: RefCell<Vec<Pokemon>>,
    list_loading: Cell<bool>,
    last_error: RefCell<Option<String>>,

    detail_cache: RefCell<HashMap<u16, PokemonDetail>>,
    detail_loading: RefCell<HashSet<u16>>,
    species_cache: RefCell<HashMap<u16, PokemonSpecies>>,
    species_loading: RefCell<HashSet<u16>>,
    evolution_cache: RefCell<HashMap<u16, Vec<ParsedEvolution>>>,
    evolution_loading: RefCell<HashSet<u16>>,

    filter: RefCell<FilterState>,
    favorite_ids: RefCell<Vec<u16>>,
    team_ids: RefCell<Vec<u16>>,
}

impl PokedexStore {
    /// Builds the store and loads both persisted selections. Missing or
    /// malformed entries load as empty.
    pub fn new(api: Rc<dyn PokedexApi>, selections: Rc<dyn SelectionStore>) -> Self {
        let favorite_ids = load_ids(selections.as_ref(), FAVORITES_KEY);
        let team_ids = load_ids(selections.as_ref(), TEAM_KEY);

        Self {
            api,
            selections,
            all_pokemon: RefCell::new(Vec::new()),
            list_loading: Cell::new(false),
            last_error: RefCell::new(None),
            detail_cache: RefCell::new(HashMap::new()),
            detail_loading: RefCell::new(HashSet::new()),
            species_cache: RefCell::new(HashMap::new()),
            species_loading: RefCell::new(HashSet::new()),
            evolution_cache: RefCell::new(HashMap::new()),
            evolution_loading: RefCell::new(HashSet::new()),
            filter: RefCell::new(FilterState::default()),
            favorite_ids: RefCell::new(favorite_ids),
            team_ids: RefCell::new(team_ids),
        }
    }

    /// Loads the full Pokémon list. The list is session-scoped: once a
    /// load succeeds, repeat calls return without touching the network.
    pub async fn load_pokedex(&self) -> bool {
        if !self.all_pokemon.borrow().is_empty() {
            return true;
        }

        self.list_loading.set(true);
        let result = self.api.fetch_pokemon_list().await;
        self.list_loading.set(false);

        match result {
            Ok(list) => {
                *self.all_pokemon.borrow_mut() = list;
                *self.last_error.borrow_mut() = None;
                true
            }
            Err(err) => {
                warn!("Failed to fetch Pokémon list: {err}");
                *self.last_error.borrow_mut() = Some(err.to_string());
                false
            }
        }
    }

    pub fn pokedex(&self) -> Vec<Pokemon> {
        self.all_pokemon.borrow().clone()
    }

    pub fn is_list_loading(&self) -> bool {
        self.list_loading.get()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    /// Cached detail when present; otherwise joins any in-flight fetch
    /// for the same id by polling, or performs the network call itself.
    pub async fn fetch_detail(&self, id: u16) -> Option<PokemonDetail> {
        if let Some(detail) = self.get_detail(id) {
            return Some(detail);
        }
        if self.is_detail_loading(id) {
            await_idle(&self.detail_loading, id).await;
            return self.get_detail(id);
        }

        self.detail_loading.borrow_mut().insert(id);
        let result = self.api.fetch_pokemon_detail(id).await;
        self.detail_loading.borrow_mut().remove(&id);

        match result {
            Ok(detail) => {
                self.detail_cache.borrow_mut().insert(id, detail.clone());
                Some(detail)
            }
            Err(err) => {
                warn!("Failed to fetch detail for #{id}: {err}");
                None
            }
        }
    }

    pub fn get_detail(&self, id: u16) -> Option<PokemonDetail> {
        self.detail_cache.borrow().get(&id).cloned()
    }

    pub fn is_detail_loading(&self, id: u16) -> bool {
        self.detail_loading.borrow().contains(&id)
    }

    /// Species fetch, keyed by Pokémon id with the resource URL supplied
    /// by the caller (the detail response carries it).
    pub async fn fetch_species(&self, id: u16, species_url: &str) -> Option<PokemonSpecies> {
        if let Some(species) = self.get_species(id) {
            return Some(species);
        }
        if self.is_species_loading(id) {
            await_idle(&self.species_loading, id).await;
            return self.get_species(id);
        }

        self.species_loading.borrow_mut().insert(id);
        let result = self.api.fetch_species(species_url).await;
        self.species_loading.borrow_mut().remove(&id);

        match result {
            Ok(species) => {
                self.species_cache.borrow_mut().insert(id, species.clone());
                Some(species)
            }
            Err(err) => {
                warn!("Failed to fetch species for #{id}: {err}");
                None
            }
        }
    }

    pub fn get_species(&self, id: u16) -> Option<PokemonSpecies> {
        self.species_cache.borrow().get(&id).cloned()
    }

    pub fn is_species_loading(&self, id: u16) -> bool {
        self.species_loading.borrow().contains(&id)
    }

    /// Flattened evolution family for `id`. The result is cached under
    /// every member id, so looking up any stage of a family returns the
    /// full family. Failures resolve to an empty list cached for `id`
    /// alone.
    pub async fn fetch_evolution_chain(&self, id: u16) -> Vec<ParsedEvolution> {
        if let Some(chain) = self.evolution_cache.borrow().get(&id) {
            return chain.clone();
        }
        if self.is_evolution_loading(id) {
            await_idle(&self.evolution_loading, id).await;
            return self.get_evolution_chain(id);
        }

        self.evolution_loading.borrow_mut().insert(id);
        let parsed = self.resolve_chain(id).await;
        {
            let mut cache = self.evolution_cache.borrow_mut();
            if parsed.is_empty() {
                cache.insert(id, Vec::new());
            } else {
                for member in &parsed {
                    cache.insert(member.id, parsed.clone());
                }
            }
        }
        self.evolution_loading.borrow_mut().remove(&id);

        parsed
    }

    pub fn get_evolution_chain(&self, id: u16) -> Vec<ParsedEvolution> {
        self.evolution_cache
            .borrow()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_evolution_loading(&self, id: u16) -> bool {
        self.evolution_loading.borrow().contains(&id)
    }

    /// Species lookup for the chain walk: cache first, then one fetch if
    /// the cached detail can supply the species URL.
    async fn species_for_chain(&self, id: u16) -> Option<PokemonSpecies> {
        if let Some(species) = self.get_species(id) {
            return Some(species);
        }
        let species_url = self.get_detail(id).map(|detail| detail.species_url)?;
        self.fetch_species(id, &species_url).await
    }

    async fn resolve_chain(&self, id: u16) -> Vec<ParsedEvolution> {
        let Some(species) = self.species_for_chain(id).await else {
            return Vec::new();
        };
        let Some(url) = species.evolution_chain_url else {
            return Vec::new();
        };
        let root = match self.api.fetch_evolution_chain(&url).await {
            Ok(root) => root,
            Err(err) => {
                warn!("Failed to fetch evolution chain for #{id}: {err}");
                return Vec::new();
            }
        };

        // Depth-first, parent before children, children in declared
        // order. A failed node prunes its own subtree; siblings already
        // on the stack keep going.
        let mut parsed = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match self
                .api
                .fetch_pokemon_detail_by_name(&node.species_name)
                .await
            {
                Ok(detail) => {
                    parsed.push(ParsedEvolution::from_detail(&detail));
                    for child in node.evolves_to.into_iter().rev() {
                        stack.push(child);
                    }
                }
                Err(err) => {
                    warn!(
                        "Failed to fetch evolution stage {}: {err}",
                        node.species_name
                    );
                }
            }
        }
        parsed
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        self.filter.borrow_mut().query = query.into();
    }

    pub fn toggle_type_filter(&self, type_name: &str) {
        let mut filter = self.filter.borrow_mut();
        if let Some(pos) = filter
            .selected_types
            .iter()
            .position(|name| name == type_name)
        {
            filter.selected_types.remove(pos);
        } else {
            filter.selected_types.push(type_name.to_string());
        }
    }

    pub fn clear_type_filters(&self) {
        self.filter.borrow_mut().selected_types.clear();
    }

    pub fn set_sort_mode(&self, sort: SortMode) {
        self.filter.borrow_mut().sort = sort;
    }

    pub fn clear_all_filters(&self) {
        *self.filter.borrow_mut() = FilterState::default();
    }

    pub fn filter(&self) -> FilterState {
        self.filter.borrow().clone()
    }

    /// The list view: search, then type filter, then sort.
    pub fn filtered_sorted(&self) -> Vec<Pokemon> {
        self.filter.borrow().apply(&self.all_pokemon.borrow())
    }

    pub fn available_types(&self) -> Vec<String> {
        available_types(&self.all_pokemon.borrow())
    }

    pub fn is_favorite(&self, id: u16) -> bool {
        self.favorite_ids.borrow().contains(&id)
    }

    pub fn toggle_favorite(&self, id: u16) {
        {
            let mut ids = self.favorite_ids.borrow_mut();
            if let Some(pos) = ids.iter().position(|&member| member == id) {
                ids.remove(pos);
            } else {
                ids.push(id);
            }
        }
        self.persist_ids(FAVORITES_KEY, &self.favorite_ids.borrow());
    }

    pub fn add_favorite(&self, id: u16) {
        {
            let mut ids = self.favorite_ids.borrow_mut();
            if ids.contains(&id) {
                return;
            }
            ids.push(id);
        }
        self.persist_ids(FAVORITES_KEY, &self.favorite_ids.borrow());
    }

    pub fn remove_favorite(&self, id: u16) {
        {
            let mut ids = self.favorite_ids.borrow_mut();
            let Some(pos) = ids.iter().position(|&member| member == id) else {
                return;
            };
            ids.remove(pos);
        }
        self.persist_ids(FAVORITES_KEY, &self.favorite_ids.borrow());
    }

    pub fn favorite_ids(&self) -> Vec<u16> {
        self.favorite_ids.borrow().clone()
    }

    /// Favorite members of the full list, in list order (not selection
    /// order).
    pub fn favorites(&self) -> Vec<Pokemon> {
        let ids = self.favorite_ids.borrow();
        self.all_pokemon
            .borrow()
            .iter()
            .filter(|pokemon| ids.contains(&pokemon.id))
            .cloned()
            .collect()
    }

    pub fn is_in_team(&self, id: u16) -> bool {
        self.team_ids.borrow().contains(&id)
    }

    pub fn can_add_to_team(&self, id: u16) -> bool {
        let ids = self.team_ids.borrow();
        ids.len() < TEAM_LIMIT && !ids.contains(&id)
    }

    pub fn add_to_team(&self, id: u16) -> Result<(), StoreError> {
        {
            let mut ids = self.team_ids.borrow_mut();
            if ids.len() >= TEAM_LIMIT {
                return Err(StoreError::TeamFull);
            }
            if ids.contains(&id) {
                return Ok(());
            }
            ids.push(id);
        }
        self.persist_ids(TEAM_KEY, &self.team_ids.borrow());
        Ok(())
    }

    pub fn remove_from_team(&self, id: u16) {
        {
            let mut ids = self.team_ids.borrow_mut();
            let Some(pos) = ids.iter().position(|&member| member == id) else {
                return;
            };
            ids.remove(pos);
        }
        self.persist_ids(TEAM_KEY, &self.team_ids.borrow());
    }

    pub fn toggle_team_member(&self, id: u16) -> Result<(), StoreError> {
        if self.is_in_team(id) {
            self.remove_from_team(id);
            return Ok(());
        }
        self.add_to_team(id)
    }

    pub fn team_ids(&self) -> Vec<u16> {
        self.team_ids.borrow().clone()
    }

    /// Team members of the full list, in list order.
    pub fn team(&self) -> Vec<Pokemon> {
        let ids = self.team_ids.borrow();
        self.all_pokemon
            .borrow()
            .iter()
            .filter(|pokemon| ids.contains(&pokemon.id))
            .cloned()
            .collect()
    }

    /// Best-effort write-back. A failure is logged and never rolls back
    /// the in-memory mutation.
    fn persist_ids(&self, key: &str, ids: &[u16]) {
        let encoded = match serde_json::to_string(ids) {
            Ok(json) => json,
            Err(err) => {
                warn!("Failed to encode {key}: {err}");
                return;
            }
        };
        if let Err(err) = self.selections.save(key, &encoded) {
            warn!("Failed to persist {key}: {err}");
        }
    }
}

fn load_ids(store: &dyn SelectionStore, key: &str) -> Vec<u16> {
    let Some(raw) = store.load(key) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(ids) => ids,
        Err(err) => {
            warn!("Discarding malformed {key} data: {err}");
            Vec::new()
        }
    }
}

/// Re-checks the loading set every poll interval until the in-flight
/// fetch for `id` clears it. The borrow is released before each sleep so
/// the owning fetch can make progress.
async fn await_idle(loading: &RefCell<HashSet<u16>>, id: u16) {
    while loading.borrow().contains(&id) {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
