use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand};

use pokedex::api::RemoteApi;
use pokedex::persist::FileStore;
use pokedex::route;
use pokedex::state::{Pokemon, PokemonDetail, SortMode};
use pokedex::store::{PokedexStore, TEAM_LIMIT};

#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(about = "Pokédex reference client")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List Pokémon with optional search, type filter, and sort order
    List {
        #[arg(long)]
        query: Option<String>,
        /// Type filter; repeat the flag to select several types
        #[arg(long = "type")]
        types: Vec<String>,
        /// Sort order; defaults to alphabetical-asc
        #[arg(long, value_enum)]
        sort: Option<SortMode>,
    },
    /// Show one Pokémon's detail and species entry
    Detail { id: u16 },
    /// Show the flattened evolution family for one Pokémon
    Evolutions { id: u16 },
    /// Show the team, optionally adding or removing a member first
    Team {
        #[arg(long)]
        add: Option<u16>,
        #[arg(long)]
        remove: Option<u16>,
    },
    /// Show favorites, optionally toggling one first
    Favourites {
        #[arg(long)]
        toggle: Option<u16>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let store = PokedexStore::new(Rc::new(RemoteApi::new()), Rc::new(FileStore::new()));

    match args.command {
        Command::List { query, types, sort } => run_list(&store, query, types, sort).await,
        Command::Detail { id } => run_detail(&store, id).await,
        Command::Evolutions { id } => run_evolutions(&store, id).await,
        Command::Team { add, remove } => run_team(&store, add, remove).await,
        Command::Favourites { toggle } => run_favourites(&store, toggle).await,
    }
}

async fn run_list(
    store: &PokedexStore,
    query: Option<String>,
    types: Vec<String>,
    sort: Option<SortMode>,
) -> ExitCode {
    if !store.load_pokedex().await {
        eprintln!(
            "Could not load the Pokémon list: {}",
            store.last_error().unwrap_or_default()
        );
        return ExitCode::FAILURE;
    }

    if let Some(query) = query {
        store.set_search_query(query);
    }
    for type_name in &types {
        store.toggle_type_filter(type_name);
    }
    store.set_sort_mode(sort.unwrap_or_default());

    let entries = store.filtered_sorted();
    if entries.is_empty() {
        println!("No Pokémon match.");
        return ExitCode::SUCCESS;
    }
    for pokemon in &entries {
        print_row(pokemon);
    }
    ExitCode::SUCCESS
}

async fn run_detail(store: &PokedexStore, id: u16) -> ExitCode {
    if !route::valid_id(id) {
        eprintln!("No Pokémon with number {id}.");
        return ExitCode::FAILURE;
    }
    let Some(detail) = store.fetch_detail(id).await else {
        eprintln!("Could not load Pokémon #{id}.");
        return ExitCode::FAILURE;
    };

    println!("#{} {}", detail.id, detail.name);
    println!("  types:      {}", type_names(&detail));
    println!("  height:     {} dm", detail.height);
    println!("  weight:     {} hg", detail.weight);
    println!("  base xp:    {}", detail.base_experience);
    println!("  abilities:  {}", detail.abilities.join(", "));
    for stat in &detail.stats {
        println!("  {:<11} {}", format!("{}:", stat.name), stat.value);
    }

    if let Some(species) = store.fetch_species(id, &detail.species_url).await {
        if let Some(genus) = species.genus {
            println!("  genus:      {genus}");
        }
        if let Some(flavor) = species.flavor_text {
            println!("  entry:      {flavor}");
        }
    }
    ExitCode::SUCCESS
}

async fn run_evolutions(store: &PokedexStore, id: u16) -> ExitCode {
    if !route::valid_id(id) {
        eprintln!("No Pokémon with number {id}.");
        return ExitCode::FAILURE;
    }
    let Some(detail) = store.fetch_detail(id).await else {
        eprintln!("Could not load Pokémon #{id}.");
        return ExitCode::FAILURE;
    };
    store.fetch_species(id, &detail.species_url).await;

    let family = store.fetch_evolution_chain(id).await;
    if family.is_empty() {
        println!("No evolution data for {}.", detail.name);
        return ExitCode::SUCCESS;
    }
    for stage in &family {
        let marker = if stage.id == id { "*" } else { " " };
        println!("{marker} #{} {}", stage.number, stage.name);
    }
    ExitCode::SUCCESS
}

async fn run_team(store: &PokedexStore, add: Option<u16>, remove: Option<u16>) -> ExitCode {
    if let Some(id) = add {
        if let Err(err) = store.add_to_team(id) {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    }
    if let Some(id) = remove {
        store.remove_from_team(id);
    }

    let ids = store.team_ids();
    println!("Team ({}/{}):", ids.len(), TEAM_LIMIT);
    print_members(store, &ids).await;
    ExitCode::SUCCESS
}

async fn run_favourites(store: &PokedexStore, toggle: Option<u16>) -> ExitCode {
    if let Some(id) = toggle {
        store.toggle_favorite(id);
    }

    let ids = store.favorite_ids();
    println!("Favourites ({}):", ids.len());
    print_members(store, &ids).await;
    ExitCode::SUCCESS
}

async fn print_members(store: &PokedexStore, ids: &[u16]) {
    if ids.is_empty() {
        println!("  (empty)");
        return;
    }
    // Member rows come from the list projection when the list loads;
    // otherwise fall back to bare ids.
    if store.load_pokedex().await {
        let members = store
            .pokedex()
            .into_iter()
            .filter(|pokemon| ids.contains(&pokemon.id))
            .collect::<Vec<_>>();
        for pokemon in &members {
            print_row(pokemon);
        }
    } else {
        for id in ids {
            println!("  #{id:03}");
        }
    }
}

fn print_row(pokemon: &Pokemon) {
    let types = pokemon
        .types
        .iter()
        .map(|slot| slot.name.as_str())
        .collect::<Vec<_>>()
        .join("/");
    println!("  #{} {:<12} {}", pokemon.number(), pokemon.name, types);
}

fn type_names(detail: &PokemonDetail) -> String {
    detail
        .types
        .iter()
        .map(|slot| slot.name.as_str())
        .collect::<Vec<_>>()
        .join("/")
}
