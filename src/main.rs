//! Craft Planner
//!
//! Command-line front end for the production chain resolver.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use regex::Regex;
use rusqlite::Connection;

use craft_planner::calculator::{self, Resolver};
use craft_planner::models::{
    ItemId, ItemRecord, MachineId, MachineRecord, RecipeRecord, SlotRecord, format_price,
};
use craft_planner::{Catalogue, area, db, depth, extract, reach};

#[derive(Parser)]
#[command(name = "craft-planner")]
#[command(about = "Production chain resolver for crafting graphs")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, env = "CRAFT_DB", default_value = "craft_data.db")]
    database: PathBuf,

    /// Log resolver details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which machines may run and which items are free
#[derive(Args, Debug)]
struct Constraints {
    /// Unlocked machine (repeatable); all machines when omitted
    #[arg(short, long = "unlock")]
    unlock: Vec<String>,

    /// Free starting item (repeatable); stored defaults when omitted
    #[arg(short, long = "start")]
    start: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import items.json, machines*.json and starting.json from a directory
    Import {
        /// Directory holding the catalogue files
        data_dir: PathBuf,
    },

    /// List items in the catalogue
    ListItems {
        /// Only show items whose id or name matches this regex
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List machines and their recipes
    ListMachines,

    /// Show details for a specific item
    Item {
        /// Item id
        id: String,
    },

    /// Items reachable from the starting items
    Reach {
        #[command(flatten)]
        constraints: Constraints,
    },

    /// Items that can be made downstream of an item
    From {
        /// Source item id
        item: String,

        #[command(flatten)]
        constraints: Constraints,
    },

    /// Cheapest plan for an amount of an item
    Path {
        /// Target item id
        item: String,

        /// Amount to produce
        #[arg(short, long, default_value = "1.0")]
        amount: f64,

        #[command(flatten)]
        constraints: Constraints,
    },

    /// Layout columns by production depth
    Depths {
        #[command(flatten)]
        constraints: Constraints,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without catalogue files)
    LoadSample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import { data_dir } => {
            let stats = extract::extract_to_database(&conn, &data_dir)?;
            println!("\n{}", stats);
        }

        Commands::ListItems { filter } => {
            let catalogue = db::load_catalogue(&conn)?;
            let re = filter.as_deref().map(Regex::new).transpose()?;
            if catalogue.item_count() == 0 {
                println!("No items in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<24} {:<30} {:>10}", "Id", "Name", "Price");
                println!("{}", "-".repeat(66));
                for id in catalogue.item_ids() {
                    let item = catalogue.item(id);
                    if let Some(re) = &re {
                        if !re.is_match(&item.key) && !re.is_match(&item.name) {
                            continue;
                        }
                    }
                    println!("{:<24} {:<30} {:>10}", item.key, item.name, format_price(item.price));
                }
            }
        }

        Commands::ListMachines => {
            let catalogue = db::load_catalogue(&conn)?;
            if catalogue.machine_count() == 0 {
                println!("No machines in database. Run 'import' or 'load-sample' first.");
            }
            for id in catalogue.machine_ids() {
                let machine = catalogue.machine(id);
                println!(
                    "{} (slots {} in / {} out{})",
                    machine.name,
                    machine.input_slots,
                    machine.output_slots,
                    if machine.pulls_items { ", pulls items" } else { "" }
                );
                for &recipe in &machine.recipes {
                    println!("  {}", catalogue.recipe(recipe).key);
                }
            }
        }

        Commands::Item { id } => {
            let catalogue = db::load_catalogue(&conn)?;
            let item_id = find_item(&catalogue, &id)?;
            let item = catalogue.item(item_id);
            println!("Item: {}", item.name);
            println!("  ID: {}", item.key);
            println!("  Price: ${}", format_price(item.price));
            if item.generator {
                println!("  Generator{}", if item.container { " (container)" } else { "" });
            }

            let produced_by = catalogue.produced_by(item_id);
            if !produced_by.is_empty() {
                println!("  Produced by:");
                for &r in produced_by {
                    let recipe = catalogue.recipe(r);
                    println!("    {} @ {}", recipe.key, catalogue.machine(recipe.machine).name);
                }
            }
            let used_in = catalogue.used_in(item_id);
            if !used_in.is_empty() {
                println!("  Used in:");
                for &r in used_in {
                    let recipe = catalogue.recipe(r);
                    println!("    {} @ {}", recipe.key, catalogue.machine(recipe.machine).name);
                }
            }
        }

        Commands::Reach { constraints } => {
            let catalogue = db::load_catalogue(&conn)?;
            let (unlocked, starting) = resolve_constraints(&conn, &catalogue, &constraints)?;
            let reachable = reach::find_reachable(&catalogue, &unlocked, &starting);
            print_items("Reachable items", &catalogue, &reachable);
        }

        Commands::From { item, constraints } => {
            let catalogue = db::load_catalogue(&conn)?;
            let source = find_item(&catalogue, &item)?;
            let (unlocked, _) = resolve_constraints(&conn, &catalogue, &constraints)?;
            let downstream = reach::items_from(&catalogue, source, &unlocked);
            print_items(&format!("Items made from {}", item), &catalogue, &downstream);

            let mut edges: Vec<_> = depth::edges_from(&catalogue, &downstream, &unlocked)
                .into_iter()
                .collect();
            edges.sort_unstable();
            for (from, to) in edges {
                println!("  {} -> {}", catalogue.item(from).key, catalogue.item(to).key);
            }
        }

        Commands::Path {
            item,
            amount,
            constraints,
        } => {
            let catalogue = db::load_catalogue(&conn)?;
            let target = find_item(&catalogue, &item)?;
            let (unlocked, starting) = resolve_constraints(&conn, &catalogue, &constraints)?;

            let mut resolver = Resolver::new(&catalogue);
            match resolver.find_best_path_to_item(target, &unlocked, &starting, amount)? {
                Some(path) => {
                    let summary = calculator::summarize_plan(&catalogue, &path, target, amount);
                    println!("{}", summary);
                    println!("{}", area::estimate_area(&catalogue, &path, &starting));

                    if cli.verbose {
                        let mut edges: Vec<_> =
                            depth::path_edges(&catalogue, &path).into_iter().collect();
                        edges.sort_unstable();
                        println!("\nEdges:");
                        for (from, to) in edges {
                            println!("  {} -> {}", catalogue.item(from).key, catalogue.item(to).key);
                        }
                    }
                }
                None => println!("{} is unreachable with the current machines and items", item),
            }
        }

        Commands::Depths { constraints } => {
            let catalogue = db::load_catalogue(&conn)?;
            let (unlocked, starting) = resolve_constraints(&conn, &catalogue, &constraints)?;
            let depths = depth::compute_depths(&catalogue, &starting, &unlocked);
            let reachable = reach::find_reachable(&catalogue, &unlocked, &starting);

            for (i, column) in depth::layout_columns(&depths, &reachable).iter().enumerate() {
                let keys: Vec<&str> = column
                    .iter()
                    .map(|&id| catalogue.item(id).key.as_str())
                    .collect();
                println!("Column {}: {}", i, keys.join(", "));
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

fn find_item(catalogue: &Catalogue, key: &str) -> Result<ItemId> {
    catalogue
        .item_id(key)
        .ok_or_else(|| anyhow!("Item '{}' not found", key))
}

/// Turn CLI names into id sets, falling back to all machines and stored starting items
fn resolve_constraints(
    conn: &Connection,
    catalogue: &Catalogue,
    constraints: &Constraints,
) -> Result<(HashSet<MachineId>, HashSet<ItemId>)> {
    let unlocked: HashSet<MachineId> = if constraints.unlock.is_empty() {
        catalogue.machine_ids().collect()
    } else {
        constraints
            .unlock
            .iter()
            .map(|name| {
                catalogue
                    .machine_id(name)
                    .ok_or_else(|| anyhow!("Machine '{}' not found", name))
            })
            .collect::<Result<_>>()?
    };

    let start_keys = if constraints.start.is_empty() {
        db::load_starting_items(conn)?
    } else {
        constraints.start.clone()
    };
    let starting: HashSet<ItemId> = start_keys
        .iter()
        .map(|key| find_item(catalogue, key))
        .collect::<Result<_>>()?;

    Ok((unlocked, starting))
}

fn print_items(title: &str, catalogue: &Catalogue, items: &HashSet<ItemId>) {
    let mut ids: Vec<_> = items.iter().copied().collect();
    ids.sort_unstable();
    println!("{} ({}):", title, ids.len());
    for id in ids {
        let item = catalogue.item(id);
        println!("  {:<24} {}", item.key, item.name);
    }
}

/// Load a small sample catalogue for testing without catalogue files
fn load_sample_data(conn: &Connection) -> Result<()> {
    db::clear_catalogue(conn)?;

    let item = |id: &str, name: &str, price: f64, generator: bool| ItemRecord {
        id: id.to_string(),
        name: name.to_string(),
        price,
        image: format!("{}.png", id),
        generator,
        container: false,
    };
    let slot = |item: &str, amount: f64| SlotRecord {
        item: item.to_string(),
        amount,
    };

    let items = vec![
        item("oak_log", "Oak Log", 2.0, true),
        item("cobblestone", "Cobblestone", 1.0, true),
        item("coal", "Coal", 5.0, true),
        item("raw_iron", "Raw Iron", 12.0, true),
        item("oak_planks", "Oak Planks", 4.0, false),
        item("stick", "Stick", 3.0, false),
        item("charcoal", "Charcoal", 6.0, false),
        item("iron_ingot", "Iron Ingot", 40.0, false),
        item("iron_pickaxe", "Iron Pickaxe", 1500.0, false),
        item("stone", "Stone", 3.0, false),
    ];

    let machines = vec![
        MachineRecord {
            name: "Sawmill".to_string(),
            image: "sawmill.png".to_string(),
            input_slots: 1,
            output_slots: 1,
            pulls_items: true,
            recipes: vec![
                RecipeRecord {
                    id: "planks".to_string(),
                    inputs: vec![slot("oak_log", 1.0)],
                    outputs: vec![slot("oak_planks", 4.0)],
                },
                RecipeRecord {
                    id: "sticks".to_string(),
                    inputs: vec![slot("oak_planks", 2.0)],
                    outputs: vec![slot("stick", 4.0)],
                },
            ],
        },
        MachineRecord {
            name: "Furnace".to_string(),
            image: "furnace.png".to_string(),
            input_slots: 2,
            output_slots: 1,
            pulls_items: true,
            recipes: vec![
                RecipeRecord {
                    id: "smelt_iron_coal".to_string(),
                    inputs: vec![slot("raw_iron", 8.0), slot("coal", 1.0)],
                    outputs: vec![slot("iron_ingot", 8.0)],
                },
                RecipeRecord {
                    id: "charcoal".to_string(),
                    inputs: vec![slot("oak_log", 1.0), slot("oak_planks", 1.0)],
                    outputs: vec![slot("charcoal", 1.0)],
                },
                RecipeRecord {
                    id: "smelt_iron_charcoal".to_string(),
                    inputs: vec![slot("raw_iron", 8.0), slot("charcoal", 1.0)],
                    outputs: vec![slot("iron_ingot", 8.0)],
                },
                RecipeRecord {
                    id: "stone".to_string(),
                    inputs: vec![slot("cobblestone", 1.0), slot("coal", 0.125)],
                    outputs: vec![slot("stone", 1.0)],
                },
            ],
        },
        MachineRecord {
            name: "Crafter".to_string(),
            image: "crafter.png".to_string(),
            input_slots: 9,
            output_slots: 1,
            pulls_items: false,
            recipes: vec![RecipeRecord {
                id: "iron_pickaxe".to_string(),
                inputs: vec![slot("iron_ingot", 3.0), slot("stick", 2.0)],
                outputs: vec![slot("iron_pickaxe", 1.0)],
            }],
        },
    ];

    // Validate before writing, same as an import
    let catalogue = Catalogue::from_records(&items, &machines)?;

    for (i, item) in items.iter().enumerate() {
        db::upsert_item(conn, i, item)?;
    }
    for (i, machine) in machines.iter().enumerate() {
        db::insert_machine(conn, i, machine)?;
    }
    db::set_starting_items(
        conn,
        &["oak_log", "cobblestone", "coal", "raw_iron"].map(String::from),
    )?;

    println!(
        "Loaded {} sample items, {} machines",
        catalogue.item_count(),
        catalogue.machine_count()
    );
    Ok(())
}
