//! Industry Planner
//!
//! Production chain and shopping route planner for EVE Online industry.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use industry_planner::assets::AssetSource;
use industry_planner::calculator::{self, ResolveRequest};
use industry_planner::catalog::Catalog;
use industry_planner::config::PlannerConfig;
use industry_planner::db::{self, SqliteStore};
use industry_planner::models::{Activity, AssetLine, Blueprint, Decision, DependencyEdge, Item, PriceQuote, TypeId};
use industry_planner::planner::{self, PlanRequest};
use industry_planner::{chains, extract};

#[derive(Parser)]
#[command(name = "industry-planner")]
#[command(about = "Production chain and shopping route planner for EVE Online industry")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "industry.db")]
    database: PathBuf,

    /// Planner configuration (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ResolveArgs {
    /// Item to build, by name or type id
    item: String,

    /// Number of production runs
    #[arg(short, long, default_value = "1")]
    runs: u64,

    /// Material efficiency (0-10)
    #[arg(long, default_value = "0")]
    me: u8,

    /// Time efficiency (0-20)
    #[arg(long, default_value = "0")]
    te: u8,

    /// Component to build instead of buy (repeatable)
    #[arg(long = "build")]
    build: Vec<String>,

    /// Component to buy even with --build-all (repeatable)
    #[arg(long = "buy")]
    buy: Vec<String>,

    /// Build every producible component unless listed with --buy
    #[arg(long)]
    build_all: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import static data from an SDE CSV dump
    Import {
        /// Directory containing invTypes.csv and the industryActivity*.csv files
        sde_dir: PathBuf,

        /// Clear existing static data before import
        #[arg(long)]
        clear: bool,
    },

    /// Resolve the material list for an item
    Resolve {
        #[command(flatten)]
        args: ResolveArgs,

        /// Show the full expansion tree
        #[arg(short, long)]
        verbose: bool,
    },

    /// Resolve materials and plan where to buy them
    Shop {
        #[command(flatten)]
        args: ResolveArgs,

        /// Home region (id or name) used as the single-hub baseline
        #[arg(long)]
        home: Option<String>,

        /// Subtract this character's assets before shopping
        #[arg(long)]
        character: Option<i64>,
    },

    /// Compute and store the raw-material chain cache for an item
    Chains {
        /// Item by name or type id
        item: String,
    },

    /// List all producible items in the database
    ListBlueprints,

    /// Show details for a specific item
    Item {
        /// Item by name or type id
        key: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without an SDE dump)
    LoadSample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("industry_planner={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => PlannerConfig::from_config_file(path)?,
        None => PlannerConfig::default(),
    };

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;
    let store = SqliteStore::new(&conn);

    match cli.command {
        Commands::Import { sde_dir, clear } => {
            if clear {
                info!("clearing existing static data");
                db::clear_static_data(&conn)?;
            }
            let stats = extract::import_sde(&conn, &sde_dir)?;
            println!("{}", stats);
        }

        Commands::Resolve { args, verbose } => {
            let request = build_request(&conn, &args)?;
            let resolution = calculator::resolve_with_depth_limit(&store, &request, config.max_depth)?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            } else {
                if verbose {
                    println!("Production chain:\n");
                    println!("{}", calculator::format_resolution(&store, &resolution)?);
                }
                println!("{}", resolution);
            }
        }

        Commands::Shop {
            args,
            home,
            character,
        } => {
            let mut plan_request = PlanRequest::new(build_request(&conn, &args)?);
            if let Some(key) = home {
                let region = config
                    .find_region(&key)
                    .ok_or_else(|| anyhow!("Region '{}' is not configured", key))?;
                plan_request.home_region = Some(region.id);
            }
            if let Some(character_id) = character {
                plan_request.owned = store.character_assets(character_id)?;
            }

            let plan = planner::plan_shopping(&store, &store, &store, &config, &plan_request)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{}", plan);
            }
        }

        Commands::Chains { item } => {
            let item = lookup(&conn, &item)?;
            let entries = chains::build_chains(&store, item.id)?;
            db::replace_chains(&conn, item.id, &entries)?;

            println!("{:<32} {:>16} {:>6}  Path", "Material", "Quantity", "Depth");
            println!("{}", "-".repeat(80));
            for entry in &entries {
                let name = store
                    .item(entry.material_id)?
                    .map_or_else(|| entry.material_id.to_string(), |i| i.name);
                println!(
                    "{:<32} {:>16} {:>6}  {}",
                    name, entry.total_quantity, entry.max_depth, entry.path
                );
            }
        }

        Commands::ListBlueprints => {
            let blueprints = db::list_blueprints(&conn)?;
            if blueprints.is_empty() {
                println!("No blueprints in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<10} {:<40} {:>8}", "Type", "Product", "Per run");
                println!("{}", "-".repeat(60));
                for (item, output) in blueprints {
                    println!("{:<10} {:<40} {:>8}", item.id, item.name, output);
                }
            }
        }

        Commands::Item { key } => {
            let item = lookup(&conn, &key)?;
            println!("Item: {}", item.name);
            println!("  ID: {}", item.id);
            println!("  Volume: {} m3", item.volume_m3);
            if let Some(price) = item.base_price {
                println!("  Base price: {:.2} ISK", price);
            }

            if let Some(bp) = store.blueprint(item.id)? {
                println!(
                    "  Blueprint {} ({:?}, {} per run, {}s)",
                    bp.blueprint_type_id, bp.activity, bp.output_per_run, bp.base_time_s
                );
                for edge in &bp.materials {
                    let name = store
                        .item(edge.material_id)?
                        .map_or_else(|| edge.material_id.to_string(), |i| i.name);
                    let kind = if edge.is_raw { " (raw)" } else { "" };
                    println!("    {} x {}{}", edge.base_quantity, name, kind);
                }
            } else {
                println!("  Raw material (no blueprint)");
            }

            let consumers = db::get_consumers(&conn, item.id)?;
            if !consumers.is_empty() {
                println!("  Used by:");
                for (product, quantity) in consumers {
                    let name = store
                        .item(product)?
                        .map_or_else(|| product.to_string(), |i| i.name);
                    println!("    {} ({} per run)", name, quantity);
                }
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn, &config)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

fn lookup(conn: &Connection, key: &str) -> Result<Item> {
    db::find_item(conn, key)?.ok_or_else(|| anyhow!("Item '{}' not found", key))
}

fn build_request(conn: &Connection, args: &ResolveArgs) -> Result<ResolveRequest> {
    let item = lookup(conn, &args.item)?;
    let mut request = ResolveRequest::new(item.id, args.runs).with_efficiency(args.me, args.te);
    if args.build_all {
        request = request.with_default_decision(Decision::Build);
    }
    for key in &args.build {
        request = request.with_decision(lookup(conn, key)?.id, Decision::Build);
    }
    for key in &args.buy {
        let id = lookup(conn, key)?.id;
        if request.decisions.get(&id) == Some(&Decision::Build) {
            bail!("'{}' is listed with both --build and --buy", key);
        }
        request = request.with_decision(id, Decision::Buy);
    }
    Ok(request)
}

/// Load a small hand-made data set for trying the planner without an SDE dump
fn load_sample_data(conn: &Connection, config: &PlannerConfig) -> Result<()> {
    db::clear_static_data(conn)?;
    db::clear_snapshots(conn)?;

    let items: [(TypeId, &str, f64, f64); 13] = [
        (34, "Tritanium", 0.01, 4.0),
        (35, "Pyerite", 0.01, 9.0),
        (36, "Mexallon", 0.01, 40.0),
        (37, "Isogen", 0.01, 100.0),
        (38, "Nocxium", 0.01, 600.0),
        (11399, "Morphite", 0.01, 9_000.0),
        (16672, "Tungsten Carbide", 0.01, 120.0),
        (16670, "Crystalline Carbonide", 0.01, 90.0),
        (587, "Rifter", 2_500.0, 450_000.0),
        (11478, "R.A.M.- Starship Tech", 0.04, 1_200.0),
        (11543, "Tungsten Carbide Armor Plate", 1.0, 9_000.0),
        (11532, "Fusion Thruster", 1.0, 15_000.0),
        (11400, "Jaguar", 2_500.0, 28_000_000.0),
    ];
    for (id, name, volume_m3, base_price) in items {
        db::upsert_item(
            conn,
            &Item {
                id,
                name: name.to_string(),
                volume_m3,
                base_price: Some(base_price),
            },
        )?;
    }

    let blueprints: [(TypeId, TypeId, u64, u64, &[(TypeId, u64)]); 5] = [
        (587, 691, 6_000, 1, &[(34, 32_000), (35, 6_000), (36, 2_500), (37, 500)]),
        (11478, 11479, 1_200, 100, &[(34, 500), (35, 400), (36, 200), (37, 100)]),
        (11543, 17319, 360, 1, &[(16672, 22)]),
        (11532, 17308, 360, 1, &[(16670, 9), (38, 2)]),
        (
            11400,
            11401,
            18_000,
            1,
            &[(587, 1), (11543, 138), (11532, 15), (11478, 3), (11399, 38)],
        ),
    ];
    for (product_id, blueprint_type_id, base_time_s, output_per_run, materials) in blueprints {
        let blueprint = Blueprint {
            product_id,
            blueprint_type_id,
            base_time_s,
            output_per_run,
            activity: Activity::Manufacturing,
            materials: materials
                .iter()
                .map(|&(material_id, base_quantity)| DependencyEdge {
                    product_id,
                    material_id,
                    base_quantity,
                    activity: Activity::Manufacturing,
                    is_raw: false,
                })
                .collect(),
        };
        db::upsert_blueprint(conn, &blueprint)?;
    }
    db::refresh_raw_flags(conn)?;

    // Regional markups around the base price; Jita cheapest for most goods
    let markups = [1.00, 1.04, 1.07, 1.03, 0.97];
    for (region, markup) in config.regions.iter().zip(markups) {
        for (id, _, _, base_price) in items {
            // Morphite is not traded outside the home hub in this sample
            if id == 11399 && region.id != config.home_region {
                continue;
            }
            db::upsert_quote(
                conn,
                &PriceQuote {
                    item_id: id,
                    region_id: region.id,
                    lowest_sell: Some(base_price * markup),
                    highest_buy: Some(base_price * markup * 0.9),
                    sell_volume: 50_000_000,
                    buy_volume: 20_000_000,
                },
            )?;
        }
    }

    let hubs: Vec<_> = config.regions.iter().map(|r| r.hub_system).collect();
    for (i, &from) in hubs.iter().enumerate() {
        for (j, &to) in hubs.iter().enumerate().skip(i + 1) {
            db::upsert_route_danger(conn, from, to, 0.2 + 0.1 * (i + j) as f64)?;
        }
    }

    db::insert_asset(
        conn,
        90_000_001,
        &AssetLine {
            item_id: 34,
            quantity: 200_000,
        },
    )?;

    println!("Loaded {} sample items and {} blueprints", items.len(), blueprints.len());
    Ok(())
}
