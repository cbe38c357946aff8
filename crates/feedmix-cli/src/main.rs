use clap::{Parser, Subcommand, ValueEnum};
use feedmix_engine::{
    load_cattle_types, load_feed_catalog, sample, CattleType, FeedCatalog, FeedCombination, FeedItem, InMemorySource,
    MixEngine, MixSolution, Nutrient, NutrientBounds, ProfileSource,
};
use feedmix_solver::Solver;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feedmix")]
#[command(about = "Least-cost feed mixes for cattle", long_about = None)]
struct Cli {
    /// Feed catalog document (bundled sample catalog when omitted)
    #[arg(long, global = true, env = "FEEDMIX_FEEDS")]
    feeds: Option<PathBuf>,
    /// Cattle type document (bundled sample profiles when omitted)
    #[arg(long, global = true, env = "FEEDMIX_CATTLE_TYPES")]
    cattle_types: Option<PathBuf>,
    /// Solver tolerance for floating point comparisons
    #[arg(long, global = true, default_value_t = 1e-9)]
    tolerance: f64,
    /// Maximum simplex pivots per phase
    #[arg(long, global = true, default_value_t = 10000)]
    max_iterations: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the cheapest ration for a cattle type
    Solve {
        /// Cattle type id, e.g. ct1
        cattle_type: String,
        /// Body weight in kg
        #[arg(short, long)]
        weight: f64,
        /// Restrict the mix to these feed ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: Format,
        /// Save the mix as a feed combination document
        #[arg(long)]
        save: Option<PathBuf>,
        /// Name of the saved combination
        #[arg(long)]
        name: Option<String>,
        /// Show shadow prices of the nutrient bounds
        #[arg(short, long)]
        analysis: bool,
    },
    /// List feeds and cattle types
    List {
        /// Only feeds in this category
        #[arg(long)]
        category: Option<String>,
        /// Only feeds costing at least this much
        #[arg(long)]
        min_price: Option<f64>,
        /// Only feeds costing at most this much
        #[arg(long)]
        max_price: Option<f64>,
    },
    /// Check the feed catalog and cattle type documents for errors
    Check,
}

fn load_source(feeds: Option<&Path>, cattle_types: Option<&Path>) -> feedmix_engine::Result<InMemorySource> {
    let feeds = match feeds {
        Some(path) => load_feed_catalog(path)?,
        None => sample::feeds()?,
    };
    let cattle_types = match cattle_types {
        Some(path) => load_cattle_types(path)?,
        None => sample::cattle_types()?,
    };
    debug!(feeds = feeds.len(), cattle_types = cattle_types.len(), "data loaded");
    Ok(InMemorySource::new(feeds, cattle_types))
}

/// Catalog entries matching the optional category and price filters
fn select_feeds(
    catalog: &dyn FeedCatalog,
    category: Option<&str>,
    min_price: Option<f64>,
    max_price: Option<f64>,
) -> feedmix_engine::Result<Vec<FeedItem>> {
    let mut feeds = match category {
        Some(c) => catalog.feeds_by_category(c)?,
        None => catalog.fetch_feed_catalog()?,
    };
    if min_price.is_some() || max_price.is_some() {
        let in_range = catalog.feeds_by_price_range(min_price.unwrap_or(0.0), max_price.unwrap_or(f64::INFINITY))?;
        feeds.retain(|f| in_range.iter().any(|g| g.id == f.id));
    }
    Ok(feeds)
}

fn describe(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "bundled sample".to_string(),
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedmix=warn")))
        .with_writer(std::io::stderr)
        .init();

    let feeds_path = cli.feeds.as_deref();
    let cattle_types_path = cli.cattle_types.as_deref();

    match cli.command {
        Commands::Solve {
            cattle_type,
            weight,
            only,
            format,
            save,
            name,
            analysis,
        } => {
            let source = match load_source(feeds_path, cattle_types_path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error loading data: {}", e);
                    std::process::exit(1);
                }
            };

            let mut feeds = source.feeds().to_vec();
            if !only.is_empty() {
                if let Some(unknown) = only.iter().find(|id| !feeds.iter().any(|f| &f.id == *id)) {
                    eprintln!("Unknown feed: {}", unknown);
                    std::process::exit(1);
                }
                feeds.retain(|f| only.contains(&f.id));
            }

            let bounds = match source.fetch_nutrient_bounds(&cattle_type, weight) {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let cattle_name = source
                .cattle_types()
                .iter()
                .find(|c| c.id == cattle_type)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| cattle_type.clone());

            let solver = Solver::new()
                .with_tolerance(cli.tolerance)
                .with_max_iterations(cli.max_iterations);
            let engine = MixEngine::new().with_solver(solver);

            let mix = match engine.compute_optimal_mix(&bounds, &feeds) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            match format {
                Format::Json => match serde_json::to_string_pretty(&mix) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error encoding result: {}", e);
                        std::process::exit(1);
                    }
                },
                Format::Pretty => {
                    println!("Cattle type: {} ({})", cattle_name, cattle_type);
                    println!("Body weight: {} kg", weight);
                    println!("Daily intake: {:.2} kg", mix.total_intake);
                    println!();
                    print_mix(&mix, &feeds, &bounds, analysis);
                }
            }

            if let Some(path) = save {
                let label = name.unwrap_or_else(|| format!("{} ration", cattle_name));
                let Some(combination) = FeedCombination::from_solution(label, &cattle_type, &cattle_name, &mix)
                else {
                    eprintln!("Not saving {}: the mix is infeasible", path.display());
                    std::process::exit(1);
                };
                let written = serde_json::to_string_pretty(&combination)
                    .map_err(|e| e.to_string())
                    .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
                if let Err(e) = written {
                    eprintln!("Error saving {}: {}", path.display(), e);
                    std::process::exit(1);
                }
                if format == Format::Pretty {
                    println!();
                    println!("Saved combination to {}", path.display());
                }
            }

            if !mix.feasible {
                std::process::exit(1);
            }
        }
        Commands::List {
            category,
            min_price,
            max_price,
        } => {
            let source = match load_source(feeds_path, cattle_types_path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error loading data: {}", e);
                    std::process::exit(1);
                }
            };

            let feeds = match select_feeds(&source, category.as_deref(), min_price, max_price) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            println!("Feeds:");
            for feed in &feeds {
                println!(
                    "  {:6} {:20} {:12} {:8.2}/{}  protein {:5.1}%  energy {:4.2} Mcal/kg  fiber {:5.1}%",
                    feed.id,
                    feed.display_name(),
                    feed.category.as_deref().unwrap_or("-"),
                    feed.unit_cost,
                    feed.unit,
                    feed.protein,
                    feed.energy,
                    feed.fiber
                );
            }

            if category.is_none() && min_price.is_none() && max_price.is_none() {
                println!();
                println!("Cattle types:");
                for cattle in source.cattle_types() {
                    print_cattle_type(cattle);
                }
            }
        }
        Commands::Check => {
            let mut failed = false;

            match feeds_path.map(load_feed_catalog).unwrap_or_else(sample::feeds) {
                Ok(feeds) => {
                    println!("✓ {} is valid", describe(feeds_path));
                    println!("  {} feeds", feeds.len());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", describe(feeds_path));
                    eprintln!("  {}", e);
                    failed = true;
                }
            }

            match cattle_types_path.map(load_cattle_types).unwrap_or_else(sample::cattle_types) {
                Ok(cattle_types) => {
                    println!("✓ {} is valid", describe(cattle_types_path));
                    println!("  {} cattle types", cattle_types.len());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", describe(cattle_types_path));
                    eprintln!("  {}", e);
                    failed = true;
                }
            }

            if failed {
                std::process::exit(1);
            }
        }
    }
}

fn print_mix(mix: &MixSolution, feeds: &[FeedItem], bounds: &NutrientBounds, analysis: bool) {
    let name_of = |id: &str| {
        feeds
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.display_name().to_string())
            .unwrap_or_else(|| id.to_string())
    };

    if mix.feasible {
        println!("Status: OPTIMAL");
        println!("Total cost: {:.2} per day ({:.4} per kg)", mix.total_cost, mix.cost_per_unit);
        println!("Efficiency score: {:.1}", mix.efficiency_score);
    } else {
        println!("Status: INFEASIBLE");
        println!("No feed mix satisfies every bound:");
        for line in mix.explain() {
            println!("  - {}", line);
        }
        println!();
        println!("Least-violating blend (diagnostic only, do not feed):");
    }
    println!();

    println!("Feeds:");
    for allocation in mix.used_allocations() {
        println!(
            "  {:20} {:10.2} ({:5.2}%)",
            name_of(&allocation.feed_id),
            allocation.mass_amount,
            allocation.mass_fraction * 100.0
        );
    }
    println!();

    println!("Nutrients:");
    for nutrient in Nutrient::ALL {
        let range = bounds.range(nutrient);
        println!(
            "  {:10} {:8.2} {:8}  [{:.2} - {:.2}]",
            nutrient.name(),
            mix.achieved_nutrients.get(nutrient),
            nutrient.unit(),
            range.min,
            range.max
        );
    }

    if !mix.feasible {
        return;
    }

    if !mix.binding_constraints.is_empty() {
        println!();
        println!("Binding constraints (pinch points):");
        for name in &mix.binding_constraints {
            println!("  - {}", name);
        }
    }

    if analysis {
        println!();
        println!("Shadow prices (cost per kg of blend):");
        for sp in &mix.shadow_prices {
            if sp.value.abs() > 0.001 {
                println!("  {:20} {:10.4}", sp.constraint, sp.value);
                println!("    {}", sp.interpretation);
            }
        }
    }
}

fn print_cattle_type(cattle: &CattleType) {
    let n = &cattle.optimal_nutrition;
    println!(
        "  {:6} {:12} {:10} weight {:.0}-{:.0} kg  intake {:.0}-{:.0} kg/day",
        cattle.id,
        cattle.name,
        cattle.category,
        cattle.average_weight.min,
        cattle.average_weight.max,
        cattle.daily_feed_need.min,
        cattle.daily_feed_need.max
    );
    println!(
        "         protein {:.1}-{:.1}%  energy {:.2}-{:.2} Mcal/kg  fiber {:.1}-{:.1}%",
        n.protein.min, n.protein.max, n.energy.min, n.energy.max, n.fiber.min, n.fiber.max
    );
}
