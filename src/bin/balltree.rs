use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use balltree::io::{DEFAULT_EXPORT_FILE, read_records, write_records};
use balltree::synthetic::{CoordinateKind, generate_points};
use balltree::{BallTree, SearchStrategy};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser, Debug)]
#[command(name = "balltree", version, about = "Build and query ball trees over flat CSV files")]
struct Cli {
    /// How k-NN and radius queries walk the tree
    #[arg(long, value_enum, default_value_t = StrategyArg::Exhaustive, global = true)]
    strategy: StrategyArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Exhaustive,
    Pruned,
}

impl From<StrategyArg> for SearchStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Exhaustive => SearchStrategy::Exhaustive,
            StrategyArg::Pruned => SearchStrategy::Pruned,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write random points with distinct keys to a CSV file.
    Generate {
        #[arg(short, long)]
        dimensions: usize,
        #[arg(short, long)]
        amount: usize,
        /// Draw real coordinates instead of integers
        #[arg(long)]
        real: bool,
        #[arg(long, default_value_t = 0.0)]
        min: f64,
        #[arg(long, default_value_t = 1000.0)]
        max: f64,
        #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
        output: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the tree built from a CSV file as a table.
    Display {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Rebuild a CSV file and write the tree back out in pre-order.
    Export {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
        output: PathBuf,
    },

    /// Look up the value stored under a key, e.g. `--key 1,2,3`.
    Find {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        key: Vec<f64>,
    },

    /// List the values of the k nearest neighbours of a point.
    Nearest {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        point: Vec<f64>,
        #[arg(short, default_value_t = 1)]
        k: usize,
    },

    /// List the values of every point strictly within a radius of a point.
    Radius {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        point: Vec<f64>,
        #[arg(short, long)]
        radius: f64,
    },

    /// Walk through building, querying, displaying and exporting a random tree.
    Demo {
        #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
        output: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn load_tree(input: &Path, strategy: SearchStrategy) -> Result<BallTree<f64>> {
    let tree = BallTree::from_csv_file(input)
        .with_context(|| format!("Failed to build a ball tree from {}", input.display()))?;
    Ok(tree.with_strategy(strategy))
}

fn format_values(values: &[&f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let strategy = SearchStrategy::from(cli.strategy);

    match cli.command {
        Commands::Generate { dimensions, amount, real, min, max, output, seed } => {
            let kind = if real { CoordinateKind::Real } else { CoordinateKind::Integer };
            let mut rng = make_rng(seed);
            let points = generate_points(&mut rng, dimensions, amount, kind, min, max)?;
            let file = std::fs::File::create(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            write_records(std::io::BufWriter::new(file), points.iter().map(|p| (&p.key, &p.value)))?;
            println!("Wrote {} points to {}", points.len(), output.display());
        }
        Commands::Display { input } => {
            let tree = load_tree(&input, strategy)?;
            print!("{}", tree);
        }
        Commands::Export { input, output } => {
            let tree = load_tree(&input, strategy)?;
            tree.export_csv(&output)
                .with_context(|| format!("Failed to export to {}", output.display()))?;
            println!("Exported {} points to {}", tree.size(), output.display());
        }
        Commands::Find { input, key } => {
            let tree = load_tree(&input, strategy)?;
            match tree.find(&key) {
                Some(value) => println!("{}", value),
                None => println!("None"),
            }
        }
        Commands::Nearest { input, point, k } => {
            let tree = load_tree(&input, strategy)?;
            match tree.k_nearest(&point, k) {
                Some(values) => println!("{}", format_values(&values)),
                None => bail!(
                    "Point has {} coordinates but the tree has {} dimensions",
                    point.len(),
                    tree.dimensions()
                ),
            }
        }
        Commands::Radius { input, point, radius } => {
            let tree = load_tree(&input, strategy)?;
            match tree.within_radius(&point, radius) {
                Some(values) => println!("{}", format_values(&values)),
                None => bail!(
                    "Radius must be positive and the point must have {} coordinates",
                    tree.dimensions()
                ),
            }
        }
        Commands::Demo { output, seed } => run_demo(&output, seed, strategy)?,
    }

    Ok(())
}

fn run_demo(output: &Path, seed: Option<u64>, strategy: SearchStrategy) -> Result<()> {
    let mut rng = make_rng(seed);
    let points = generate_points(&mut rng, 6, 100, CoordinateKind::Integer, 1.0, 30.0)?;
    let key = points[0].key.coordinates().to_vec();
    let expected = points[0].value;

    let tree = BallTree::from_points(points)?.with_strategy(strategy);
    info!("Demo tree holds {} points, radius {:.5}", tree.size(), tree.radius());

    let found = tree.find(&key);
    println!("Finding the data for {:?} in the tree: {:?}", key, found);
    println!("It is {} that find() works", found == Some(&expected));

    let k = rng.gen_range(5..=10usize);
    let neighbors = tree.k_nearest(&key, k).context("Demo key has the tree's dimensionality")?;
    println!("\nThe {} nearest neighbors to {:?} are:\n{}", k, key, format_values(&neighbors));

    let radius = rng.gen_range(11..=20u32) as f64;
    let within = tree
        .within_radius(&key, radius)
        .context("Demo radius is positive")?;
    println!(
        "\nThe points that are within a {} distance from {:?} are:\n{}",
        radius,
        key,
        format_values(&within)
    );

    println!("\nTree data (to compare with {}):", output.display());
    print!("{}", tree);
    tree.export_csv(output)?;

    let records = read_records(output)?;
    let reloaded = BallTree::from_points(records)?;
    if reloaded.size() != tree.size() {
        bail!("Re-imported {} points, expected {}", reloaded.size(), tree.size());
    }
    println!("\nRe-imported {} points from {}", reloaded.size(), output.display());
    Ok(())
}
