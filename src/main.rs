//! pathfinder-seeder command line
//!
//! ## Usage
//!
//! ```bash
//! # Create tables, categories and test sets
//! pathfinder-seeder setup
//!
//! # Top up every test set to 50 questions
//! pathfinder-seeder reconcile
//!
//! # Regenerate one category from scratch, reproducibly
//! pathfinder-seeder reconcile --reset --category postgraduate --seed 42
//!
//! # Fill levels and answer distribution
//! pathfinder-seeder inspect
//!
//! # Check for over-full test sets and duplicate positions
//! pathfinder-seeder verify
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change verbosity.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pathfinder_seeder::db::schema;
use pathfinder_seeder::db::test_sets::seed_categories;
use pathfinder_seeder::inspect::{inspect, verify};
use pathfinder_seeder::{
    Config, RatioProfile, Reconciler, RunMode, Scope, SqliteStore, Store, TemplateCatalog,
};

#[derive(Parser, Debug)]
#[command(name = "pathfinder-seeder")]
#[command(about = "Provision and reconcile question banks for psychometric test sets")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "pathfinder.toml")]
    config: PathBuf,

    /// SQLite database file (overrides config file)
    #[arg(long, env = "PATHFINDER_DB")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema and seed categories and test sets
    Setup,

    /// Bring test sets up to their target size
    Reconcile(ReconcileArgs),

    /// Show question counts and answer distribution
    Inspect(ReportArgs),

    /// Check every test set for invariant violations
    Verify(ReportArgs),

    /// Check that the database can be opened and queried
    Ping,
}

#[derive(Args, Debug)]
struct ScopeArgs {
    /// Only test sets of this category code
    #[arg(long, conflicts_with = "test_set")]
    category: Option<String>,

    /// Only this test set id
    #[arg(long)]
    test_set: Option<i64>,
}

impl ScopeArgs {
    fn scope(&self) -> Scope {
        match (&self.category, self.test_set) {
            (Some(code), _) => Scope::Category(code.clone()),
            (None, Some(id)) => Scope::TestSet(id),
            (None, None) => Scope::All,
        }
    }
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// Delete all questions in scope before regenerating
    #[arg(long)]
    reset: bool,

    /// Questions per test set (overrides config file)
    #[arg(long)]
    target: Option<u32>,

    /// Ratio profile: equal or aptitude_weighted
    #[arg(long)]
    ratio: Option<RatioProfile>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Narrow aptitude templates to each category's difficulty
    #[arg(long)]
    match_difficulty: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// Questions per test set (overrides config file)
    #[arg(long)]
    target: Option<u32>,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("pathfinder_seeder=info".parse()?))
        .init();

    let cli = Cli::parse();

    if cli.config.exists() {
        info!("Config file: {}", cli.config.display());
    } else {
        info!("Config file not found, using defaults");
    }
    let mut config = Config::load_or_default(Some(cli.config.as_path()))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }

    let ok = match cli.command {
        Command::Setup => setup(&config)?,
        Command::Reconcile(args) => reconcile(config, args)?,
        Command::Inspect(args) => inspect_cmd(&config, args)?,
        Command::Verify(args) => verify_cmd(&config, args)?,
        Command::Ping => ping(&config)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(&config.database.path, config.busy_timeout())
        .with_context(|| format!("opening {}", config.database.path.display()))
}

fn print_output<T: Serialize>(value: &T, json: bool, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

fn setup(config: &Config) -> anyhow::Result<bool> {
    let mut store = open_store(config)?;
    schema::init_schema(&mut store)?;
    let seeded = seed_categories(&mut store, &config.categories)?;
    store.close()?;

    println!(
        "Created {} categories and {} test sets",
        seeded.categories_created, seeded.test_sets_created
    );
    Ok(true)
}

fn reconcile(mut config: Config, args: ReconcileArgs) -> anyhow::Result<bool> {
    if args.reset {
        config.reconcile.mode = RunMode::Reset;
    }
    if let Some(target) = args.target {
        config.reconcile.target_size = target;
    }
    if let Some(ratio) = args.ratio {
        config.reconcile.ratio = ratio;
    }
    if args.seed.is_some() {
        config.reconcile.seed = args.seed;
    }
    if args.match_difficulty {
        config.reconcile.match_difficulty = true;
    }
    config.validate()?;

    let settings = config.run_settings(args.scope.scope());
    let catalog = TemplateCatalog::standard()?;
    let rng = match config.reconcile.seed {
        Some(seed) => {
            info!(seed, "Using seeded random source");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let mut store = open_store(&config)?;
    schema::init_schema(&mut store)?;

    let result = Reconciler::new(&mut store, &catalog, rng).run(&settings);
    store.close()?;

    match result {
        Ok(summary) => {
            print_output(&summary, args.json, || summary.render())?;
            if summary.has_violations() {
                error!(count = summary.violations().len(), "Invariant violations detected");
                return Ok(false);
            }
            Ok(true)
        }
        Err(aborted) => {
            print_output(&aborted.summary, args.json, || aborted.summary.render())?;
            error!("{}", aborted);
            Ok(false)
        }
    }
}

fn inspect_cmd(config: &Config, args: ReportArgs) -> anyhow::Result<bool> {
    let target = args.target.unwrap_or(config.reconcile.target_size);
    let mut store = open_store(config)?;
    let report = inspect(&mut store, &args.scope.scope(), target)?;
    store.close()?;

    print_output(&report, args.json, || report.render())?;
    Ok(true)
}

fn verify_cmd(config: &Config, args: ReportArgs) -> anyhow::Result<bool> {
    let target = args.target.unwrap_or(config.reconcile.target_size);
    let mut store = open_store(config)?;
    let violations = verify(&mut store, &args.scope.scope(), target)?;
    store.close()?;

    print_output(&violations, args.json, || {
        if violations.is_empty() {
            "No invariant violations\n".to_string()
        } else {
            violations
                .iter()
                .map(|v| format!("{} - Set {} [#{}]: {}\n", v.bucket.display_name, v.bucket.set_number, v.bucket.id, v.detail))
                .collect()
        }
    })?;

    if !violations.is_empty() {
        warn!(count = violations.len(), "Invariant violations found");
    }
    Ok(violations.is_empty())
}

fn ping(config: &Config) -> anyhow::Result<bool> {
    let mut store = open_store(config)?;
    let result = store.execute("SELECT sqlite_version() AS version", &[])?;
    let version = result.one("version query")?.get_str("version")?.to_string();
    let schema_version = schema::get_schema_version(&mut store)?;
    store.close()?;

    println!(
        "Connected to {} (SQLite {}, schema v{})",
        config.database.path.display(),
        version,
        schema_version
    );
    Ok(true)
}
