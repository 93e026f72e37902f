//! pathfinder-seeder: quota-based question provisioning for psychometric test sets
//!
//! Every test set (bucket) is kept at a fixed number of questions, split across
//! aptitude, personality and interest items. Runs are idempotent: a top-up run
//! only adds what is missing, continuing position numbers from the highest one
//! already stored, and a reset run clears its scope before regenerating.
//!
//! ## Modules
//!
//! - `catalog` - immutable template bank, partitioned by item kind
//! - `planner` - splits a bucket's deficit across item kinds
//! - `answers` - spreads correct answers across option slots
//! - `synth` - renders templates into positioned question records
//! - `reconcile` - run driver and summary
//! - `inspect` - read-only statistics and invariant checks
//! - `db` - storage trait and the SQLite implementation
//!
//! ## Example
//!
//! ```no_run
//! use pathfinder_seeder::{Reconciler, RunSettings, SqliteStore, TemplateCatalog};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut store = SqliteStore::open_in_memory()?;
//! pathfinder_seeder::db::schema::init_schema(&mut store)?;
//! let catalog = TemplateCatalog::standard()?;
//!
//! let summary = Reconciler::new(&mut store, &catalog, StdRng::seed_from_u64(1))
//!     .run(&RunSettings::default())?;
//! println!("{}", summary.render());
//! # Ok(())
//! # }
//! ```

pub mod answers;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod inspect;
pub mod planner;
pub mod reconcile;
pub mod synth;

pub use answers::LetterDistribution;
pub use catalog::{AnswerLetter, Difficulty, ItemKind, Template, TemplateCatalog};
pub use config::Config;
pub use db::test_sets::{Bucket, CategorySeed, Scope};
pub use db::{SqlValue, SqliteStore, Store};
pub use error::{CatalogError, ConfigError, StoreError};
pub use planner::{CategoryRatios, Quota, RatioProfile};
pub use reconcile::{
    BucketOutcome, BucketStatus, Reconciler, RunAborted, RunMode, RunPhase, RunSettings, RunSummary,
};
pub use synth::SynthOptions;
