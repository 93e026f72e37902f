//! Test sets (buckets) and their education categories

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Row, SqlValue, Store};
use crate::error::StoreError;

/// A test set joined with its category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub id: i64,
    pub set_number: i64,
    pub category_code: String,
    pub display_name: String,
}

impl Bucket {
    fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.get_i64("id")?,
            set_number: row.get_i64("set_number")?,
            category_code: row.get_str("category_code")?.to_string(),
            display_name: row.get_str("display_name")?.to_string(),
        })
    }
}

/// Which buckets a run touches
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Scope {
    #[default]
    All,
    /// Every test set of one category, by category code
    Category(String),
    /// One test set, by id
    TestSet(i64),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::All => f.write_str("all test sets"),
            Scope::Category(code) => write!(f, "category {}", code),
            Scope::TestSet(id) => write!(f, "test set {}", id),
        }
    }
}

const BUCKETS_SQL: &str = r#"
    SELECT ts.id, ts.set_number, ec.category_code, ec.display_name
    FROM test_sets ts
    JOIN education_categories ec ON ts.category_id = ec.id
"#;

/// Load buckets in scope, ordered by category then set number
pub fn load_buckets<S: Store + ?Sized>(store: &mut S, scope: &Scope) -> Result<Vec<Bucket>, StoreError> {
    let (filter, params): (&str, Vec<SqlValue>) = match scope {
        Scope::All => ("", vec![]),
        Scope::Category(code) => ("WHERE ec.category_code = ?1", vec![SqlValue::text(code.as_str())]),
        Scope::TestSet(id) => ("WHERE ts.id = ?1", vec![SqlValue::Integer(*id)]),
    };
    let sql = format!("{} {} ORDER BY ec.id, ts.set_number", BUCKETS_SQL, filter);

    let result = store.execute(&sql, &params)?;
    let buckets = result
        .rows
        .iter()
        .map(Bucket::from_row)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(count = buckets.len(), scope = %scope, "Loaded test sets");
    Ok(buckets)
}

/// Category definition for seeding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySeed {
    pub code: String,
    pub display_name: String,
    /// Number of test sets in this category
    #[serde(default = "default_sets")]
    pub sets: u32,
}

fn default_sets() -> u32 {
    4
}

impl CategorySeed {
    pub fn new(code: &str, display_name: &str, sets: u32) -> Self {
        Self {
            code: code.to_string(),
            display_name: display_name.to_string(),
            sets,
        }
    }
}

/// Outcome of seeding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub categories_created: u64,
    pub test_sets_created: u64,
}

/// Insert categories and their test sets; rows that already exist are left alone.
pub fn seed_categories<S: Store + ?Sized>(store: &mut S, seeds: &[CategorySeed]) -> Result<SeedResult, StoreError> {
    let mut result = SeedResult::default();

    for seed in seeds {
        let inserted = store.execute(
            "INSERT OR IGNORE INTO education_categories (category_code, display_name) VALUES (?1, ?2)",
            &[SqlValue::text(seed.code.as_str()), SqlValue::text(seed.display_name.as_str())],
        )?;
        result.categories_created += inserted.row_count as u64;

        let category_id = store
            .execute(
                "SELECT id FROM education_categories WHERE category_code = ?1",
                &[SqlValue::text(seed.code.as_str())],
            )?
            .one("category lookup")?
            .get_i64("id")?;

        for set_number in 1..=seed.sets as i64 {
            let inserted = store.execute(
                "INSERT OR IGNORE INTO test_sets (category_id, set_number) VALUES (?1, ?2)",
                &[SqlValue::Integer(category_id), SqlValue::Integer(set_number)],
            )?;
            result.test_sets_created += inserted.row_count as u64;
        }
    }

    info!(
        categories = result.categories_created,
        test_sets = result.test_sets_created,
        "Seeded education categories"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{schema, SqliteStore};

    fn seeded() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        schema::init_schema(&mut store).unwrap();
        seed_categories(
            &mut store,
            &[
                CategorySeed::new("tenth_grade", "Class 10", 2),
                CategorySeed::new("undergraduate", "Undergraduate", 3),
            ],
        )
        .unwrap();
        store
    }

    #[test]
    fn test_load_all_in_order() {
        let mut store = seeded();
        let buckets = load_buckets(&mut store, &Scope::All).unwrap();
        let keys: Vec<_> = buckets
            .iter()
            .map(|b| (b.category_code.as_str(), b.set_number))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("tenth_grade", 1),
                ("tenth_grade", 2),
                ("undergraduate", 1),
                ("undergraduate", 2),
                ("undergraduate", 3),
            ]
        );
        assert_eq!(buckets[0].display_name, "Class 10");
    }

    #[test]
    fn test_load_by_category_and_id() {
        let mut store = seeded();
        let ug = load_buckets(&mut store, &Scope::Category("undergraduate".into())).unwrap();
        assert_eq!(ug.len(), 3);

        let one = load_buckets(&mut store, &Scope::TestSet(ug[1].id)).unwrap();
        assert_eq!(one, vec![ug[1].clone()]);

        assert!(load_buckets(&mut store, &Scope::Category("nope".into())).unwrap().is_empty());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let mut store = seeded();
        let again = seed_categories(&mut store, &[CategorySeed::new("tenth_grade", "Class 10", 3)]).unwrap();
        assert_eq!(
            again,
            SeedResult {
                categories_created: 0,
                test_sets_created: 1
            }
        );
        assert_eq!(load_buckets(&mut store, &Scope::All).unwrap().len(), 6);
    }
}
