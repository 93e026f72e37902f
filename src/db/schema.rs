//! Database schema definitions

use tracing::info;

use super::{SqlValue, Store};
use crate::error::StoreError;

/// Current schema version
pub const SCHEMA_VERSION: i64 = 1;

/// Create tables for a fresh store; a no-op when the schema is current.
pub fn init_schema<S: Store + ?Sized>(store: &mut S) -> Result<(), StoreError> {
    let current_version = get_schema_version(store)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        for statement in TABLES.iter().chain(INDEXES) {
            store.execute(statement, &[])?;
        }
        set_schema_version(store, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        // Nothing to upgrade from yet
        info!("Updating schema version from v{} to v{}", current_version, SCHEMA_VERSION);
        set_schema_version(store, SCHEMA_VERSION)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Current schema version (0 if not initialized)
pub fn get_schema_version<S: Store + ?Sized>(store: &mut S) -> Result<i64, StoreError> {
    store.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        &[],
    )?;

    let result = store.execute("SELECT version FROM schema_version LIMIT 1", &[])?;
    match result.first() {
        Some(row) => row.get_i64("version"),
        None => Ok(0),
    }
}

fn set_schema_version<S: Store + ?Sized>(store: &mut S, version: i64) -> Result<(), StoreError> {
    store.execute("DELETE FROM schema_version", &[])?;
    store.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        &[SqlValue::Integer(version)],
    )?;
    Ok(())
}

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS education_categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_code TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS test_sets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL,
        set_number INTEGER NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (category_id, set_number),
        FOREIGN KEY (category_id) REFERENCES education_categories(id)
    )
    "#,
    // question_text carries the position as its "<n>. " prefix
    r#"
    CREATE TABLE IF NOT EXISTS questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        test_set_id INTEGER NOT NULL,
        question_type TEXT NOT NULL CHECK (question_type IN ('aptitude', 'personality', 'interest')),
        question_text TEXT NOT NULL,
        option_a TEXT NOT NULL,
        option_b TEXT NOT NULL,
        option_c TEXT,
        option_d TEXT,
        correct_option TEXT CHECK (correct_option IS NULL OR correct_option IN ('A', 'B', 'C', 'D')),
        difficulty_level TEXT NOT NULL DEFAULT 'medium',
        skill_category TEXT,
        points INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (test_set_id) REFERENCES test_sets(id)
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_test_sets_category ON test_sets(category_id, set_number)",
    "CREATE INDEX IF NOT EXISTS idx_questions_test_set ON questions(test_set_id)",
    "CREATE INDEX IF NOT EXISTS idx_questions_type ON questions(question_type)",
    "CREATE INDEX IF NOT EXISTS idx_questions_correct ON questions(correct_option)",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;

    #[test]
    fn test_init_schema_creates_tables() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        init_schema(&mut store).unwrap();

        let result = store
            .execute(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN (?1, ?2, ?3) ORDER BY name",
                &["education_categories".into(), "questions".into(), "test_sets".into()],
            )
            .unwrap();
        assert_eq!(result.row_count, 3);
        assert_eq!(get_schema_version(&mut store).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        init_schema(&mut store).unwrap();
        init_schema(&mut store).unwrap();

        let result = store.execute("SELECT COUNT(*) AS n FROM schema_version", &[]).unwrap();
        assert_eq!(result.one("count").unwrap().get_i64("n").unwrap(), 1);
    }

    #[test]
    fn test_correct_option_constraint() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        init_schema(&mut store).unwrap();
        store
            .execute("INSERT INTO education_categories (category_code, display_name) VALUES ('x', 'X')", &[])
            .unwrap();
        store
            .execute("INSERT INTO test_sets (category_id, set_number) VALUES (1, 1)", &[])
            .unwrap();

        let err = store.execute(
            "INSERT INTO questions (test_set_id, question_type, question_text, option_a, option_b, correct_option)
             VALUES (1, 'aptitude', '1. Q', 'a', 'b', 'E')",
            &[],
        );
        assert!(err.is_err());
    }
}
