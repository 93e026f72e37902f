//! End-to-end reconciliation tests against SQLite stores

use pathfinder_seeder::db::questions::{count_questions, insert_question, positions, render_prompt, NewQuestion};
use pathfinder_seeder::db::schema;
use pathfinder_seeder::db::test_sets::{load_buckets, seed_categories};
use pathfinder_seeder::inspect::{check_bucket, inspect, verify};
use pathfinder_seeder::{
    AnswerLetter, Bucket, BucketStatus, CategorySeed, Difficulty, ItemKind, RunMode, RunSettings, Reconciler,
    Scope, SqlValue, SqliteStore, Store, Template, TemplateCatalog,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn seeded_store() -> SqliteStore {
    let mut store = SqliteStore::open_in_memory().expect("in-memory store");
    schema::init_schema(&mut store).unwrap();
    seed_categories(
        &mut store,
        &[
            CategorySeed::new("tenth_pass", "Class 10", 2),
            CategorySeed::new("postgraduate", "Postgraduate", 2),
        ],
    )
    .unwrap();
    store
}

fn buckets(store: &mut SqliteStore) -> Vec<Bucket> {
    load_buckets(store, &Scope::All).unwrap()
}

fn run(store: &mut SqliteStore, settings: &RunSettings, seed: u64) -> pathfinder_seeder::RunSummary {
    let catalog = TemplateCatalog::standard().unwrap();
    Reconciler::new(store, &catalog, StdRng::seed_from_u64(seed))
        .run(settings)
        .expect("run completes")
}

fn old_question(test_set_id: i64, position: u32) -> NewQuestion {
    NewQuestion {
        test_set_id,
        kind: ItemKind::Personality,
        position,
        question_text: render_prompt(position, "Pre-existing question"),
        options: vec!["Agree".into(), "Disagree".into()],
        correct_option: None,
        difficulty: Difficulty::Easy,
        skill: "legacy".into(),
        points: 1,
    }
}

#[test]
fn test_full_run_reaches_contiguous_target() {
    let mut store = seeded_store();
    let summary = run(&mut store, &RunSettings::default(), 1);

    assert_eq!(summary.created_total, 200);
    let expected: Vec<u32> = (1..=50).collect();
    for bucket in buckets(&mut store) {
        assert_eq!(count_questions(&mut store, bucket.id).unwrap(), 50);
        assert_eq!(positions(&mut store, bucket.id).unwrap(), expected);
    }
    assert!(verify(&mut store, &Scope::All, 50).unwrap().is_empty());
}

#[test]
fn test_top_up_is_idempotent() {
    let mut store = seeded_store();
    run(&mut store, &RunSettings::default(), 1);
    let before = store
        .execute("SELECT id, question_text, correct_option FROM questions ORDER BY id", &[])
        .unwrap();

    let second = run(&mut store, &RunSettings::default(), 2);
    assert_eq!(second.created_total, 0);
    assert!(second
        .buckets
        .iter()
        .all(|b| b.status == BucketStatus::AlreadySatisfied && b.final_count == Some(50)));

    let after = store
        .execute("SELECT id, question_text, correct_option FROM questions ORDER BY id", &[])
        .unwrap();
    assert_eq!(before.row_count, after.row_count);
    for (a, b) in before.rows.iter().zip(&after.rows) {
        assert_eq!(a.get_i64("id").unwrap(), b.get_i64("id").unwrap());
        assert_eq!(a.get_str("question_text").unwrap(), b.get_str("question_text").unwrap());
    }
}

#[test]
fn test_partial_bucket_topped_up_from_twelve() {
    let mut store = seeded_store();
    let target = buckets(&mut store)[0].clone();
    let mut old_ids = Vec::new();
    for position in 1..=12 {
        old_ids.push(insert_question(&mut store, &old_question(target.id, position)).unwrap());
    }

    let settings = RunSettings {
        scope: Scope::TestSet(target.id),
        ..RunSettings::default()
    };
    let summary = run(&mut store, &settings, 5);

    assert_eq!(summary.buckets.len(), 1);
    let outcome = &summary.buckets[0];
    assert_eq!(outcome.existing, 12);
    assert_eq!(outcome.created, 38);
    assert_eq!(summary.created_by_kind.get(&ItemKind::Aptitude), Some(&13));
    assert_eq!(summary.created_by_kind.get(&ItemKind::Personality), Some(&13));
    assert_eq!(summary.created_by_kind.get(&ItemKind::Interest), Some(&12));

    assert_eq!(positions(&mut store, target.id).unwrap(), (1..=50).collect::<Vec<u32>>());

    // The first twelve rows are untouched
    for (position, id) in (1u32..).zip(&old_ids) {
        let row = store
            .execute("SELECT question_text FROM questions WHERE id = ?1", &[SqlValue::Integer(*id)])
            .unwrap();
        assert_eq!(
            row.one("old question").unwrap().get_str("question_text").unwrap(),
            render_prompt(position, "Pre-existing question")
        );
    }
}

#[test]
fn test_reset_clears_scope_only() {
    let mut store = seeded_store();
    let all = buckets(&mut store);
    for bucket in &all {
        for position in 1..=5 {
            insert_question(&mut store, &old_question(bucket.id, position)).unwrap();
        }
    }

    let settings = RunSettings {
        mode: RunMode::Reset,
        scope: Scope::Category("postgraduate".into()),
        ..RunSettings::default()
    };
    let summary = run(&mut store, &settings, 9);
    assert_eq!(summary.deleted, 10);
    assert_eq!(summary.buckets.len(), 2);

    for bucket in &all {
        let legacy = store
            .execute(
                "SELECT COUNT(*) AS n FROM questions WHERE test_set_id = ?1 AND skill_category = 'legacy'",
                &[SqlValue::Integer(bucket.id)],
            )
            .unwrap()
            .one("count")
            .unwrap()
            .get_i64("n")
            .unwrap();

        if bucket.category_code == "postgraduate" {
            assert_eq!(legacy, 0);
            assert_eq!(positions(&mut store, bucket.id).unwrap(), (1..=50).collect::<Vec<u32>>());
        } else {
            assert_eq!(legacy, 5);
            assert_eq!(count_questions(&mut store, bucket.id).unwrap(), 5);
        }
    }
}

#[test]
fn test_answer_letters_do_not_collapse() {
    let mut store = seeded_store();
    let settings = RunSettings {
        scope: Scope::TestSet(buckets(&mut store)[0].id),
        ratios: pathfinder_seeder::RatioProfile::AptitudeWeighted.into(),
        ..RunSettings::default()
    };
    let summary = run(&mut store, &settings, 11);

    assert!(summary.letters.total() >= 30);
    assert!(summary.letters.distinct_letters() >= 2);
    assert!(!summary.letters.is_collapsed());

    // Only aptitude questions carry a correct option
    let unscored_with_answer = store
        .execute(
            "SELECT COUNT(*) AS n FROM questions WHERE question_type <> 'aptitude' AND correct_option IS NOT NULL",
            &[],
        )
        .unwrap()
        .one("count")
        .unwrap()
        .get_i64("n")
        .unwrap();
    assert_eq!(unscored_with_answer, 0);
}

#[test]
fn test_letters_spread_over_forty_scored_items() {
    let mut store = seeded_store();
    let summary = run(&mut store, &RunSettings::default(), 4);
    // 4 test sets x 17 aptitude questions
    assert_eq!(summary.letters.total(), 68);
    assert!(summary.letters.distinct_letters() >= 2);

    let stored = inspect(&mut store, &Scope::All, 50).unwrap();
    assert_eq!(stored.letters, summary.letters);
}

#[test]
fn test_catalog_miss_fails_bucket_and_run_continues() {
    let mut store = seeded_store();
    let catalog = TemplateCatalog::builder()
        .template(
            ItemKind::Aptitude,
            Template::scored("2 + 2 = ?", &["3", "4", "5"], AnswerLetter::B, "quantitative", Difficulty::Easy),
        )
        .template(ItemKind::Personality, Template::unscored("I enjoy puzzles", &["Yes", "No"], "curiosity"))
        .build()
        .unwrap();

    let summary = Reconciler::new(&mut store, &catalog, StdRng::seed_from_u64(1))
        .run(&RunSettings::default())
        .expect("catalog misses do not abort the run");

    assert_eq!(summary.buckets.len(), 4);
    for outcome in &summary.buckets {
        match &outcome.status {
            BucketStatus::Failed { reason } => assert!(reason.contains("interest")),
            other => panic!("expected failure, got {:?}", other),
        }
        // Aptitude and personality items persisted before the miss stay
        assert_eq!(outcome.created, 34);
        assert_eq!(outcome.final_count, Some(34));
    }
    assert_eq!(summary.below_target().len(), 4);
    assert_eq!(summary.failures().len(), 4);

    // A later top-up with the full catalog finishes the job
    let second = run(&mut store, &RunSettings::default(), 2);
    assert!(second.buckets.iter().all(|b| b.created == 16 && b.final_count == Some(50)));
}

#[test]
fn test_buckets_reported_in_category_then_set_order() {
    let mut store = seeded_store();
    let summary = run(&mut store, &RunSettings::default(), 1);

    let order: Vec<(&str, i64)> = summary
        .buckets
        .iter()
        .map(|b| (b.bucket.category_code.as_str(), b.bucket.set_number))
        .collect();
    assert_eq!(
        order,
        vec![("tenth_pass", 1), ("tenth_pass", 2), ("postgraduate", 1), ("postgraduate", 2)]
    );
}

#[test]
fn test_overfull_bucket_is_flagged_not_corrected() {
    let mut store = seeded_store();
    let bucket = buckets(&mut store)[0].clone();
    for position in 1..=5 {
        insert_question(&mut store, &old_question(bucket.id, position)).unwrap();
    }
    insert_question(&mut store, &old_question(bucket.id, 3)).unwrap();

    let settings = RunSettings {
        scope: Scope::TestSet(bucket.id),
        target_size: 5,
        ..RunSettings::default()
    };
    let summary = run(&mut store, &settings, 1);

    let outcome = &summary.buckets[0];
    assert_eq!(outcome.status, BucketStatus::AlreadySatisfied);
    let violation = outcome.violation.as_deref().expect("violation recorded");
    assert!(violation.contains("6 questions exceed target 5"));
    assert!(violation.contains("duplicate positions 3"));
    assert!(summary.has_violations());

    // Nothing was deleted
    assert_eq!(check_bucket(&mut store, bucket.id).unwrap().count, 6);
}

#[test]
fn test_match_difficulty_uses_category_profile() {
    let mut store = seeded_store();
    let settings = RunSettings {
        scope: Scope::Category("postgraduate".into()),
        synth: pathfinder_seeder::SynthOptions { match_difficulty: true },
        ..RunSettings::default()
    };
    run(&mut store, &settings, 3);

    let levels = store
        .execute(
            "SELECT DISTINCT difficulty_level FROM questions WHERE question_type = 'aptitude'",
            &[],
        )
        .unwrap();
    assert_eq!(levels.row_count, 1);
    assert_eq!(levels.rows[0].get_str("difficulty_level").unwrap(), "hard");
}

#[test]
fn test_same_seed_same_questions() {
    let texts = |seed| {
        let mut store = seeded_store();
        run(&mut store, &RunSettings::default(), seed);
        let result = store
            .execute("SELECT question_text, option_a, correct_option FROM questions ORDER BY id", &[])
            .unwrap();
        result
            .rows
            .iter()
            .map(|r| {
                format!(
                    "{}|{}|{:?}",
                    r.get_str("question_text").unwrap(),
                    r.get_str("option_a").unwrap(),
                    r.get_opt_str("correct_option").unwrap()
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(texts(21), texts(21));
}

#[test]
fn test_file_backed_store_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pathfinder.db");
    let timeout = std::time::Duration::from_millis(500);

    {
        let mut store = SqliteStore::open(&path, timeout).unwrap();
        schema::init_schema(&mut store).unwrap();
        seed_categories(&mut store, &[CategorySeed::new("undergraduate", "Undergraduate", 1)]).unwrap();
        let settings = RunSettings {
            target_size: 20,
            ..RunSettings::default()
        };
        assert_eq!(run(&mut store, &settings, 1).created_total, 20);
        store.close().unwrap();
    }

    let mut store = SqliteStore::open(&path, timeout).unwrap();
    let settings = RunSettings {
        target_size: 30,
        ..RunSettings::default()
    };
    let summary = run(&mut store, &settings, 2);
    assert_eq!(summary.buckets[0].existing, 20);
    assert_eq!(summary.created_total, 10);

    let id = summary.buckets[0].bucket.id;
    assert_eq!(positions(&mut store, id).unwrap(), (1..=30).collect::<Vec<u32>>());
}
