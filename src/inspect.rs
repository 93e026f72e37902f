//! Read-only inspection of a provisioned store
//!
//! `inspect` reports fill levels and distributions; `verify` re-checks the
//! per-bucket invariants (no more items than target, no duplicate positions)
//! without changing anything.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::answers::LetterDistribution;
use crate::catalog::ItemKind;
use crate::db::questions::{count_by_kind, count_by_test_set, count_questions, letter_distribution, positions};
use crate::db::test_sets::{load_buckets, Bucket, Scope};
use crate::db::Store;
use crate::error::StoreError;

/// Count and duplicate positions of one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketCheck {
    pub count: u32,
    pub duplicates: Vec<u32>,
}

impl BucketCheck {
    /// Describe the invariant violation, if there is one
    pub fn violation(&self, target: u32) -> Option<String> {
        let mut problems = Vec::new();
        if self.count > target {
            problems.push(format!("{} questions exceed target {}", self.count, target));
        }
        if !self.duplicates.is_empty() {
            let list: Vec<String> = self.duplicates.iter().map(u32::to_string).collect();
            problems.push(format!("duplicate positions {}", list.join(", ")));
        }
        if problems.is_empty() {
            None
        } else {
            Some(problems.join("; "))
        }
    }
}

pub fn check_bucket<S: Store + ?Sized>(store: &mut S, test_set_id: i64) -> Result<BucketCheck, StoreError> {
    let count = count_questions(store, test_set_id)?;
    let positions = positions(store, test_set_id)?;

    let mut duplicates: Vec<u32> = positions.windows(2).filter(|w| w[0] == w[1]).map(|w| w[0]).collect();
    duplicates.dedup();

    Ok(BucketCheck { count, duplicates })
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketFill {
    pub bucket: Bucket,
    pub count: u32,
}

/// Snapshot of the store
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub target_size: u32,
    pub total: u64,
    pub by_kind: BTreeMap<ItemKind, u64>,
    pub letters: LetterDistribution,
    pub buckets: Vec<BucketFill>,
}

impl Inspection {
    pub fn below_target(&self) -> impl Iterator<Item = &BucketFill> {
        self.buckets.iter().filter(move |b| b.count < self.target_size)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Total questions: {}", self.total);
        for (kind, count) in &self.by_kind {
            let _ = writeln!(out, "  {}: {}", kind, count);
        }
        if self.letters.total() > 0 {
            let _ = writeln!(out, "Correct answers:");
            for (letter, count) in self.letters.iter() {
                let share = count as f64 * 100.0 / self.letters.total() as f64;
                let _ = writeln!(out, "  {}: {} ({:.1}%)", letter, count, share);
            }
        }
        let _ = writeln!(out, "Test sets:");
        for fill in &self.buckets {
            let marker = if fill.count < self.target_size { "  (below target)" } else { "" };
            let _ = writeln!(
                out,
                "  {} - Set {}: {}/{}{}",
                fill.bucket.display_name, fill.bucket.set_number, fill.count, self.target_size, marker
            );
        }
        out
    }
}

/// Gather counts for the buckets in scope. Kind and letter totals are store-wide.
pub fn inspect<S: Store + ?Sized>(store: &mut S, scope: &Scope, target_size: u32) -> Result<Inspection, StoreError> {
    let by_kind = count_by_kind(store)?;
    let letters = letter_distribution(store)?;
    let counts = count_by_test_set(store)?;

    let buckets = load_buckets(store, scope)?
        .into_iter()
        .map(|bucket| {
            let count = counts.get(&bucket.id).copied().unwrap_or(0);
            BucketFill { bucket, count }
        })
        .collect();

    Ok(Inspection {
        target_size,
        total: by_kind.values().sum(),
        by_kind,
        letters,
        buckets,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub bucket: Bucket,
    pub detail: String,
}

/// Check every bucket in scope
pub fn verify<S: Store + ?Sized>(store: &mut S, scope: &Scope, target_size: u32) -> Result<Vec<Violation>, StoreError> {
    let mut violations = Vec::new();
    for bucket in load_buckets(store, scope)? {
        if let Some(detail) = check_bucket(store, bucket.id)?.violation(target_size) {
            violations.push(Violation { bucket, detail });
        }
    }
    Ok(violations)
}
