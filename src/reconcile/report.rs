//! Run summary - per-bucket outcomes and aggregate counts

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RunPhase;
use crate::answers::LetterDistribution;
use crate::catalog::ItemKind;
use crate::db::test_sets::{Bucket, Scope};

/// Run mode; a run is one or the other, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Add missing items only; never deletes
    #[default]
    TopUp,
    /// Delete every item in scope, then regenerate from position 1
    Reset,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::TopUp => f.write_str("top-up"),
            RunMode::Reset => f.write_str("reset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum BucketStatus {
    /// New items were added
    Filled,
    /// Already at or above target; nothing added
    AlreadySatisfied,
    /// Reconciliation of this bucket stopped early
    Failed { reason: String },
    /// The run aborted before this bucket was reached
    NotReached,
}

/// What happened to one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketOutcome {
    pub bucket: Bucket,
    #[serde(flatten)]
    pub status: BucketStatus,
    /// Item count before the run (0 in reset mode)
    pub existing: u32,
    pub created: u32,
    /// Item count after the run, when it was measured
    pub final_count: Option<u32>,
    /// Set when the post-run check found a count above target or duplicate positions
    pub violation: Option<String>,
}

impl BucketOutcome {
    pub(crate) fn new(bucket: Bucket, existing: u32) -> Self {
        Self {
            bucket,
            status: BucketStatus::Filled,
            existing,
            created: 0,
            final_count: None,
            violation: None,
        }
    }

    pub(crate) fn not_reached(bucket: Bucket) -> Self {
        Self {
            status: BucketStatus::NotReached,
            ..Self::new(bucket, 0)
        }
    }

    pub fn is_below(&self, target: u32) -> bool {
        self.final_count.map(|c| c < target).unwrap_or(true)
    }
}

/// Aggregate result of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub scope: Scope,
    pub target_size: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Items removed by a reset
    pub deleted: u64,
    pub buckets: Vec<BucketOutcome>,
    pub created_total: u64,
    pub created_by_kind: BTreeMap<ItemKind, u64>,
    /// Correct letters among items created by this run
    pub letters: LetterDistribution,
    pub final_phase: RunPhase,
}

impl RunSummary {
    pub(crate) fn new(mode: RunMode, scope: Scope, target_size: u32) -> Self {
        Self {
            mode,
            scope,
            target_size,
            started_at: Utc::now(),
            finished_at: None,
            deleted: 0,
            buckets: Vec::new(),
            created_total: 0,
            created_by_kind: BTreeMap::new(),
            letters: LetterDistribution::default(),
            final_phase: RunPhase::Idle,
        }
    }

    pub(crate) fn record_created(&mut self, kind: ItemKind, letter: Option<crate::catalog::AnswerLetter>) {
        self.created_total += 1;
        *self.created_by_kind.entry(kind).or_insert(0) += 1;
        if let Some(letter) = letter {
            self.letters.record(letter);
        }
    }

    /// Buckets that ended the run below target size
    pub fn below_target(&self) -> Vec<&BucketOutcome> {
        self.buckets.iter().filter(|b| b.is_below(self.target_size)).collect()
    }

    pub fn failures(&self) -> Vec<&BucketOutcome> {
        self.buckets
            .iter()
            .filter(|b| matches!(b.status, BucketStatus::Failed { .. }))
            .collect()
    }

    pub fn violations(&self) -> Vec<&BucketOutcome> {
        self.buckets.iter().filter(|b| b.violation.is_some()).collect()
    }

    pub fn has_violations(&self) -> bool {
        self.buckets.iter().any(|b| b.violation.is_some())
    }

    /// Plain-text report
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Run: {} of {} (target {} per test set)", self.mode, self.scope, self.target_size);
        if self.mode == RunMode::Reset {
            let _ = writeln!(out, "Deleted: {} questions", self.deleted);
        }

        for outcome in &self.buckets {
            let b = &outcome.bucket;
            let detail = match &outcome.status {
                BucketStatus::Filled => format!("created {} (had {})", outcome.created, outcome.existing),
                BucketStatus::AlreadySatisfied => format!("already satisfied ({} questions)", outcome.existing),
                BucketStatus::Failed { reason } => format!("FAILED after {} created: {}", outcome.created, reason),
                BucketStatus::NotReached => "not reached".to_string(),
            };
            let _ = writeln!(out, "  {} - Set {} [#{}]: {}", b.display_name, b.set_number, b.id, detail);
            if let Some(violation) = &outcome.violation {
                let _ = writeln!(out, "    INVARIANT VIOLATION: {}", violation);
            }
        }

        let _ = writeln!(out, "Created: {} questions", self.created_total);
        for (kind, count) in &self.created_by_kind {
            let _ = writeln!(out, "  {}: {}", kind, count);
        }
        if self.letters.total() > 0 {
            let letters: Vec<String> = self.letters.iter().map(|(l, c)| format!("{}={}", l, c)).collect();
            let _ = writeln!(out, "Correct answers: {}", letters.join(" "));
        }

        let below = self.below_target();
        if !below.is_empty() {
            let _ = writeln!(out, "Below target: {} test set(s)", below.len());
            for outcome in below {
                let _ = writeln!(
                    out,
                    "  {} - Set {}: {}",
                    outcome.bucket.display_name,
                    outcome.bucket.set_number,
                    outcome
                        .final_count
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "unknown".to_string())
                );
            }
        }
        out
    }
}
