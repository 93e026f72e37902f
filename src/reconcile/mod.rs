//! Reconciliation driver
//!
//! Brings every test set in scope up to its target size. A run walks
//! `Idle -> Enumerating -> (Measuring -> Planning -> Synthesizing -> Persisting
//! -> Reporting) per bucket -> Done`, ending in `Failed` on a storage error
//! other than a timeout.
//!
//! - A catalog miss stops the current bucket only; items already inserted for
//!   it stay in place and the run moves on.
//! - A storage timeout stops the current bucket only, like a catalog miss.
//! - Any other storage error stops the whole run. The error carries the summary
//!   so far, with every bucket that was not reached listed as such.
//! - A bucket whose highest position leaves no room for its deficit in `u32`
//!   fails without inserting anything.
//! - New positions continue from the highest existing position, so a bucket
//!   left short by an interrupted run resumes without collisions.

mod report;

pub use report::{BucketOutcome, BucketStatus, RunMode, RunSummary};

use std::fmt;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::catalog::TemplateCatalog;
use crate::db::questions::{count_questions, delete_in_scope, insert_question, max_position};
use crate::db::test_sets::{load_buckets, Scope};
use crate::db::Store;
use crate::error::{CatalogError, StoreError};
use crate::inspect::check_bucket;
use crate::planner::{plan, CategoryRatios, Quota};
use crate::synth::{synthesize, synthesize_leftover, ItemStream, SynthOptions};

/// Questions per test set
pub const DEFAULT_TARGET_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Enumerating,
    Measuring,
    Planning,
    Synthesizing,
    Persisting,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Enumerating => "enumerating",
            RunPhase::Measuring => "measuring",
            RunPhase::Planning => "planning",
            RunPhase::Synthesizing => "synthesizing",
            RunPhase::Persisting => "persisting",
            RunPhase::Reporting => "reporting",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub mode: RunMode,
    pub scope: Scope,
    pub target_size: u32,
    pub ratios: CategoryRatios,
    pub synth: SynthOptions,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            mode: RunMode::TopUp,
            scope: Scope::All,
            target_size: DEFAULT_TARGET_SIZE,
            ratios: CategoryRatios::default(),
            synth: SynthOptions::default(),
        }
    }
}

/// A run stopped by a storage failure
#[derive(Error, Debug)]
#[error("Run aborted while {phase}: {source}")]
pub struct RunAborted {
    pub phase: RunPhase,
    pub summary: Box<RunSummary>,
    #[source]
    pub source: StoreError,
}

fn transition(current: &mut RunPhase, next: RunPhase) {
    if *current != next {
        debug!(from = %current, to = %next, "Run phase");
        *current = next;
    }
}

/// Drives one run against a store
pub struct Reconciler<'a, S: Store + ?Sized, R: Rng> {
    store: &'a mut S,
    catalog: &'a TemplateCatalog,
    rng: R,
    phase: RunPhase,
}

impl<'a, S: Store + ?Sized, R: Rng> Reconciler<'a, S, R> {
    pub fn new(store: &'a mut S, catalog: &'a TemplateCatalog, rng: R) -> Self {
        Self {
            store,
            catalog,
            rng,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, next: RunPhase) {
        transition(&mut self.phase, next);
    }

    pub fn run(&mut self, settings: &RunSettings) -> Result<RunSummary, RunAborted> {
        let mut summary = RunSummary::new(settings.mode, settings.scope.clone(), settings.target_size);
        info!(
            mode = %settings.mode,
            scope = %settings.scope,
            target = settings.target_size,
            "Starting reconciliation"
        );

        if settings.mode == RunMode::Reset {
            match delete_in_scope(&mut *self.store, &settings.scope) {
                Ok(deleted) => {
                    summary.deleted = deleted as u64;
                    info!(deleted, scope = %settings.scope, "Cleared questions for reset");
                }
                Err(e) => return Err(self.abort(summary, e)),
            }
        }

        self.enter(RunPhase::Enumerating);
        let buckets = match load_buckets(&mut *self.store, &settings.scope) {
            Ok(buckets) => buckets,
            Err(e) => return Err(self.abort(summary, e)),
        };
        if buckets.is_empty() {
            warn!(scope = %settings.scope, "No test sets in scope");
        }

        let mut pending = buckets.into_iter();
        while let Some(bucket) = pending.next() {
            let mut outcome = BucketOutcome::new(bucket, 0);
            match self.reconcile_bucket(&mut outcome, settings, &mut summary) {
                Ok(()) => {}
                Err(e) if !e.aborts_run() => {
                    warn!(
                        test_set = outcome.bucket.id,
                        phase = %self.phase,
                        error = %e,
                        created = outcome.created,
                        "Test set failed"
                    );
                    outcome.status = BucketStatus::Failed { reason: e.to_string() };
                }
                Err(e) => {
                    outcome.status = BucketStatus::Failed { reason: e.to_string() };
                    summary.buckets.push(outcome);
                    summary.buckets.extend(pending.map(BucketOutcome::not_reached));
                    return Err(self.abort(summary, e));
                }
            }
            summary.buckets.push(outcome);
        }

        self.enter(RunPhase::Reporting);
        for outcome in summary.below_target() {
            warn!(
                test_set = outcome.bucket.id,
                category = %outcome.bucket.category_code,
                set_number = outcome.bucket.set_number,
                count = ?outcome.final_count,
                target = settings.target_size,
                "Test set below target"
            );
        }

        self.enter(RunPhase::Done);
        summary.final_phase = RunPhase::Done;
        summary.finished_at = Some(Utc::now());
        info!(
            created = summary.created_total,
            test_sets = summary.buckets.len(),
            failures = summary.failures().len(),
            violations = summary.violations().len(),
            "Reconciliation complete"
        );
        Ok(summary)
    }

    fn reconcile_bucket(
        &mut self,
        outcome: &mut BucketOutcome,
        settings: &RunSettings,
        summary: &mut RunSummary,
    ) -> Result<(), StoreError> {
        let test_set_id = outcome.bucket.id;
        let target = settings.target_size;

        self.enter(RunPhase::Measuring);
        // Reset already cleared the scope
        let (existing, highest) = match settings.mode {
            RunMode::Reset => (0, 0),
            RunMode::TopUp => (
                count_questions(&mut *self.store, test_set_id)?,
                max_position(&mut *self.store, test_set_id)?,
            ),
        };
        outcome.existing = existing;

        self.enter(RunPhase::Planning);
        let quotas = plan(existing, target, &settings.ratios);
        if quotas.is_empty() {
            outcome.status = BucketStatus::AlreadySatisfied;
            info!(test_set = test_set_id, existing, "Test set already satisfied");
        } else if let Some(mut next_position) = first_free_position(highest, &quotas) {
            info!(
                test_set = test_set_id,
                category = %outcome.bucket.category_code,
                set_number = outcome.bucket.set_number,
                existing,
                next_position,
                "Filling test set"
            );
            if let Err(miss) = self.fill(outcome, &quotas, &mut next_position, settings, summary)? {
                warn!(test_set = test_set_id, error = %miss, created = outcome.created, "Test set failed");
                outcome.status = BucketStatus::Failed { reason: miss.to_string() };
            }
        } else {
            let reason = format!("position {} leaves no room for {} more questions", highest, target.saturating_sub(existing));
            warn!(test_set = test_set_id, highest, "Test set failed: {}", reason);
            outcome.status = BucketStatus::Failed { reason };
        }

        self.enter(RunPhase::Reporting);
        let check = check_bucket(&mut *self.store, test_set_id)?;
        outcome.final_count = Some(check.count);
        if let Some(violation) = check.violation(target) {
            error!(
                test_set = test_set_id,
                category = %outcome.bucket.category_code,
                set_number = outcome.bucket.set_number,
                violation = %violation,
                "Invariant violation"
            );
            outcome.violation = Some(violation);
        }
        Ok(())
    }

    /// Synthesize and insert planned items, then fill any leftover slots.
    ///
    /// The outer error is a storage failure; the inner one is a catalog miss
    /// that stops this bucket only.
    fn fill(
        &mut self,
        outcome: &mut BucketOutcome,
        quotas: &[Quota],
        next_position: &mut u32,
        settings: &RunSettings,
        summary: &mut RunSummary,
    ) -> Result<Result<(), CatalogError>, StoreError> {
        let deficit: u32 = quotas.iter().map(|q| q.count).sum();

        for quota in quotas.iter().filter(|q| q.count > 0) {
            self.enter(RunPhase::Synthesizing);
            debug!(test_set = outcome.bucket.id, kind = %quota.kind, count = quota.count, "Synthesizing quota");
            let stream = match synthesize(
                self.catalog,
                &outcome.bucket,
                quota.kind,
                *next_position,
                quota.count,
                settings.synth,
                &mut self.rng,
            ) {
                Ok(stream) => stream,
                Err(miss) => return Ok(Err(miss)),
            };
            persist(&mut *self.store, &mut self.phase, stream, outcome, next_position, summary)?;
        }

        let leftover = deficit.saturating_sub(outcome.created);
        if leftover > 0 {
            self.enter(RunPhase::Synthesizing);
            debug!(test_set = outcome.bucket.id, leftover, "Filling leftover slots");
            let stream = match synthesize_leftover(
                self.catalog,
                &outcome.bucket,
                *next_position,
                leftover,
                settings.synth,
                &mut self.rng,
            ) {
                Ok(stream) => stream,
                Err(miss) => return Ok(Err(miss)),
            };
            persist(&mut *self.store, &mut self.phase, stream, outcome, next_position, summary)?;
        }

        Ok(Ok(()))
    }

    fn abort(&mut self, mut summary: RunSummary, source: StoreError) -> RunAborted {
        let phase = self.phase;
        self.enter(RunPhase::Failed);
        summary.final_phase = RunPhase::Failed;
        summary.finished_at = Some(Utc::now());
        error!(
            phase = %phase,
            error = %source,
            created = summary.created_total,
            "Reconciliation aborted"
        );
        RunAborted {
            phase,
            summary: Box::new(summary),
            source,
        }
    }
}

/// First position for new items, or `None` when the planned items would run
/// past `u32::MAX`
fn first_free_position(highest: u32, quotas: &[Quota]) -> Option<u32> {
    let deficit: u32 = quotas.iter().map(|q| q.count).sum();
    let first = highest.checked_add(1)?;
    first.checked_add(deficit.saturating_sub(1))?;
    Some(first)
}

/// Insert a stream of items one at a time, in position order
fn persist<S: Store + ?Sized, R: Rng + ?Sized>(
    store: &mut S,
    phase: &mut RunPhase,
    stream: ItemStream<'_, R>,
    outcome: &mut BucketOutcome,
    next_position: &mut u32,
    summary: &mut RunSummary,
) -> Result<(), StoreError> {
    for item in stream {
        transition(phase, RunPhase::Persisting);
        let id = insert_question(store, &item)?;
        debug!(test_set = item.test_set_id, position = item.position, id, kind = %item.kind, "Inserted question");

        outcome.created += 1;
        summary.record_created(item.kind, item.correct_option);
        *next_position = item.position.saturating_add(1);
    }
    Ok(())
}
