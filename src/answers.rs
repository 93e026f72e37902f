//! Answer-bias correction
//!
//! Catalog templates tend to keep their correct answer in the same slot, so
//! reusing them as-is skews the answer key. For every scored item a target
//! letter is drawn uniformly from the slots the template actually has, and the
//! correct option text is swapped into that slot.

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;
use tracing::warn;

use crate::catalog::{AnswerLetter, Template};

/// Draw a target letter uniformly among the first `option_count` slots
pub fn draw_target<R: Rng + ?Sized>(rng: &mut R, option_count: usize) -> AnswerLetter {
    let slots = option_count.clamp(1, AnswerLetter::ALL.len());
    AnswerLetter::ALL[rng.gen_range(0..slots)]
}

/// Move the template's correct option into `target`'s slot.
///
/// The option at the original correct index and the option at the target
/// index trade places, so no option text is lost. Templates without a
/// correct option pass through unchanged.
pub fn assign_correct_option(template: &Template, target: AnswerLetter) -> Template {
    let Some(original) = template.correct else {
        return template.clone();
    };

    if target.index() >= template.options.len() {
        warn!(
            prompt = %template.prompt,
            target = %target,
            options = template.options.len(),
            "Target letter has no option slot, keeping original answer"
        );
        return template.clone();
    }

    let mut adjusted = template.clone();
    adjusted.options.swap(original.index(), target.index());
    adjusted.correct = Some(target);
    adjusted
}

/// Realized count of correct letters across scored items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LetterDistribution {
    counts: BTreeMap<AnswerLetter, u64>,
}

impl LetterDistribution {
    pub fn record(&mut self, letter: AnswerLetter) {
        *self.counts.entry(letter).or_insert(0) += 1;
    }

    pub fn add(&mut self, letter: AnswerLetter, count: u64) {
        if count > 0 {
            *self.counts.entry(letter).or_insert(0) += count;
        }
    }

    pub fn count(&self, letter: AnswerLetter) -> u64 {
        self.counts.get(&letter).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn distinct_letters(&self) -> usize {
        self.counts.values().filter(|c| **c > 0).count()
    }

    /// Every scored item shares a single letter.
    ///
    /// Fewer than two items can't collapse.
    pub fn is_collapsed(&self) -> bool {
        self.total() >= 2 && self.distinct_letters() < 2
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnswerLetter, u64)> + '_ {
        AnswerLetter::ALL.iter().map(move |l| (*l, self.count(*l)))
    }
}
