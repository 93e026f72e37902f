//! Quota planner - splits a bucket's deficit across item kinds
//!
//! Each kind first receives `floor(deficit * weight / total_weight)`. The
//! rounding remainder is smaller than the number of kinds and is handed out
//! one item at a time in priority order, so the split always sums to the
//! deficit exactly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::ItemKind;

/// One planned allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quota {
    pub kind: ItemKind,
    pub count: u32,
}

/// Named ratio profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioProfile {
    /// Equal thirds across aptitude, personality and interest
    #[default]
    Equal,
    /// 60/20/20 favoring aptitude
    AptitudeWeighted,
}

impl FromStr for RatioProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(RatioProfile::Equal),
            "aptitude_weighted" | "aptitude-weighted" => Ok(RatioProfile::AptitudeWeighted),
            other => Err(format!("unknown ratio profile '{}'", other)),
        }
    }
}

impl fmt::Display for RatioProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatioProfile::Equal => f.write_str("equal"),
            RatioProfile::AptitudeWeighted => f.write_str("aptitude_weighted"),
        }
    }
}

/// Integer weights per item kind, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRatios {
    weights: Vec<(ItemKind, u32)>,
}

impl CategoryRatios {
    /// Build from explicit weights. Zero-weight entries are kept so the kind
    /// still appears (with count 0) in the plan.
    pub fn new(weights: Vec<(ItemKind, u32)>) -> Option<Self> {
        let total: u64 = weights.iter().map(|(_, w)| *w as u64).sum();
        if weights.is_empty() || total == 0 {
            return None;
        }
        Some(Self { weights })
    }

    pub fn equal_thirds() -> Self {
        Self {
            weights: vec![
                (ItemKind::Aptitude, 1),
                (ItemKind::Personality, 1),
                (ItemKind::Interest, 1),
            ],
        }
    }

    pub fn aptitude_weighted() -> Self {
        Self {
            weights: vec![
                (ItemKind::Aptitude, 3),
                (ItemKind::Personality, 1),
                (ItemKind::Interest, 1),
            ],
        }
    }

    fn total(&self) -> u64 {
        self.weights.iter().map(|(_, w)| *w as u64).sum()
    }
}

impl Default for CategoryRatios {
    fn default() -> Self {
        Self::equal_thirds()
    }
}

impl From<RatioProfile> for CategoryRatios {
    fn from(profile: RatioProfile) -> Self {
        match profile {
            RatioProfile::Equal => Self::equal_thirds(),
            RatioProfile::AptitudeWeighted => Self::aptitude_weighted(),
        }
    }
}

/// Plan the per-kind counts needed to bring a bucket from `existing` to `target`.
///
/// Returns an empty plan when the bucket is already at or above target.
pub fn plan(existing: u32, target: u32, ratios: &CategoryRatios) -> Vec<Quota> {
    if target <= existing {
        return Vec::new();
    }
    split(target - existing, ratios)
}

/// Split a deficit across kinds
pub fn split(deficit: u32, ratios: &CategoryRatios) -> Vec<Quota> {
    let total = ratios.total();
    let mut quotas: Vec<Quota> = ratios
        .weights
        .iter()
        .map(|(kind, weight)| Quota {
            kind: *kind,
            count: (deficit as u64 * *weight as u64 / total) as u32,
        })
        .collect();

    let allocated: u32 = quotas.iter().map(|q| q.count).sum();
    let mut remainder = deficit - allocated;

    // remainder < number of weighted kinds, so one pass suffices
    for (quota, (_, weight)) in quotas.iter_mut().zip(ratios.weights.iter()) {
        if remainder == 0 {
            break;
        }
        if *weight > 0 {
            quota.count += 1;
            remainder -= 1;
        }
    }

    quotas
}
