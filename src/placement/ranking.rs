//! Multi-key ordering of hosts and storages.
//!
//! Each candidate gets one score per criterion of the sort order; candidates
//! are sorted ascending on that score tuple, lexicographically, with a stable
//! sort so equal tuples keep their inventory order. Scores where "more is
//! better" are negated so that ascending order always means "preferred first".
//!
//! `Random` draws a fresh value per candidate on every call. Because draws
//! never tie, any criterion listed after it has no effect on the result.

use super::capacity::active_pct;
use super::ledger::ActiveProvisioningLedger;
use super::types::{Host, Storage};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingCriterion {
    ActiveMemory,
    ActiveCpu,
    MemoryHeadroom,
    MemoryUsage,
    CpuUsage,
    FreeSpace,
    FreeSpacePercentage,
    ActiveVmCount,
    Random,
}

/// What a sort order is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankTarget {
    Host,
    Storage,
}

impl fmt::Display for RankTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "host",
            Self::Storage => "storage",
        })
    }
}

impl RankingCriterion {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ActiveMemory => "active_memory",
            Self::ActiveCpu => "active_cpu",
            Self::MemoryHeadroom => "memory_headroom",
            Self::MemoryUsage => "memory_usage",
            Self::CpuUsage => "cpu_usage",
            Self::FreeSpace => "free_space",
            Self::FreeSpacePercentage => "free_space_percentage",
            Self::ActiveVmCount => "active_vm_count",
            Self::Random => "random",
        }
    }

    pub const fn applies_to(self, target: RankTarget) -> bool {
        match self {
            Self::Random => true,
            Self::ActiveMemory
            | Self::ActiveCpu
            | Self::MemoryHeadroom
            | Self::MemoryUsage
            | Self::CpuUsage => matches!(target, RankTarget::Host),
            Self::FreeSpace | Self::FreeSpacePercentage | Self::ActiveVmCount => {
                matches!(target, RankTarget::Storage)
            }
        }
    }
}

impl fmt::Display for RankingCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingCriterion {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active_memory" => Ok(Self::ActiveMemory),
            "active_cpu" => Ok(Self::ActiveCpu),
            "memory_headroom" => Ok(Self::MemoryHeadroom),
            "memory_usage" => Ok(Self::MemoryUsage),
            "cpu_usage" => Ok(Self::CpuUsage),
            "free_space" => Ok(Self::FreeSpace),
            "free_space_percentage" => Ok(Self::FreeSpacePercentage),
            "active_vm_count" => Ok(Self::ActiveVmCount),
            "random" => Ok(Self::Random),
            _ => Err(format!("unknown ranking criterion: {s}")),
        }
    }
}

/// Ordered list of criteria; earlier criteria dominate later ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortOrder(Vec<RankingCriterion>);

impl SortOrder {
    pub const fn new(criteria: Vec<RankingCriterion>) -> Self {
        Self(criteria)
    }

    pub fn criteria(&self) -> &[RankingCriterion] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Criteria in this order that make no sense for `target`.
    pub fn misplaced(&self, target: RankTarget) -> Vec<RankingCriterion> {
        self.0.iter().copied().filter(|c| !c.applies_to(target)).collect()
    }

    /// True when `Random` appears before the last position.
    pub fn random_shadows_later_criteria(&self) -> bool {
        self.0
            .iter()
            .position(|c| *c == RankingCriterion::Random)
            .is_some_and(|pos| pos + 1 < self.0.len())
    }

    /// Parse a comma-separated list, dropping (and logging) unknown names.
    pub fn parse_lenient(s: &str) -> Self {
        let criteria = s
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| match name.parse() {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!("Ignoring sort order entry: {e}");
                    None
                }
            })
            .collect();
        Self(criteria)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|c| c.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

/// A candidate that can be scored under some criteria.
pub trait Rankable {
    /// Score for `criterion`, lower sorts first. `None` when the criterion
    /// does not apply to this kind of candidate. `Random` is handled by
    /// [`rank`] and never reaches this method.
    fn score(&self, criterion: RankingCriterion, ledger: &dyn ActiveProvisioningLedger)
        -> Option<f64>;
}

impl Rankable for Host {
    fn score(
        &self,
        criterion: RankingCriterion,
        ledger: &dyn ActiveProvisioningLedger,
    ) -> Option<f64> {
        match criterion {
            RankingCriterion::ActiveMemory => Some(ledger.active_memory(self.id) as f64),
            RankingCriterion::ActiveCpu => Some(ledger.active_cpu(self.id) as f64),
            RankingCriterion::MemoryHeadroom => Some(-(self.current_memory_headroom as f64)),
            RankingCriterion::MemoryUsage => Some(self.current_memory_usage as f64),
            RankingCriterion::CpuUsage => Some(self.current_cpu_usage as f64),
            RankingCriterion::FreeSpace
            | RankingCriterion::FreeSpacePercentage
            | RankingCriterion::ActiveVmCount
            | RankingCriterion::Random => None,
        }
    }
}

impl Rankable for Storage {
    fn score(
        &self,
        criterion: RankingCriterion,
        ledger: &dyn ActiveProvisioningLedger,
    ) -> Option<f64> {
        match criterion {
            RankingCriterion::FreeSpace => {
                let effective = self.free_space as f64 - ledger.active_storage_bytes(self.id) as f64;
                Some(-effective)
            }
            RankingCriterion::FreeSpacePercentage => {
                Some(self.used_pct() + active_pct(self, ledger))
            }
            RankingCriterion::ActiveVmCount => Some(f64::from(ledger.active_vm_count(self.id))),
            RankingCriterion::ActiveMemory
            | RankingCriterion::ActiveCpu
            | RankingCriterion::MemoryHeadroom
            | RankingCriterion::MemoryUsage
            | RankingCriterion::CpuUsage
            | RankingCriterion::Random => None,
        }
    }
}

fn compare_keys(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Order `candidates` by `order`, preferred first.
///
/// Criteria that do not apply to `T` score zero for every candidate and so
/// never discriminate.
pub fn rank<T: Rankable, R: Rng>(
    candidates: Vec<T>,
    order: &SortOrder,
    ledger: &dyn ActiveProvisioningLedger,
    rng: &mut R,
) -> Vec<T> {
    let mut keyed: Vec<(Vec<f64>, T)> = candidates
        .into_iter()
        .map(|candidate| {
            let key = order
                .criteria()
                .iter()
                .map(|&criterion| match criterion {
                    RankingCriterion::Random => rng.gen::<f64>(),
                    other => candidate.score(other, ledger).unwrap_or(0.0),
                })
                .collect();
            (key, candidate)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    keyed.into_iter().map(|(_, candidate)| candidate).collect()
}
