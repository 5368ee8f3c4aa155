use super::types::{Cluster, Host, PlacementSelection, Storage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Why a candidate was removed from consideration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    TagMismatch { category: String },
    PoweredOff,
    InMaintenance,
    /// DRS cluster without a powered-on host to discover storages through.
    NoPoweredOnHosts,
    /// Storage not shared across hosts of a multi-host DRS cluster.
    SingleHostStorage,
    InsufficientSpace { free: u64, needed: u64 },
    TooManyVms { count: u32, max: u32 },
    OverPercentUsed { pct: f64, max: u8 },
}

impl SkipReason {
    /// Capacity failures are what turns "nothing found" into a capacity error.
    pub const fn is_capacity(&self) -> bool {
        matches!(
            self,
            Self::InsufficientSpace { .. } | Self::TooManyVms { .. } | Self::OverPercentUsed { .. }
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagMismatch { category } => write!(f, "not tagged for category '{category}'"),
            Self::PoweredOff => f.write_str("not powered on"),
            Self::InMaintenance => f.write_str("in maintenance mode"),
            Self::NoPoweredOnHosts => f.write_str("has no powered-on hosts"),
            Self::SingleHostStorage => {
                f.write_str("not accessible from all hosts of a multi-host DRS cluster")
            }
            Self::InsufficientSpace { free, needed } => {
                write!(f, "free space {free} bytes does not exceed required {needed} bytes")
            }
            Self::TooManyVms { count, max } => write!(f, "{count} VMs (incl. in-flight), limit {max}"),
            Self::OverPercentUsed { pct, max } => {
                write!(f, "{pct:.2}% used after placement, limit {max}%")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Cluster,
    Host,
    Storage,
}

/// One removed candidate, kept for the placement report.
#[derive(Debug, Clone, Serialize)]
pub struct Disqualification {
    pub kind: CandidateKind,
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl Disqualification {
    pub fn cluster(c: &Cluster, reason: SkipReason) -> Self {
        Self { kind: CandidateKind::Cluster, id: c.id, name: c.name.clone(), reason }
    }

    pub fn host(h: &Host, reason: SkipReason) -> Self {
        Self { kind: CandidateKind::Host, id: h.id, name: h.name.clone(), reason }
    }

    pub fn storage(s: &Storage, reason: SkipReason) -> Self {
        Self { kind: CandidateKind::Storage, id: s.id, name: s.name.clone(), reason }
    }
}

/// Disqualifications collected over one search.
#[derive(Debug, Default)]
pub struct Findings {
    disqualified: Vec<Disqualification>,
}

impl Findings {
    pub fn record(&mut self, d: Disqualification) {
        debug!(kind = ?d.kind, id = d.id, name = %d.name, reason = %d.reason, "Candidate disqualified");
        self.disqualified.push(d);
    }

    /// Whether some storage got past eligibility and failed on capacity.
    pub fn has_capacity_failure(&self) -> bool {
        self.disqualified
            .iter()
            .any(|d| d.kind == CandidateKind::Storage && d.reason.is_capacity())
    }

    pub fn into_vec(self) -> Vec<Disqualification> {
        self.disqualified
    }
}

/// Result of a successful placement together with everything it ruled out.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementOutcome {
    pub selection: PlacementSelection,
    pub disqualified: Vec<Disqualification>,
    pub decided_at: DateTime<Utc>,
}
