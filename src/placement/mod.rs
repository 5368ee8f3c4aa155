//! Placement core: picks a cluster or host plus a storage for a new VM.
//!
//! Everything in here is synchronous and side-effect free apart from the
//! final write-back through [`ProvisioningRequestSink`]. Inventory and the
//! in-flight ledger are reached only through the traits in [`ports`] and
//! [`ledger`].

pub mod capacity;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod ports;
pub mod ranking;
pub mod report;
pub mod strategy;
pub mod tags;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{PlacementEngine, PlacementSettings};
pub use error::{PlacementError, PlacementResult};
pub use ledger::{ActiveProvisioningLedger, ActiveReservation, LedgerSnapshot};
pub use ports::{HostScope, InventoryProvider, ProvisioningRequestSink};
pub use ranking::{RankingCriterion, SortOrder};
pub use report::{PlacementOutcome, SkipReason};
pub use tags::TagFilterSet;
pub use types::{
    Cluster, Destination, Host, ObjectRef, PlacementRequest, PlacementSelection, PowerState,
    Storage, TagSet, Thresholds, Vendor,
};
