use super::tags::TagFilterSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Tag assignments of one inventory object: category -> set of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, BTreeSet<String>>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, value: impl Into<String>) {
        self.0.entry(category.into()).or_default().insert(value.into());
    }

    /// Builder-style insert, handy for fixtures and inventory imports.
    #[must_use]
    pub fn with(mut self, category: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(category, value);
        self
    }

    pub fn contains(&self, category: &str, value: &str) -> bool {
        self.0.get(category).is_some_and(|values| values.contains(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(category, values)| values.iter().map(move |v| (category.as_str(), v.as_str())))
    }
}

/// Anything in the provider inventory that can carry tags.
pub trait Tagged {
    fn tags(&self) -> &TagSet;

    fn tagged_with(&self, category: &str, value: &str) -> bool {
        self.tags().contains(category, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    On,
    Off,
    Suspended,
    Unknown,
}

impl PowerState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Suspended => "suspended",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PowerState {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "suspended" => Ok(Self::Suspended),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("invalid power state: {s}")),
        }
    }
}

/// A provider cluster. Member hosts are reached through the inventory port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: i64,
    pub name: String,
    pub ems_id: i64,
    pub drs_enabled: bool,
    #[serde(default)]
    pub tags: TagSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: i64,
    pub name: String,
    pub ems_id: i64,
    pub cluster_id: Option<i64>,
    pub power_state: PowerState,
    pub maintenance: bool,
    /// Memory in use as reported by the provider.
    pub current_memory_usage: u64,
    /// Memory still available on the host as reported by the provider.
    pub current_memory_headroom: u64,
    pub current_cpu_usage: u64,
    #[serde(default)]
    pub tags: TagSet,
}

impl Host {
    pub fn is_powered_on(&self) -> bool {
        self.power_state == PowerState::On
    }
}

/// A datastore / storage domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    pub id: i64,
    pub name: String,
    pub free_space: u64,
    pub total_space: u64,
    /// VMs already registered on this storage.
    pub vm_count: u32,
    pub multi_host_access: bool,
    #[serde(default)]
    pub tags: TagSet,
}

impl Storage {
    /// Provider-reported percentage of total space already consumed.
    pub fn used_pct(&self) -> f64 {
        if self.total_space == 0 {
            return 100.0;
        }
        self.pct_of_total(self.total_space.saturating_sub(self.free_space))
    }

    /// `bytes` expressed as a percentage of this storage's total space.
    pub fn pct_of_total(&self, bytes: u64) -> f64 {
        if self.total_space == 0 {
            return 0.0;
        }
        (u128::from(bytes) * 100) as f64 / self.total_space as f64
    }
}

impl Tagged for Cluster {
    fn tags(&self) -> &TagSet {
        &self.tags
    }
}

impl Tagged for Host {
    fn tags(&self) -> &TagSet {
        &self.tags
    }
}

impl Tagged for Storage {
    fn tags(&self) -> &TagSet {
        &self.tags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vendor {
    #[serde(rename = "vmware")]
    VMware,
    #[serde(rename = "rhv")]
    Rhv,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VMware => "vmware",
            Self::Rhv => "rhv",
        })
    }
}

/// The template (or source VM) a new VM is provisioned from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRef {
    pub id: i64,
    pub name: String,
    pub ems_id: Option<i64>,
    /// Cluster the template lives in; RHV placement is pinned to it.
    pub ems_cluster_id: Option<i64>,
}

/// One placement decision's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub template: Option<TemplateRef>,
    /// Provider to place into; defaults to the template's provider.
    pub ems_id: Option<i64>,
    pub requester: Option<String>,
    pub vendor: Vendor,
    pub requested_storage_bytes: u64,
    #[serde(default)]
    pub requested_memory: u64,
    #[serde(default)]
    pub requested_cpu: u64,
    #[serde(default)]
    pub tag_filters: TagFilterSet,
}

impl PlacementRequest {
    pub fn resolved_ems_id(&self) -> Option<i64> {
        self.ems_id.or_else(|| self.template.as_ref().and_then(|t| t.ems_id))
    }
}

/// Storage admission limits. `0` and `100` disable their respective checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub storage_max_vms: u32,
    pub storage_max_pct_used: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { storage_max_vms: 0, storage_max_pct_used: 100 }
    }
}

/// Identity of a selected inventory object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: i64,
    pub name: String,
}

impl From<&Cluster> for ObjectRef {
    fn from(c: &Cluster) -> Self {
        Self { id: c.id, name: c.name.clone() }
    }
}

impl From<&Host> for ObjectRef {
    fn from(h: &Host) -> Self {
        Self { id: h.id, name: h.name.clone() }
    }
}

impl From<&Storage> for ObjectRef {
    fn from(s: &Storage) -> Self {
        Self { id: s.id, name: s.name.clone() }
    }
}

/// Where the VM lands: a whole DRS cluster, or one specific host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Destination {
    Cluster(ObjectRef),
    Host(ObjectRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSelection {
    pub destination: Destination,
    pub storage: ObjectRef,
    pub need_specific_host: bool,
}
