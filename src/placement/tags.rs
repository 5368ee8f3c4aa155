//! Tag-based eligibility.
//!
//! A filter set maps each tag category to the values acceptable for it.
//! An object is eligible when, for every category in the set, it carries at
//! least one of the accepted values (AND across categories, OR within one).

use super::types::Tagged;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagFilterSet(BTreeMap<String, BTreeSet<String>>);

impl TagFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `value` for `category`, in addition to any value already accepted.
    #[must_use]
    pub fn allow(mut self, category: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.entry(category.into()).or_default().insert(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// First category `object` has no accepted value for, if any.
    pub fn first_mismatch<'a, T: Tagged + ?Sized>(&'a self, object: &T) -> Option<&'a str> {
        self.0
            .iter()
            .find(|(category, accepted)| !accepted.iter().any(|v| object.tagged_with(category, v)))
            .map(|(category, _)| category.as_str())
    }

    pub fn is_eligible<T: Tagged + ?Sized>(&self, object: &T) -> bool {
        self.first_mismatch(object).is_none()
    }
}

/// Either a single value or a list of values on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for TagFilterSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
        let filters = raw
            .into_iter()
            .map(|(category, values)| {
                let values = match values {
                    OneOrMany::One(v) => BTreeSet::from([v]),
                    OneOrMany::Many(vs) => vs.into_iter().collect(),
                };
                (category, values)
            })
            .collect();
        Ok(Self(filters))
    }
}

/// Free-function form of [`TagFilterSet::is_eligible`].
pub fn is_eligible<T: Tagged + ?Sized>(object: &T, filters: &TagFilterSet) -> bool {
    filters.is_eligible(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::types::{Storage, TagSet};

    fn storage_with(tags: TagSet) -> Storage {
        Storage {
            id: 1,
            name: "ds1".to_string(),
            free_space: 0,
            total_space: 0,
            vm_count: 0,
            multi_host_access: true,
            tags,
        }
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let untagged = storage_with(TagSet::new());
        assert!(is_eligible(&untagged, &TagFilterSet::new()));
    }

    #[test]
    fn requires_every_category() {
        let ds = storage_with(TagSet::new().with("prov_scope", "all"));
        let filters = TagFilterSet::new().allow("prov_scope", "all").allow("environment", "prod");
        assert!(!is_eligible(&ds, &filters));
        assert_eq!(filters.first_mismatch(&ds), Some("environment"));
    }

    #[test]
    fn any_value_within_category_matches() {
        let ds = storage_with(TagSet::new().with("environment", "test"));
        let filters =
            TagFilterSet::new().allow("environment", "prod").allow("environment", "test");
        assert!(is_eligible(&ds, &filters));
    }

    #[test]
    fn value_from_other_category_does_not_count() {
        let ds = storage_with(TagSet::new().with("owner", "prod"));
        let filters = TagFilterSet::new().allow("environment", "prod");
        assert!(!is_eligible(&ds, &filters));
    }

    #[test]
    fn deserializes_single_value_and_list() {
        let filters: TagFilterSet =
            serde_json::from_str(r#"{"prov_scope":"all","environment":["prod","test"]}"#).unwrap();
        let expected = TagFilterSet::new()
            .allow("prov_scope", "all")
            .allow("environment", "prod")
            .allow("environment", "test");
        assert_eq!(filters, expected);
    }
}
