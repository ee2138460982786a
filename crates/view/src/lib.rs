//! Dex view: pure sort/filter projections over a collection, plus the
//! transient view state a display layer drives.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use dex_core::{Collection, DetailRecord, Item};
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    ById,
    ByName,
}

impl FromStr for SortKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" | "by-id" | "by_id" => Ok(SortKey::ById),
            "name" | "by-name" | "by_name" => Ok(SortKey::ByName),
            other => Err(format!("unknown sort key: {} (expect id or name)", other)),
        }
    }
}

/// Ordering for one key. Items without an id sort after every item with one;
/// names compare by code point, case-sensitive.
pub fn compare(a: &Item, b: &Item, key: SortKey) -> Ordering {
    match key {
        SortKey::ById => match (a.id(), b.id()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::ByName => a.name().cmp(b.name()),
    }
}

/// Stable in-place sort.
pub fn sort_items(items: &mut [Item], key: SortKey) {
    items.sort_by(|a, b| compare(a, b, key));
}

/// New ordered copy of the collection.
pub fn sorted(collection: &Collection, key: SortKey) -> Collection {
    let mut items = collection.results().to_vec();
    sort_items(&mut items, key);
    Collection::new(items)
}

/// Active type-name filters. Empty means "show everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeSet<String>);

impl FilterSet {
    pub fn new() -> Self { Self::default() }

    /// Flip membership; returns whether the type is active afterwards.
    pub fn toggle(&mut self, type_name: &str) -> bool {
        if self.0.remove(type_name) {
            false
        } else {
            self.0.insert(type_name.to_string());
            true
        }
    }

    pub fn contains(&self, type_name: &str) -> bool { self.0.contains(type_name) }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ { self.0.iter().map(|s| s.as_str()) }

    /// OR across active types. Unresolved items carry no types and so fail
    /// every non-empty filter.
    pub fn matches(&self, item: &Item) -> bool {
        if self.0.is_empty() {
            return true;
        }
        match item.types() {
            Some(types) => types.iter().any(|t| self.0.contains(&t.name)),
            None => false,
        }
    }
}

impl<S: Into<String>> FromIterator<S> for FilterSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Ordered, filtered subset to display.
pub fn project(collection: &Collection, key: SortKey, filters: &FilterSet) -> Vec<Item> {
    let mut out: Vec<Item> = collection.iter().filter(|it| filters.matches(it)).cloned().collect();
    sort_items(&mut out, key);
    metrics::histogram!("view_project_items", out.len() as f64);
    trace!(total = collection.count(), shown = out.len(), ?key, filters = filters.len(), "view: projected");
    out
}

/// Type names present among resolved items, with how many items carry each.
pub fn type_facets(collection: &Collection) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for rec in collection.iter().filter_map(Item::as_detail) {
        for t in rec.type_names() {
            *counts.entry(t).or_default() += 1;
        }
    }
    counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Sort key, filters and selection. Replaced as a whole on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub sort_key: SortKey,
    pub filters: FilterSet,
    pub selection: Option<DetailRecord>,
}

impl ViewState {
    pub fn with_sort(&self, key: SortKey) -> Self {
        Self { sort_key: key, ..self.clone() }
    }

    /// Returns the next state and whether `type_name` is now active.
    pub fn with_filter_toggled(&self, type_name: &str) -> (Self, bool) {
        let mut filters = self.filters.clone();
        let active = filters.toggle(type_name);
        (Self { filters, ..self.clone() }, active)
    }

    pub fn with_filters_cleared(&self) -> Self {
        Self { filters: FilterSet::default(), ..self.clone() }
    }

    pub fn with_selection(&self, selection: Option<DetailRecord>) -> Self {
        Self { selection, ..self.clone() }
    }

    pub fn project(&self, collection: &Collection) -> Vec<Item> {
        project(collection, self.sort_key, &self.filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_membership() {
        let mut f = FilterSet::new();
        assert!(f.toggle("fire"));
        assert!(f.contains("fire"));
        assert!(!f.toggle("fire"));
        assert!(f.is_empty());
    }

    #[test]
    fn sort_key_parses() {
        assert_eq!("id".parse::<SortKey>().unwrap(), SortKey::ById);
        assert_eq!("by-name".parse::<SortKey>().unwrap(), SortKey::ByName);
        assert!("weight".parse::<SortKey>().is_err());
    }

    #[test]
    fn view_state_changes_are_whole_values() {
        let v0 = ViewState::default();
        let v1 = v0.with_sort(SortKey::ByName);
        let (v2, active) = v1.with_filter_toggled("water");
        assert!(active);
        assert_eq!(v0.sort_key, SortKey::ById);
        assert_eq!(v1.sort_key, SortKey::ByName);
        assert!(v1.filters.is_empty());
        assert_eq!(v2.sort_key, SortKey::ByName);
        assert!(v2.filters.contains("water"));
        assert!(v2.with_filters_cleared().filters.is_empty());
    }
}
