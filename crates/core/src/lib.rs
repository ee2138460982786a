//! Dex core types: catalog items, collections and the error taxonomy.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod error;

pub use error::{DexError, DexResult};

pub mod prelude {
    pub use super::{Collection, DetailRecord, DexError, DexResult, Item, Named, SummaryItem};
}

/// Sprite images are addressed by numeric id.
pub const SPRITE_BASE: &str = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// A `{ name }` reference (ability, type).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Named {
    pub name: String,
}

impl Named {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Lightweight list entry from the paginated collection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryItem {
    /// 1-based position in the walk, not a remote identifier.
    pub id: Option<u32>,
    pub name: String,
    pub url: String,
}

/// Fully resolved record for one item. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetailRecord {
    pub id: u32,
    pub name: String,
    /// Locator this record was resolved from.
    pub url: String,
    /// Decimetres.
    pub height: u32,
    /// Hectograms.
    pub weight: u32,
    pub abilities: SmallVec<[Named; 4]>,
    pub types: SmallVec<[Named; 2]>,
}

impl DetailRecord {
    pub fn type_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.iter().map(|t| t.name.as_str())
    }

    pub fn ability_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.abilities.iter().map(|a| a.name.as_str())
    }

    pub fn sprite_url(&self) -> String {
        format!("{}/{}.png", SPRITE_BASE, self.id)
    }
}

/// A catalog entry, either as listed or after resolution.
/// The variant is decided once when data enters the system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Summary(SummaryItem),
    Detail(DetailRecord),
}

impl Item {
    pub fn id(&self) -> Option<u32> {
        match self {
            Item::Summary(s) => s.id,
            Item::Detail(d) => Some(d.id),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Summary(s) => &s.name,
            Item::Detail(d) => &d.name,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Item::Summary(s) => &s.url,
            Item::Detail(d) => &d.url,
        }
    }

    pub fn as_detail(&self) -> Option<&DetailRecord> {
        match self {
            Item::Detail(d) => Some(d),
            Item::Summary(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Item::Detail(_))
    }

    /// Type references, `None` for unresolved items.
    pub fn types(&self) -> Option<&[Named]> {
        self.as_detail().map(|d| d.types.as_slice())
    }

    pub fn sprite_url(&self) -> Option<String> {
        self.id().map(|id| format!("{}/{}.png", SPRITE_BASE, id))
    }
}

impl From<SummaryItem> for Item {
    fn from(v: SummaryItem) -> Self {
        Item::Summary(v)
    }
}

impl From<DetailRecord> for Item {
    fn from(v: DetailRecord) -> Self {
        Item::Detail(v)
    }
}

/// Ordered aggregation of items across all pages. `count` always equals
/// the number of results; instances are replaced, never edited in place.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Collection {
    count: usize,
    results: Vec<Item>,
}

impl Collection {
    pub fn new(results: Vec<Item>) -> Self {
        Self { count: results.len(), results }
    }

    pub fn count(&self) -> usize { self.count }
    pub fn is_empty(&self) -> bool { self.results.is_empty() }
    pub fn results(&self) -> &[Item] { &self.results }
    pub fn iter(&self) -> std::slice::Iter<'_, Item> { self.results.iter() }
    pub fn into_results(self) -> Vec<Item> { self.results }

    pub fn find_by_name(&self, name: &str) -> Option<&Item> {
        self.results.iter().find(|it| it.name() == name)
    }

    pub fn resolved_count(&self) -> usize {
        self.results.iter().filter(|it| it.is_resolved()).count()
    }
}

impl FromIterator<Item> for Collection {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;
    fn into_iter(self) -> Self::IntoIter { self.results.iter() }
}
