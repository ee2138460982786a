use dex_core::{Collection, DetailRecord, Item, Named, SummaryItem};
use dex_view::{project, sorted, type_facets, FilterSet, SortKey};
use smallvec::SmallVec;

fn detail(id: u32, name: &str, types: &[&str]) -> Item {
    Item::Detail(DetailRecord {
        id,
        name: name.to_string(),
        url: format!("https://dex.test/pokemon/{id}/"),
        height: 1,
        weight: 1,
        abilities: SmallVec::new(),
        types: types.iter().map(|t| Named::new(*t)).collect(),
    })
}

fn summary(id: u32, name: &str) -> Item {
    Item::Summary(SummaryItem { id: Some(id), name: name.to_string(), url: format!("https://dex.test/pokemon/{id}/") })
}

fn ids(items: &[Item]) -> Vec<u32> {
    items.iter().filter_map(|i| i.id()).collect()
}

#[test]
fn by_name_is_stable_and_by_id_restores_order() {
    // 2 and 4 share a name; 2 comes first in the input.
    let c = Collection::new(vec![
        detail(3, "mew", &["psychic"]),
        detail(2, "ditto", &["normal"]),
        detail(1, "abra", &["psychic"]),
        detail(4, "ditto", &["normal"]),
    ]);
    let once = sorted(&c, SortKey::ByName);
    let twice = sorted(&once, SortKey::ByName);
    assert_eq!(ids(once.results()), vec![1, 2, 4, 3]);
    assert_eq!(ids(twice.results()), ids(once.results()));

    let back = sorted(&twice, SortKey::ById);
    assert_eq!(ids(back.results()), vec![1, 2, 3, 4]);
    assert_eq!(back.count(), 4);
}

#[test]
fn by_name_is_case_sensitive_code_point_order() {
    let c = Collection::new(vec![summary(1, "eevee"), summary(2, "Zubat"), summary(3, "abra")]);
    let s = sorted(&c, SortKey::ByName);
    let names: Vec<_> = s.iter().map(|i| i.name()).collect();
    assert_eq!(names, vec!["Zubat", "abra", "eevee"]);
}

#[test]
fn sorting_returns_a_new_copy() {
    let c = Collection::new(vec![summary(2, "b"), summary(1, "a")]);
    let s = sorted(&c, SortKey::ById);
    assert_eq!(ids(c.results()), vec![2, 1]);
    assert_eq!(ids(s.results()), vec![1, 2]);
}

#[test]
fn items_without_id_sort_last() {
    let c = Collection::new(vec![
        Item::Summary(SummaryItem { id: None, name: "x".into(), url: "ux".into() }),
        summary(2, "b"),
        summary(1, "a"),
    ]);
    let s = sorted(&c, SortKey::ById);
    let names: Vec<_> = s.iter().map(|i| i.name()).collect();
    assert_eq!(names, vec!["a", "b", "x"]);
}

#[test]
fn filters_use_or_semantics() {
    let c = Collection::new(vec![detail(6, "charizard", &["fire", "flying"])]);

    let f: FilterSet = ["grass", "flying"].into_iter().collect();
    assert_eq!(project(&c, SortKey::ById, &f).len(), 1);

    let f: FilterSet = ["grass", "water"].into_iter().collect();
    assert!(project(&c, SortKey::ById, &f).is_empty());
}

#[test]
fn empty_filter_passes_everything_in_order() {
    let c = Collection::new(vec![summary(1, "a"), detail(2, "b", &["fire"]), summary(3, "c")]);
    let out = project(&c, SortKey::ById, &FilterSet::new());
    assert_eq!(out, c.results().to_vec());
}

#[test]
fn unresolved_items_fail_non_empty_filters() {
    let c = Collection::new(vec![summary(1, "bulbasaur"), detail(4, "charmander", &["fire"])]);
    let f: FilterSet = ["fire"].into_iter().collect();
    let out = project(&c, SortKey::ById, &f);
    assert_eq!(ids(&out), vec![4]);

    let f: FilterSet = ["grass"].into_iter().collect();
    assert!(project(&c, SortKey::ById, &f).is_empty());
}

#[test]
fn projection_applies_sort_after_filter() {
    let c = Collection::new(vec![
        detail(3, "charmeleon", &["fire"]),
        detail(1, "bulbasaur", &["grass"]),
        detail(2, "charmander", &["fire"]),
    ]);
    let f: FilterSet = ["fire"].into_iter().collect();
    let out = project(&c, SortKey::ByName, &f);
    let names: Vec<_> = out.iter().map(|i| i.name()).collect();
    assert_eq!(names, vec!["charmander", "charmeleon"]);
}

#[test]
fn facets_count_resolved_types() {
    let c = Collection::new(vec![
        detail(1, "bulbasaur", &["grass", "poison"]),
        detail(2, "oddish", &["grass", "poison"]),
        detail(6, "charizard", &["fire", "flying"]),
        summary(7, "squirtle"),
    ]);
    let facets = type_facets(&c);
    assert_eq!(
        facets,
        vec![("fire".to_string(), 1), ("flying".to_string(), 1), ("grass".to_string(), 2), ("poison".to_string(), 2)]
    );
}
