//! Group CRUD and membership behavior against a live registry

use depot_model::{ArtifactStore, StoreKey, StoreType};
use depot_registry::StoreRegistry;

fn key(spec: &str) -> StoreKey {
    spec.parse().unwrap()
}

fn seeded() -> StoreRegistry {
    let registry = StoreRegistry::new();
    registry
        .put(
            ArtifactStore::remote("maven", "central", "https://repo.example.org/maven2/"),
            false,
        )
        .unwrap();
    registry
        .put(
            ArtifactStore::remote("maven", "repo2", "https://repo2.example.org/maven2/"),
            false,
        )
        .unwrap();
    registry
}

#[test]
fn create_and_retrieve_empty_group() {
    let registry = seeded();
    registry
        .put(ArtifactStore::group("maven", "test", vec![]), false)
        .unwrap();

    let result = registry.group("maven", "test").unwrap();
    assert_eq!(result.name(), "test");
    assert!(result.as_group().unwrap().constituents.is_empty());
}

#[test]
fn create_and_delete_group() {
    let registry = seeded();
    let group = ArtifactStore::group("maven", "test", vec![]);
    registry.put(group.clone(), false).unwrap();

    registry.remove(group.key()).unwrap();
    assert!(registry.group("maven", "test").is_none());
}

#[test]
fn group_retains_constituents_in_order() {
    let registry = seeded();
    registry
        .put(
            ArtifactStore::group(
                "maven",
                "test",
                vec![key("maven:remote:central"), key("maven:remote:repo2")],
            ),
            false,
        )
        .unwrap();

    let result = registry.group("maven", "test").unwrap();
    assert_eq!(
        result.as_group().unwrap().constituents,
        vec![key("maven:remote:central"), key("maven:remote:repo2")]
    );
}

#[test]
fn ordered_concrete_resolution_follows_membership_order() {
    let registry = seeded();
    registry
        .put(
            ArtifactStore::group(
                "maven",
                "test",
                vec![key("maven:remote:repo2"), key("maven:remote:central")],
            ),
            false,
        )
        .unwrap();

    let members = registry
        .query()
        .ordered_concrete_stores_in_group(&key("maven:group:test"));
    let names: Vec<&str> = members.iter().map(ArtifactStore::name).collect();
    assert_eq!(names, vec!["repo2", "central"]);
}

#[test]
fn storing_same_group_twice_keeps_one_definition() {
    let registry = seeded();
    let group = ArtifactStore::group("maven", "test", vec![key("maven:remote:central")]);

    assert!(registry.put(group.clone(), false).unwrap());
    assert!(!registry.put(group, false).unwrap());
    assert_eq!(registry.all_of_type(StoreType::Group).len(), 1);
}

#[test]
fn affected_by_finds_direct_containers() {
    let registry = seeded();
    registry
        .put(
            ArtifactStore::group("maven", "g1", vec![key("maven:remote:central")]),
            false,
        )
        .unwrap();
    registry
        .put(
            ArtifactStore::group("maven", "g2", vec![key("maven:remote:central")]),
            false,
        )
        .unwrap();

    let affected = registry
        .query()
        .groups_affected_by(vec![key("maven:remote:central")]);
    let names: Vec<&str> = affected.iter().map(ArtifactStore::name).collect();
    assert_eq!(names, vec!["g1", "g2"]);
}

#[test]
fn affected_by_climbs_nested_groups() {
    let registry = seeded();
    registry
        .put(
            ArtifactStore::group("maven", "inner", vec![key("maven:remote:central")]),
            false,
        )
        .unwrap();
    registry
        .put(
            ArtifactStore::group("maven", "outer", vec![key("maven:group:inner")]),
            false,
        )
        .unwrap();

    let affected = registry
        .query()
        .groups_affected_by(vec![key("maven:remote:central")]);
    let names: Vec<&str> = affected.iter().map(ArtifactStore::name).collect();
    assert_eq!(names, vec!["inner", "outer"]);
}

#[test]
fn membership_survives_member_deletion() {
    let registry = seeded();
    registry
        .put(
            ArtifactStore::group("maven", "test", vec![key("maven:remote:central")]),
            false,
        )
        .unwrap();

    registry.remove(&key("maven:remote:central")).unwrap();

    // The group still lists the dead key; resolution just skips it.
    let group = registry.group("maven", "test").unwrap();
    assert_eq!(
        group.as_group().unwrap().constituents,
        vec![key("maven:remote:central")]
    );
    assert!(registry
        .query()
        .ordered_concrete_stores_in_group(&key("maven:group:test"))
        .is_empty());
}
