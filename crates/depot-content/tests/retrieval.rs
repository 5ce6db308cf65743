//! Retrieval sequencing across stores and groups

use depot_content::ContentEngine;
use depot_model::{ArtifactStore, StoreKey};
use depot_registry::StoreRegistry;
use depot_test_utils::{group, hosted, remote, MemoryTransport};
use std::sync::Arc;

const PATH: &str = "org/example/app/1.0/app-1.0.jar";

fn setup(stores: Vec<ArtifactStore>) -> (Arc<StoreRegistry>, Arc<MemoryTransport>, ContentEngine) {
    let registry = Arc::new(StoreRegistry::new());
    for store in stores {
        registry.put(store, false).unwrap();
    }
    let transport = Arc::new(MemoryTransport::new());
    let engine = ContentEngine::new(registry.clone(), transport.clone());
    (registry, transport, engine)
}

fn requested(transport: &MemoryTransport, key: &StoreKey) -> bool {
    transport.requests().iter().any(|(k, _)| k == key)
}

#[tokio::test]
async fn retrieve_first_short_circuits_on_first_hit() {
    let s1 = hosted("s1");
    let s2 = hosted("s2");
    let s3 = hosted("s3");
    let (_registry, transport, engine) = setup(vec![s1.clone(), s2.clone(), s3.clone()]);

    transport.seed(s2.key(), PATH, b"from s2");
    transport.seed(s3.key(), PATH, b"from s3");

    let transfer = engine
        .retrieve_first(&[s1.clone(), s2.clone(), s3.clone()], PATH)
        .await
        .unwrap()
        .expect("s2 has the content");

    assert_eq!(&transfer.key, s2.key());
    assert!(requested(&transport, s1.key()));
    // The scan stopped at s2; s3 was never queried.
    assert!(!requested(&transport, s3.key()));
}

#[tokio::test]
async fn retrieve_first_returns_none_when_nothing_matches() {
    let s1 = hosted("s1");
    let (_registry, _transport, engine) = setup(vec![s1.clone()]);

    let result = engine.retrieve_first(&[s1], PATH).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn retrieve_all_collects_every_hit_in_order() {
    let s1 = hosted("s1");
    let s2 = hosted("s2");
    let s3 = hosted("s3");
    let (_registry, transport, engine) = setup(vec![s1.clone(), s2.clone(), s3.clone()]);

    transport.seed(s1.key(), PATH, b"one");
    transport.seed(s3.key(), PATH, b"three");

    let transfers = engine
        .retrieve_all(&[s1.clone(), s2, s3.clone()], PATH)
        .await
        .unwrap();

    let keys: Vec<&StoreKey> = transfers.iter().map(|t| &t.key).collect();
    assert_eq!(keys, vec![s1.key(), s3.key()]);
}

#[tokio::test]
async fn group_reference_flattens_with_member_precedence() {
    let near = hosted("near");
    let far = hosted("far");
    let g = group("public", &[&near, &far]);
    let (_registry, transport, engine) = setup(vec![near.clone(), far.clone(), g.clone()]);

    transport.seed(near.key(), PATH, b"near copy");
    transport.seed(far.key(), PATH, b"far copy");

    let transfer = engine
        .retrieve_first(std::slice::from_ref(&g), PATH)
        .await
        .unwrap()
        .expect("group resolves through members");

    assert_eq!(&transfer.key, near.key());
}

#[tokio::test]
async fn group_with_dangling_member_still_resolves() {
    let live = hosted("live");
    let ghost = hosted("ghost");
    let g = group("public", &[&ghost, &live]);
    // ghost is referenced by the group but never registered.
    let (_registry, transport, engine) = setup(vec![live.clone(), g.clone()]);

    transport.seed(live.key(), PATH, b"still here");

    let transfer = engine
        .retrieve_first(std::slice::from_ref(&g), PATH)
        .await
        .unwrap()
        .expect("dangling member is skipped");
    assert_eq!(&transfer.key, live.key());
}

#[tokio::test]
async fn disabled_stores_contribute_nothing() {
    let dark = hosted("dark").with_disabled(true);
    let lit = hosted("lit");
    let (_registry, transport, engine) = setup(vec![dark.clone(), lit.clone()]);

    transport.seed(dark.key(), PATH, b"hidden");
    transport.seed(lit.key(), PATH, b"visible");

    let transfer = engine
        .retrieve_first(&[dark.clone(), lit.clone()], PATH)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(&transfer.key, lit.key());
    assert!(!requested(&transport, dark.key()));
}

#[tokio::test]
async fn transport_failure_in_one_store_is_skipped() {
    let flaky = hosted("flaky");
    let solid = hosted("solid");
    let (_registry, transport, engine) = setup(vec![flaky.clone(), solid.clone()]);

    transport.fail_store(flaky.key());
    transport.seed(solid.key(), PATH, b"good bytes");

    let transfer = engine
        .retrieve_first(&[flaky, solid.clone()], PATH)
        .await
        .unwrap()
        .expect("failure in flaky is not fatal");
    assert_eq!(&transfer.key, solid.key());
}

#[tokio::test]
async fn remote_retrieval_populates_the_cache() {
    let upstream = remote("central");
    let (_registry, transport, engine) = setup(vec![upstream.clone()]);

    transport.seed_upstream(upstream.key(), PATH, b"upstream bytes");
    assert!(!transport.cached(upstream.key(), PATH));

    let transfer = engine
        .retrieve_first(std::slice::from_ref(&upstream), PATH)
        .await
        .unwrap()
        .expect("fetched from upstream");

    assert_eq!(&transfer.key, upstream.key());
    assert!(transport.cached(upstream.key(), PATH));
}

#[tokio::test]
async fn single_store_retrieve_ignores_groups_and_disabled() {
    let h = hosted("h");
    let g = group("g", &[&h]);
    let (_registry, transport, engine) = setup(vec![h.clone(), g.clone()]);

    transport.seed(h.key(), PATH, b"content");

    // A bare group reference resolves to nothing at this level.
    assert!(engine.retrieve(&g, PATH).await.unwrap().is_none());
    assert!(engine
        .retrieve(&h.clone().with_disabled(true), PATH)
        .await
        .unwrap()
        .is_none());
    assert!(engine.retrieve(&h, PATH).await.unwrap().is_some());
}
